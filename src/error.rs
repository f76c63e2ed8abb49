/// Failure taxonomy for a scraping run.
///
/// Per-field content anomalies inside post-processing transforms are not
/// errors: they are logged and the run continues (see `transform`).
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Missing/invalid config file or config key. Raised before any network
    /// activity.
    #[error("config: {0}")]
    Config(String),

    /// Non-success HTTP status or network failure, after retries.
    #[error("transport: {0}")]
    Transport(String),

    /// A page's markup contains no template block.
    #[error("page {page_id} has no template block")]
    TemplateAbsent { page_id: i64 },

    /// A pageData selector path has a missing segment.
    #[error("response path not found: {0}")]
    PathNotFound(String),

    /// Archive file could not be written or read back.
    #[error("archive: {0}")]
    Archive(String),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
