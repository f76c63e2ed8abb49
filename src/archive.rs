use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{HarvestError, Result};

/// Archived responses are numbered files next to the config file:
/// `endpoints.yml` archives to `endpoints-raw-000.json`, `endpoints-raw-001.json`, ...
pub fn response_path(config_path: &Path, index: usize) -> PathBuf {
    let stem = config_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("responses");
    config_path.with_file_name(format!("{}-raw-{:03}.json", stem, index))
}

/// Persist one raw response. The caller has already injected the
/// `metadata` block; any I/O failure here is fatal for the run.
pub fn save(config_path: &Path, index: usize, response: &Value) -> Result<()> {
    let path = response_path(config_path, index);
    let text = serde_json::to_string_pretty(response)
        .map_err(|e| HarvestError::Archive(e.to_string()))?;
    std::fs::write(&path, text)
        .map_err(|e| HarvestError::Archive(format!("{}: {}", path.display(), e)))
}

/// Read one archived response back by index.
pub fn load(config_path: &Path, index: usize) -> Result<Value> {
    let path = response_path(config_path, index);
    let text = std::fs::read_to_string(&path)
        .map_err(|e| HarvestError::Archive(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| HarvestError::Archive(format!("{}: {}", path.display(), e)))
}
