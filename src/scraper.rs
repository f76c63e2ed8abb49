use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::api::{self, ApiClient};
use crate::archive;
use crate::config::{Config, MissingTemplate};
use crate::error::{HarvestError, Result};
use crate::extract;
use crate::record::Record;
use crate::template::{strip_syntax_highlighter, Template};

/// Totals reported after a harvest completes.
#[derive(Debug)]
pub struct HarvestStats {
    pub pages: usize,
    pub records: usize,
    pub skipped: usize,
}

/// Walk the live API to completion: fetch, extract every document, follow the
/// continuation token, repeat. Pagination is strictly serial since each
/// request depends on the previous response's token.
pub async fn harvest_live(config: &Config, client: &ApiClient) -> Result<(Vec<Record>, HarvestStats)> {
    let mut records = Vec::new();
    let mut stats = HarvestStats { pages: 0, records: 0, skipped: 0 };
    let mut token: Option<(String, String)> = None;

    loop {
        let response = client.fetch(token.as_ref()).await?;
        extract_response_pages(config, &response.body, &mut records, &mut stats)?;
        stats.pages += 1;
        info!("Result page {}: {} records so far", stats.pages, stats.records);

        match api::continuation(&response.body) {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok((records, stats))
}

/// Replay previously archived responses in index order, following each file's
/// `metadata.next` marker instead of re-deriving continuation tokens.
pub fn harvest_archived(config: &Config, config_path: &Path) -> Result<(Vec<Record>, HarvestStats)> {
    let mut records = Vec::new();
    let mut stats = HarvestStats { pages: 0, records: 0, skipped: 0 };
    let mut index = 0;

    loop {
        let response = archive::load(config_path, index)?;
        extract_response_pages(config, &response, &mut records, &mut stats)?;
        stats.pages += 1;

        if response.pointer("/metadata/next").is_none() {
            break;
        }
        index += 1;
    }

    Ok((records, stats))
}

/// Fetch every result page and persist the raw responses without extracting.
/// Each file records the URL that produced it and, when a continuation
/// existed, the follow-up URL, so a later replay can walk the same chain.
pub async fn archive_responses(client: &ApiClient, config_path: &Path) -> Result<usize> {
    let mut current = client.fetch(None).await?;
    let mut index = 0;

    loop {
        let next = match api::continuation(&current.body) {
            Some(token) => Some(client.fetch(Some(&token)).await?),
            None => None,
        };

        let source_url = current.source_url.clone();
        let next_url = next.as_ref().map(|n| n.source_url.as_str());
        annotate_for_archive(&mut current.body, &source_url, next_url);

        archive::save(config_path, index, &current.body)?;
        info!("Saved {}", archive::response_path(config_path, index).display());

        match next {
            Some(next) => {
                current = next;
                index += 1;
            }
            None => return Ok(index + 1),
        }
    }
}

/// Stamp provenance onto a response before it is archived. The continuation
/// token is consumed here; replay follows `metadata.next` instead.
fn annotate_for_archive(body: &mut Value, source_url: &str, next_url: Option<&str>) {
    let mut metadata = serde_json::Map::new();
    metadata.insert("source".into(), Value::String(source_url.to_string()));
    if let Some(next) = next_url {
        metadata.insert("next".into(), Value::String(next.to_string()));
    }
    metadata.insert(
        "fetched_at".into(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    if let Some(obj) = body.as_object_mut() {
        obj.remove("query-continue");
        obj.insert("metadata".into(), Value::Object(metadata));
    }
}

/// Extract every document in one response. The API returns `query.pages` as a
/// map keyed by page id with no stable order, so documents are sorted by
/// numeric id first to keep repeated runs byte-identical.
fn extract_response_pages(
    config: &Config,
    response: &Value,
    records: &mut Vec<Record>,
    stats: &mut HarvestStats,
) -> Result<()> {
    let pages = response
        .pointer("/query/pages")
        .and_then(Value::as_object)
        .ok_or_else(|| HarvestError::PathNotFound("query.pages".into()))?;

    let mut ordered: Vec<(i64, &Value)> = pages
        .iter()
        .map(|(id, page)| (id.parse::<i64>().unwrap_or(i64::MAX), page))
        .collect();
    ordered.sort_by_key(|(id, _)| *id);

    for (page_id, page) in ordered {
        let body = extract::lookup_path(page, extract::MARKUP_PATH)
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::PathNotFound(extract::MARKUP_PATH.into()))?;

        match Template::parse(&strip_syntax_highlighter(body)) {
            Some(template) => {
                records.push(extract::extract(config, page, &template)?);
                stats.records += 1;
            }
            None => match config.on_missing_template {
                MissingTemplate::Abort => {
                    return Err(HarvestError::TemplateAbsent { page_id });
                }
                MissingTemplate::Skip => {
                    warn!("page {} has no template block, skipping", page_id);
                    stats.skipped += 1;
                }
            },
        }
    }

    Ok(())
}
