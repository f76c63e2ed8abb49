use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::PostProcess;
use crate::record::{FieldValue, Record};

// Cross-reference marker inside a name entry: [[Namespace|Key]]
static CROSS_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\[([A-Za-z]*)\|([A-Za-z]*)\]\]").unwrap());

// Boilerplate the wiki editors paste into long response examples.
const TRUNCATION_PHRASES: &[&str] = &[
    "Please note: This response has been truncated for easier viewing.",
    "This response has been truncated to make it easier to see the full structure.",
    "// Note this is an associative array",
    "Note: Response has been truncated.",
];

// GetPublicXurVendor documents both vendor states in one example blob.
const XUR_PAGE: &str = "GetPublicXurVendor";
const XUR_AVAILABLE: &str = "When Xur is available.";
const XUR_UNAVAILABLE: &str = "When Xur isn't available.";

/// Apply one post-processing rule to a record.
///
/// Transforms never fail the run: malformed content is logged and the record
/// is left as it was, so one bad page cannot sink a large batch.
pub fn apply(rule: &PostProcess, record: &mut Record) {
    match rule {
        PostProcess::HashAndDrop { field } => hash_and_drop(record, field),
        PostProcess::PairNamesAndDescriptions {
            names,
            descriptions,
            into,
        } => pair_names_and_descriptions(record, names, descriptions, into),
        PostProcess::NormalizeEmbeddedJson { field } => normalize_embedded_json(record, field),
        PostProcess::SplitConditionalExample { field, into } => {
            split_conditional_example(record, field, into)
        }
    }
}

/// Replace a large text field with a stable SHA-256 fingerprint under
/// `<field>Hash`, keeping change detection without the bulk.
fn hash_and_drop(record: &mut Record, field: &str) {
    let Some(value) = record.get(field) else {
        warn!("hashAndDrop: field '{}' not present", field);
        return;
    };
    let Some(text) = value.as_text() else {
        warn!("hashAndDrop: field '{}' is not text", field);
        return;
    };

    let digest = Sha256::digest(text.as_bytes());
    let hex = format!("{:x}", digest);
    record.insert(format!("{}Hash", field), FieldValue::Text(hex));
    record.shift_remove(field);
}

/// Zip two parallel list fields into one ordered name/description mapping.
/// A name of the form `[[Namespace|Key]]` contributes its key, and the
/// description gains a pointer back to the namespace page.
fn pair_names_and_descriptions(record: &mut Record, names: &str, descriptions: &str, into: &str) {
    let names_value = record.get(names).cloned();
    let descs_value = record.get(descriptions).cloned();
    match (names_value, descs_value) {
        (Some(names_value), Some(descs_value)) => {
            let (Some(name_list), Some(desc_list)) =
                (names_value.as_list(), descs_value.as_list())
            else {
                warn!("pairNamesAndDescriptions: '{}'/'{}' are not lists", names, descriptions);
                return;
            };
            if name_list.is_empty() || desc_list.is_empty() {
                warn!("pairNamesAndDescriptions: empty list in '{}'/'{}'", names, descriptions);
                return;
            }
            if name_list.len() != desc_list.len() {
                warn!(
                    "pairNamesAndDescriptions: {} names vs {} descriptions for '{}'",
                    name_list.len(),
                    desc_list.len(),
                    into
                );
                return;
            }

            let mut pairs = indexmap::IndexMap::new();
            for (name, desc) in name_list.iter().zip(desc_list) {
                match CROSS_REF_RE.captures(name) {
                    Some(caps) => {
                        let annotated =
                            format!("{} (See {} Wikia page for more details.)", desc, &caps[1]);
                        pairs.insert(caps[2].to_string(), annotated);
                    }
                    None => {
                        pairs.insert(name.clone(), desc.clone());
                    }
                }
            }
            record.insert(into.to_string(), FieldValue::Pairs(pairs));
            record.shift_remove(names);
            record.shift_remove(descriptions);
        }
        (Some(_), None) => warn!("pairNamesAndDescriptions: only '{}' found", names),
        (None, Some(_)) => warn!("pairNamesAndDescriptions: only '{}' found", descriptions),
        (None, None) => {}
    }
}

/// The field holds a method label line followed by a JSON document. Discard
/// the label and re-serialize the JSON compactly in place.
fn normalize_embedded_json(record: &mut Record, field: &str) {
    let Some(text) = record.get(field).and_then(FieldValue::as_text) else {
        return;
    };
    let Some((_label, body)) = text.split_once('\n') else {
        warn!("normalizeEmbeddedJson: no body after first line in '{}'", field);
        return;
    };

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(parsed) => {
            let compact = serde_json::to_string(&parsed).unwrap_or_else(|_| body.to_string());
            record.insert(field.to_string(), FieldValue::Text(compact));
        }
        Err(e) => warn!("normalizeEmbeddedJson: invalid JSON in '{}': {}", field, e),
    }
}

/// Split a response example into its alternative variants.
///
/// The Xur vendor page documents both vendor states in one blob separated by
/// literal marker phrases; it becomes a two-element list, available state
/// first. Every other page gets the truncation boilerplate stripped and a
/// single-element list.
fn split_conditional_example(record: &mut Record, field: &str, into: &str) {
    let is_xur = record.get("name").and_then(FieldValue::as_text) == Some(XUR_PAGE);

    if is_xur {
        let Some(text) = record.get(field).and_then(FieldValue::as_text) else {
            warn!("splitConditionalExample: field '{}' not present on {}", field, XUR_PAGE);
            return;
        };
        let cleaned = text.replace(XUR_UNAVAILABLE, "");
        let parts: Vec<&str> = cleaned.splitn(2, XUR_AVAILABLE).collect();
        if parts.len() != 2 {
            warn!("splitConditionalExample: availability marker missing on {}", XUR_PAGE);
            return;
        }
        match (reserialize(parts[1]), reserialize(parts[0])) {
            (Ok(available), Ok(unavailable)) => {
                record.insert(into.to_string(), FieldValue::List(vec![available, unavailable]));
                record.shift_remove(field);
            }
            _ => warn!("splitConditionalExample: invalid JSON in '{}' on {}", field, XUR_PAGE),
        }
    } else if let Some(text) = record.get(field).and_then(FieldValue::as_text).map(str::to_string) {
        let mut cleaned = text;
        for phrase in TRUNCATION_PHRASES {
            cleaned = cleaned.replace(phrase, "");
        }
        match reserialize(&cleaned) {
            Ok(compact) => {
                record.insert(into.to_string(), FieldValue::List(vec![compact]));
                record.shift_remove(field);
            }
            Err(e) => {
                let page = record
                    .get("name")
                    .and_then(FieldValue::as_text)
                    .unwrap_or("<unnamed>");
                warn!("splitConditionalExample: invalid JSON in '{}' on {}: {}", field, page, e);
            }
        }
    }
}

fn reserialize(text: &str) -> serde_json::Result<String> {
    let parsed: serde_json::Value = serde_json::from_str(text)?;
    serde_json::to_string(&parsed)
}
