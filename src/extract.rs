use serde_json::Value;

use crate::config::{Config, Selector};
use crate::error::{HarvestError, Result};
use crate::record::{FieldValue, Record};
use crate::template::Template;
use crate::transform;

/// Path to a page's markup body inside the API response's page object.
pub const MARKUP_PATH: &str = "revisions.0.*";

/// Build one record from a page's raw field bag and its parsed template,
/// then run the post-processing chain over it.
///
/// Rules evaluate in configured order; a later rule overwrites an earlier
/// rule's field when target names collide.
pub fn extract(config: &Config, page_data: &Value, template: &Template) -> Result<Record> {
    let mut record = Record::new();

    for rule in &config.extractions {
        let target = rule.target.name.as_str();
        match &rule.selector {
            Selector::PageData { value: path } => {
                let found = lookup_path(page_data, path)
                    .ok_or_else(|| HarvestError::PathNotFound(path.clone()))?;
                record.insert(target.to_string(), FieldValue::Text(value_to_text(found)));
            }
            Selector::PageText => {
                let body = lookup_path(page_data, MARKUP_PATH)
                    .ok_or_else(|| HarvestError::PathNotFound(MARKUP_PATH.into()))?;
                record.insert(target.to_string(), FieldValue::Text(value_to_text(body)));
            }
            Selector::TemplateVariable { value: field } => {
                // Absent or empty after trimming means no output field at all
                if let Some(text) = template.get(field).filter(|t| !t.is_empty()) {
                    record.insert(target.to_string(), FieldValue::Text(text.to_string()));
                }
            }
            Selector::CollectedTemplateVariables {
                value: prefix,
                range_start,
                range_end,
            } => {
                for i in *range_start..=*range_end {
                    let field = format!("{}{}", prefix, i);
                    let Some(text) = template.get(&field) else {
                        // Ranges may be sparse
                        continue;
                    };
                    match record
                        .entry(target.to_string())
                        .or_insert_with(|| FieldValue::List(Vec::new()))
                    {
                        FieldValue::List(items) => items.push(text.to_string()),
                        other => *other = FieldValue::List(vec![text.to_string()]),
                    }
                }
            }
        }
    }

    for rule in &config.post_extraction {
        transform::apply(rule, &mut record);
    }

    Ok(record)
}

/// Walk a dotted path through a JSON value; numeric segments index arrays.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Record fields are scalar strings: strings pass through, other scalars
/// render in their JSON form.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractionRule, Target};

    fn rule(name: &str, selector: Selector) -> ExtractionRule {
        ExtractionRule {
            target: Target { name: name.into() },
            selector,
        }
    }

    fn config_with(extractions: Vec<ExtractionRule>) -> Config {
        let yaml = r#"
baseUrl: https://example.wikia.com/api.php
pageSelector: { type: pageid, value: 123 }
extractions:
  - target: { name: placeholder }
    selector: { type: pageText }
outputFilename: out.yml
"#;
        let mut config: Config = serde_yaml::from_str(yaml).unwrap();
        config.extractions = extractions;
        config
    }

    fn page_with_markup(markup: &str) -> Value {
        serde_json::json!({
            "pageid": 123,
            "title": "GetItem",
            "revisions": [ { "*": markup } ]
        })
    }

    #[test]
    fn template_field_scenario() {
        // Page selected by id, one templateVariable rule, no post-processing
        let config = config_with(vec![rule(
            "name",
            Selector::TemplateVariable { value: "name".into() },
        )]);
        let page = page_with_markup("{{Endpoint|name = Foo}}");
        let template = Template::parse("{{Endpoint|name = Foo}}").unwrap();

        let record = extract(&config, &page, &template).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("name").unwrap().as_text(), Some("Foo"));
    }

    #[test]
    fn extraction_is_deterministic() {
        let config = config_with(vec![
            rule("pageId", Selector::PageData { value: "pageid".into() }),
            rule("name", Selector::TemplateVariable { value: "name".into() }),
        ]);
        let page = page_with_markup("{{Endpoint|name = Foo}}");
        let template = Template::parse("{{Endpoint|name = Foo}}").unwrap();

        let first = extract(&config, &page, &template).unwrap();
        let second = extract(&config, &page, &template).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn page_data_path_walks_arrays() {
        let config = config_with(vec![rule(
            "text",
            Selector::PageData { value: "revisions.0.*".into() },
        )]);
        let page = page_with_markup("{{T|a = 1}}");
        let template = Template::parse("{{T|a = 1}}").unwrap();

        let record = extract(&config, &page, &template).unwrap();
        assert_eq!(record.get("text").unwrap().as_text(), Some("{{T|a = 1}}"));
    }

    #[test]
    fn missing_path_aborts() {
        let config = config_with(vec![rule(
            "nope",
            Selector::PageData { value: "revisions.5.*".into() },
        )]);
        let page = page_with_markup("{{T|a = 1}}");
        let template = Template::parse("{{T|a = 1}}").unwrap();

        let err = extract(&config, &page, &template).unwrap_err();
        assert!(matches!(err, HarvestError::PathNotFound(_)));
    }

    #[test]
    fn empty_template_field_omitted() {
        let config = config_with(vec![rule(
            "summary",
            Selector::TemplateVariable { value: "summary".into() },
        )]);
        let markup = "{{Endpoint|summary =   \n|name = Foo}}";
        let page = page_with_markup(markup);
        let template = Template::parse(markup).unwrap();

        let record = extract(&config, &page, &template).unwrap();
        assert!(record.get("summary").is_none());
    }

    #[test]
    fn range_collection_tolerates_gaps() {
        let config = config_with(vec![rule(
            "params",
            Selector::CollectedTemplateVariables {
                value: "p".into(),
                range_start: 0,
                range_end: 2,
            },
        )]);
        let markup = "{{Endpoint|p0 = first|p2 = third}}";
        let page = page_with_markup(markup);
        let template = Template::parse(markup).unwrap();

        let record = extract(&config, &page, &template).unwrap();
        let items = record.get("params").unwrap().as_list().unwrap();
        assert_eq!(items, &["first", "third"]);
    }

    #[test]
    fn empty_range_omits_target() {
        let config = config_with(vec![rule(
            "params",
            Selector::CollectedTemplateVariables {
                value: "p".into(),
                range_start: 0,
                range_end: 4,
            },
        )]);
        let markup = "{{Endpoint|name = Foo}}";
        let page = page_with_markup(markup);
        let template = Template::parse(markup).unwrap();

        let record = extract(&config, &page, &template).unwrap();
        assert!(record.get("params").is_none());
    }

    #[test]
    fn later_rule_overwrites_earlier() {
        let config = config_with(vec![
            rule("name", Selector::TemplateVariable { value: "name".into() }),
            rule("name", Selector::TemplateVariable { value: "alias".into() }),
        ]);
        let markup = "{{Endpoint|name = Foo|alias = Bar}}";
        let page = page_with_markup(markup);
        let template = Template::parse(markup).unwrap();

        let record = extract(&config, &page, &template).unwrap();
        assert_eq!(record.get("name").unwrap().as_text(), Some("Bar"));
    }

    #[test]
    fn non_string_scalars_render_as_json() {
        let config = config_with(vec![rule(
            "pageId",
            Selector::PageData { value: "pageid".into() },
        )]);
        let page = page_with_markup("{{T|a = 1}}");
        let template = Template::parse("{{T|a = 1}}").unwrap();

        let record = extract(&config, &page, &template).unwrap();
        assert_eq!(record.get("pageId").unwrap().as_text(), Some("123"));
    }

    #[test]
    fn post_processing_runs_after_rules() {
        let mut config = config_with(vec![rule("text", Selector::PageText)]);
        config.post_extraction =
            vec![crate::config::PostProcess::HashAndDrop { field: "text".into() }];
        let page = page_with_markup("{{T|a = 1}}");
        let template = Template::parse("{{T|a = 1}}").unwrap();

        let record = extract(&config, &page, &template).unwrap();
        assert!(record.get("text").is_none());
        assert!(record.get("textHash").is_some());
    }
}
