use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{HarvestError, Result};

/// One scraping run, loaded once from a YAML file and shared read-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub base_url: String,
    pub page_selector: PageSelector,
    pub extractions: Vec<ExtractionRule>,
    #[serde(default)]
    pub post_extraction: Vec<PostProcess>,
    #[serde(default)]
    pub on_missing_template: MissingTemplate,
    pub output_filename: String,
}

/// Which pages to query: one exact page, or every member of a category.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PageSelector {
    Pageid(u64),
    Category(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionRule {
    pub target: Target,
    pub selector: Selector,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub name: String,
}

/// Where a rule's value comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selector {
    /// Dotted/indexed path into the raw page's field bag, e.g. `revisions.0.*`.
    PageData { value: String },
    /// The page's raw markup body, verbatim.
    PageText,
    /// A single template field, copied only when present and non-empty.
    TemplateVariable { value: String },
    /// The family `prefix{start}..=prefix{end}`, collected into one list.
    #[serde(rename_all = "camelCase")]
    CollectedTemplateVariables {
        value: String,
        range_start: usize,
        range_end: usize,
    },
}

/// Post-processing chain entries. Deserializing validates transform names and
/// arguments, so a typo fails at load instead of mid-run.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "transform", rename_all = "camelCase")]
pub enum PostProcess {
    /// Replace `field` with a SHA-256 fingerprint at `<field>Hash`.
    HashAndDrop { field: String },
    /// Zip two equal-length list fields into an ordered mapping at `into`.
    PairNamesAndDescriptions {
        names: String,
        descriptions: String,
        into: String,
    },
    /// Drop the field's leading method line and compact the JSON after it.
    NormalizeEmbeddedJson { field: String },
    /// Split a response example into its known alternative variants.
    SplitConditionalExample { field: String, into: String },
}

/// What to do with a page whose markup has no template block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTemplate {
    #[default]
    Abort,
    Skip,
}

impl Config {
    /// Load and validate a config file. Any failure here aborts the run
    /// before network activity starts.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_yaml::from_str(&text)
            .map_err(|e| HarvestError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Target names must be unique, except that several range-collection
    /// rules may feed the same list field.
    fn validate(&self) -> Result<()> {
        if self.extractions.is_empty() {
            return Err(HarvestError::Config("extractions must not be empty".into()));
        }

        let mut seen: HashMap<&str, &Selector> = HashMap::new();
        for rule in &self.extractions {
            if let Some(earlier) = seen.insert(rule.target.name.as_str(), &rule.selector) {
                let both_collected = matches!(earlier, Selector::CollectedTemplateVariables { .. })
                    && matches!(rule.selector, Selector::CollectedTemplateVariables { .. });
                if !both_collected {
                    return Err(HarvestError::Config(format!(
                        "duplicate extraction target '{}'",
                        rule.target.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
baseUrl: https://destiny.wikia.com/api.php
pageSelector:
  type: category
  value: Endpoints
extractions:
  - target: { name: pageId }
    selector: { type: pageData, value: pageid }
  - target: { name: text }
    selector: { type: pageText }
  - target: { name: name }
    selector: { type: templateVariable, value: name }
  - target: { name: pathParams }
    selector:
      type: collectedTemplateVariables
      value: pathParam
      rangeStart: 0
      rangeEnd: 9
postExtraction:
  - transform: hashAndDrop
    field: text
  - transform: pairNamesAndDescriptions
    names: pathParamNames
    descriptions: pathParamDescriptions
    into: pathParams
outputFilename: endpoints.yml
"#;

    #[test]
    fn parses_full_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(matches!(config.page_selector, PageSelector::Category(ref c) if c == "Endpoints"));
        assert_eq!(config.extractions.len(), 4);
        assert_eq!(config.post_extraction.len(), 2);
        assert_eq!(config.on_missing_template, MissingTemplate::Abort);
        assert!(matches!(
            config.extractions[3].selector,
            Selector::CollectedTemplateVariables { range_start: 0, range_end: 9, .. }
        ));
    }

    #[test]
    fn pageid_selector() {
        let yaml = "type: pageid\nvalue: 123";
        let sel: PageSelector = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(sel, PageSelector::Pageid(123)));
    }

    #[test]
    fn unknown_transform_rejected() {
        let yaml = "transform: frobnicate\nfield: text";
        assert!(serde_yaml::from_str::<PostProcess>(yaml).is_err());
    }

    #[test]
    fn missing_transform_argument_rejected() {
        let yaml = "transform: hashAndDrop";
        assert!(serde_yaml::from_str::<PostProcess>(yaml).is_err());
    }

    #[test]
    fn duplicate_scalar_target_rejected() {
        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.extractions.push(ExtractionRule {
            target: Target { name: "name".into() },
            selector: Selector::PageText,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn shared_range_target_allowed() {
        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.extractions.push(ExtractionRule {
            target: Target { name: "pathParams".into() },
            selector: Selector::CollectedTemplateVariables {
                value: "extraParam".into(),
                range_start: 0,
                range_end: 3,
            },
        });
        assert!(config.validate().is_ok());
    }
}
