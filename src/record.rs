use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One extracted record: field name to value, in insertion order. Field order
/// is part of the output format, so removal must not reshuffle (use
/// `shift_remove`).
pub type Record = IndexMap<String, FieldValue>;

/// A record field: scalar text, an ordered list, or a nested name/value
/// mapping (produced by the pairing transform).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Pairs(IndexMap<String, String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_untagged() {
        let mut record = Record::new();
        record.insert("name".into(), "Foo".into());
        record.insert(
            "params".into(),
            FieldValue::List(vec!["a".into(), "b".into()]),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"Foo","params":["a","b"]}"#);
    }

    #[test]
    fn field_order_survives_removal() {
        let mut record = Record::new();
        record.insert("a".into(), "1".into());
        record.insert("b".into(), "2".into());
        record.insert("c".into(), "3".into());
        record.shift_remove("b");
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }
}
