use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Language;

pub const LINE_COUNT_KEY: &str = "line_count";
pub const LANGUAGE_KEY: &str = "language";
pub const TAGS_KEY: &str = "tags";

/// Structured metadata extracted from a single post.
///
/// Holds the model's JSON object exactly as parsed. On the happy path that is
/// `line_count`, `language` and `tags`, but nothing is validated beyond the
/// response being a JSON object: missing or extra keys pass through unchanged.
/// The typed accessors read the well-known keys leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: Map<String, Value>,
}

impl MetadataRecord {
    /// Wraps a parsed JSON object without validating its shape.
    #[must_use]
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The fallback record used when the model response cannot be parsed:
    /// `{"line_count": null, "language": "Unknown", "tags": []}`.
    #[must_use]
    pub fn degraded() -> Self {
        let mut fields = Map::new();
        fields.insert(LINE_COUNT_KEY.to_string(), Value::Null);
        fields.insert(
            LANGUAGE_KEY.to_string(),
            Value::String(Language::Unknown.as_str().to_string()),
        );
        fields.insert(TAGS_KEY.to_string(), Value::Array(Vec::new()));
        Self { fields }
    }

    /// Returns true when this record is exactly the degraded fallback.
    pub fn is_degraded(&self) -> bool {
        *self == Self::degraded()
    }

    pub fn line_count(&self) -> Option<i64> {
        self.fields.get(LINE_COUNT_KEY).and_then(Value::as_i64)
    }

    pub fn language(&self) -> Language {
        language_from_value(self.fields.get(LANGUAGE_KEY))
    }

    pub fn tags(&self) -> Vec<String> {
        tags_from_value(self.fields.get(TAGS_KEY))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

pub(crate) fn language_from_value(value: Option<&Value>) -> Language {
    value
        .and_then(Value::as_str)
        .map(Language::from_label)
        .unwrap_or(Language::Unknown)
}

/// Reads a `tags` value leniently.
///
/// An array contributes its string elements, a bare string counts as one tag,
/// and anything else yields no tags. Non-string array elements are skipped; see
/// [`non_string_tag_count`].
pub(crate) fn tags_from_value(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(tag)) => vec![tag.clone()],
        _ => Vec::new(),
    }
}

/// Counts the elements of a `tags` array that `tags_from_value` skips.
pub(crate) fn non_string_tag_count(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.iter().filter(|item| !item.is_string()).count(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> MetadataRecord {
        match value {
            Value::Object(fields) => MetadataRecord::from_fields(fields),
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn degraded_record_has_exact_shape() {
        let degraded = MetadataRecord::degraded();

        assert_eq!(
            serde_json::to_value(&degraded).unwrap(),
            json!({"line_count": null, "language": "Unknown", "tags": []})
        );
        assert!(degraded.is_degraded());
        assert_eq!(degraded.line_count(), None);
        assert_eq!(degraded.language(), Language::Unknown);
        assert!(degraded.tags().is_empty());
    }

    #[test]
    fn typed_accessors_read_happy_path_record() {
        let meta = record(json!({
            "line_count": 3,
            "language": "Hinglish",
            "tags": ["Career", "Motivation"]
        }));

        assert_eq!(meta.line_count(), Some(3));
        assert_eq!(meta.language(), Language::Hinglish);
        assert_eq!(meta.tags(), vec!["Career", "Motivation"]);
        assert!(!meta.is_degraded());
    }

    #[test]
    fn missing_keys_are_passed_through_untouched() {
        let meta = record(json!({"language": "English"}));

        assert_eq!(meta.fields().len(), 1);
        assert_eq!(meta.line_count(), None);
        assert!(meta.tags().is_empty());
        assert!(!meta.is_degraded());
    }

    #[test]
    fn tags_reader_is_lenient() {
        assert_eq!(tags_from_value(Some(&json!("Solo"))), vec!["Solo"]);
        assert_eq!(tags_from_value(Some(&json!(["A", 1, null, "B"]))), vec!["A", "B"]);
        assert!(tags_from_value(Some(&json!({"A": 1}))).is_empty());
        assert!(tags_from_value(None).is_empty());
    }

    #[test]
    fn non_string_tags_are_counted() {
        assert_eq!(non_string_tag_count(Some(&json!([1, "A"]))), 1);
        assert_eq!(non_string_tag_count(Some(&json!(["A", null, {"t": "B"}]))), 2);
        assert_eq!(non_string_tag_count(Some(&json!(["A", "B"]))), 0);
        assert_eq!(non_string_tag_count(Some(&json!("Solo"))), 0);
        assert_eq!(non_string_tag_count(None), 0);
    }

    #[test]
    fn unrecognized_language_reads_as_unknown() {
        let meta = record(json!({"language": "Tamil"}));
        assert_eq!(meta.language(), Language::Unknown);

        let meta = record(json!({"language": 7}));
        assert_eq!(meta.language(), Language::Unknown);
    }
}
