use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::metadata::{
    LANGUAGE_KEY, LINE_COUNT_KEY, TAGS_KEY, language_from_value, non_string_tag_count,
    tags_from_value,
};
use super::{Language, MetadataRecord};

/// One social-media post and whatever metadata has been attached to it.
///
/// Posts keep every attribute from the input file in its original order; the
/// pipeline only reads the text field and writes `line_count`, `language` and
/// `tags`.
///
/// # Examples
///
/// ```
/// use posttag::Post;
///
/// let post = Post::with_text("text", "Excited to start my new job!");
/// assert_eq!(post.text("text"), Some("Excited to start my new job!"));
/// assert!(post.tags().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Post {
    fields: Map<String, Value>,
}

impl Post {
    #[must_use]
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Creates a post holding a single text attribute.
    #[must_use]
    pub fn with_text(field: &str, text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(field.to_string(), Value::String(text.into()));
        Self { fields }
    }

    /// Returns the body stored under `field`, if it is a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Merges extracted metadata into the post.
    ///
    /// Metadata keys are applied after the post's own attributes, so on a key
    /// collision the metadata value replaces the original (in place).
    pub fn merge_metadata(&mut self, metadata: MetadataRecord) {
        for (key, value) in metadata.into_fields() {
            self.fields.insert(key, value);
        }
    }

    pub fn tags(&self) -> Vec<String> {
        tags_from_value(self.fields.get(TAGS_KEY))
    }

    /// Number of `tags` array elements that are not strings and so are not
    /// returned by [`Post::tags`].
    pub fn non_string_tags(&self) -> usize {
        non_string_tag_count(self.fields.get(TAGS_KEY))
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        let tags = tags.into_iter().map(Value::String).collect();
        self.fields.insert(TAGS_KEY.to_string(), Value::Array(tags));
    }

    pub fn language(&self) -> Language {
        language_from_value(self.fields.get(LANGUAGE_KEY))
    }

    pub fn line_count(&self) -> Option<i64> {
        self.fields.get(LINE_COUNT_KEY).and_then(Value::as_i64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for Post {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_fields(fields)
    }
}
