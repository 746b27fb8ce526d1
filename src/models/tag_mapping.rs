use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A mapping value that is not a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("canonical value for tag '{tag}' is not a string")]
pub struct NonStringCanonical {
    pub tag: String,
}

/// Mapping from every tag observed in a batch to its canonical form.
///
/// Built once per batch by the tag unifier and consumed once to rewrite all posts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMapping {
    entries: BTreeMap<String, String>,
}

impl TagMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps every tag to itself.
    #[must_use]
    pub fn identity<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = tags
            .into_iter()
            .map(Into::into)
            .map(|tag: String| (tag.clone(), tag))
            .collect();
        Self { entries }
    }

    /// Builds a mapping from a parsed JSON object whose values must all be strings.
    ///
    /// # Errors
    ///
    /// Returns `NonStringCanonical` naming the first tag whose value is not a string.
    pub fn from_json_object(object: Map<String, Value>) -> Result<Self, NonStringCanonical> {
        let mut entries = BTreeMap::new();
        for (tag, canonical) in object {
            match canonical {
                Value::String(canonical) => {
                    entries.insert(tag, canonical);
                }
                _ => return Err(NonStringCanonical { tag }),
            }
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, tag: impl Into<String>, canonical: impl Into<String>) {
        self.entries.insert(tag.into(), canonical.into());
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the distinct canonical tags.
    pub fn canonical_tags(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    /// Returns the tags from `tags` that have no entry.
    pub fn missing<'a>(&self, tags: impl IntoIterator<Item = &'a String>) -> Vec<&'a str> {
        tags.into_iter()
            .filter(|tag| !self.entries.contains_key(tag.as_str()))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn from_json_object_accepts_string_values() {
        let mapping = TagMapping::from_json_object(object(json!({
            "Jobseekers": "Job Search",
            "Job Hunting": "Job Search",
            "Motivation": "Motivation"
        })))
        .unwrap();

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.get("Jobseekers"), Some("Job Search"));
        assert_eq!(mapping.get("Motivation"), Some("Motivation"));
        assert_eq!(mapping.get("Scams"), None);
        assert_eq!(
            mapping.canonical_tags().into_iter().collect::<Vec<_>>(),
            vec!["Job Search", "Motivation"]
        );
    }

    #[test]
    fn from_json_object_rejects_non_string_value() {
        let err = TagMapping::from_json_object(object(json!({
            "Career": "Career",
            "Scam Alert": ["Scams"]
        })))
        .unwrap_err();

        assert_eq!(err.tag, "Scam Alert");
    }

    #[test]
    fn identity_maps_each_tag_to_itself() {
        let mapping = TagMapping::identity(["Career", "Motivation"]);

        assert_eq!(mapping.get("Career"), Some("Career"));
        assert_eq!(mapping.get("Motivation"), Some("Motivation"));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn missing_lists_tags_without_entry() {
        let mapping = TagMapping::identity(["Career"]);
        let tags = vec!["Career".to_string(), "Scams".to_string()];

        assert_eq!(mapping.missing(&tags), vec!["Scams"]);
    }
}
