//! Corpus-wide tag unification.
//!
//! After extraction every post carries up to two free-form tags, and the same idea
//! shows up under several spellings ("Jobseekers", "Job Hunting"). `TagUnifier`
//! sends the whole tag vocabulary to the model in one call and reads back a mapping
//! from each original tag to a shorter, title-cased canonical vocabulary.
//!
//! Unlike per-post extraction there is no safe default here: a single response covers
//! the entire batch, so an unparseable reply is returned as an error.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::gateway::{GatewayError, ModelGateway};
use crate::models::{NonStringCanonical, Post, TagMapping};
use crate::output::{OutputParseError, parse_json_object};

/// Prompt template for tag unification.
///
/// The comma-joined tag vocabulary replaces `{tags}`.
const PROMPT_TEMPLATE: &str = r#"I will give you a list of tags. Unify them according to these rules:

1. Merge similar tags into a shorter list of canonical tags.
   Example: "Jobseekers" and "Job Hunting" both become "Job Search".
   Example: "Motivation", "Inspiration" and "Drive" all become "Motivation".
   Example: "Personal Growth", "Personal Development" and "Self Improvement" become "Self Improvement".
   Example: "Scam Alert" and "Job Scam" become "Scams".
2. Every canonical tag uses title case, e.g. "Motivation", "Job Search".
3. Return ONLY a JSON object. No preamble.
4. The object maps EVERY original tag to its canonical tag. A tag that needs no change maps to itself.
   Example: {"Jobseekers": "Job Search", "Job Hunting": "Job Search", "Motivation": "Motivation"}

TAGS:
{tags}

JSON OUTPUT:"#;

/// Errors that abort tag unification.
#[derive(Debug, Error)]
pub enum UnifyError {
    /// The model call failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The model response could not be read as a JSON object
    #[error("context too big, unable to parse unified tags: {0}")]
    Unparseable(#[source] OutputParseError),

    /// The response parsed, but is not a tag-to-tag mapping
    #[error("invalid tag mapping: {0}")]
    InvalidMapping(#[from] NonStringCanonical),
}

/// Collects the distinct tags across a batch of enriched posts.
///
/// The set is sorted so the rendered prompt is reproducible for a given batch.
///
/// ```
/// use posttag::Post;
/// use posttag::unifier::collect_tags;
///
/// let mut a = Post::with_text("text", "a");
/// a.set_tags(vec!["Career".into(), "Motivation".into()]);
/// let mut b = Post::with_text("text", "b");
/// b.set_tags(vec!["Career".into()]);
///
/// let tags = collect_tags(&[a, b]);
/// assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["Career", "Motivation"]);
/// ```
pub fn collect_tags(posts: &[Post]) -> BTreeSet<String> {
    posts.iter().flat_map(Post::tags).collect()
}

fn render_prompt(tags: &BTreeSet<String>) -> String {
    let joined = tags.iter().map(String::as_str).collect::<Vec<_>>().join(",");
    PROMPT_TEMPLATE.replace("{tags}", &joined)
}

/// Builder for constructing `TagUnifier` instances.
#[derive(Default)]
pub struct TagUnifierBuilder {
    gateway: Option<Arc<dyn ModelGateway>>,
}

impl TagUnifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Builds the `TagUnifier`.
    ///
    /// # Panics
    ///
    /// Panics if `gateway()` was not called before `build()`.
    #[must_use]
    pub fn build(self) -> TagUnifier {
        TagUnifier {
            gateway: self
                .gateway
                .expect("gateway must be set via gateway() method"),
        }
    }
}

/// Collapses a batch's tag vocabulary into canonical tags with one model call.
pub struct TagUnifier {
    gateway: Arc<dyn ModelGateway>,
}

impl TagUnifier {
    #[must_use]
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Builds the tag mapping for an enriched batch.
    ///
    /// Every post should already carry a `tags` field. A batch with no tags at all
    /// yields an empty mapping without calling the model.
    ///
    /// Tags the model leaves out of its mapping are logged, not rejected; how a
    /// missing entry is treated is decided when posts are remapped.
    ///
    /// # Errors
    ///
    /// Returns `UnifyError::Gateway` if the model call fails,
    /// `UnifyError::Unparseable` if the response is not a JSON object, and
    /// `UnifyError::InvalidMapping` if any mapped value is not a string.
    pub fn unify_tags(&self, posts: &[Post]) -> Result<TagMapping, UnifyError> {
        let tags = collect_tags(posts);
        if tags.is_empty() {
            tracing::debug!("no tags to unify");
            return Ok(TagMapping::new());
        }

        tracing::info!(vocabulary = tags.len(), "unifying tags");
        let prompt = render_prompt(&tags);
        let response = self.gateway.complete(&prompt)?;

        let object = parse_json_object(&response).map_err(UnifyError::Unparseable)?;
        let mapping = TagMapping::from_json_object(object)?;

        let missing = mapping.missing(&tags);
        if !missing.is_empty() {
            tracing::warn!(?missing, "unified mapping does not cover every tag");
        }

        tracing::info!(
            canonical = mapping.canonical_tags().len(),
            "tag vocabulary unified"
        );
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockGateway {
        response: String,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl MockGateway {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    impl ModelGateway for MockGateway {
        fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    fn tagged(tags: &[&str]) -> Post {
        let mut post = Post::with_text("text", "body");
        post.set_tags(tags.iter().map(|t| t.to_string()).collect());
        post
    }

    #[test]
    fn collect_tags_deduplicates_across_posts() {
        let posts = vec![
            tagged(&["Jobseekers", "Motivation"]),
            tagged(&["Motivation"]),
            tagged(&[]),
            tagged(&["Job Hunting"]),
        ];

        let tags: Vec<String> = collect_tags(&posts).into_iter().collect();
        assert_eq!(tags, vec!["Job Hunting", "Jobseekers", "Motivation"]);
    }

    #[test]
    fn prompt_lists_comma_joined_vocabulary() {
        let mock = Arc::new(MockGateway::new(
            r#"{"Inspiration": "Motivation", "Motivation": "Motivation"}"#,
        ));
        let unifier = TagUnifier::new(mock.clone());

        unifier
            .unify_tags(&[tagged(&["Motivation", "Inspiration"])])
            .unwrap();

        let prompt = mock.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Inspiration,Motivation"));
        assert!(prompt.contains("title case"));
        assert!(!prompt.contains("{tags}"));
    }

    #[test]
    fn mapping_keys_equal_input_tag_set() {
        let mock = MockGateway::new(
            r#"{"Jobseekers": "Job Search", "Job Hunting": "Job Search", "Motivation": "Motivation"}"#,
        );
        let unifier = TagUnifier::new(Arc::new(mock));
        let posts = vec![tagged(&["Jobseekers", "Motivation"]), tagged(&["Job Hunting"])];

        let mapping = unifier.unify_tags(&posts).unwrap();

        let keys: BTreeSet<String> = mapping.keys().map(str::to_string).collect();
        assert_eq!(keys, collect_tags(&posts));
        assert_eq!(mapping.get("Job Hunting"), Some("Job Search"));
    }

    #[test]
    fn unparseable_response_is_an_error() {
        let mock = MockGateway::new("Sorry, that list is too long for me to process.");
        let unifier = TagUnifier::new(Arc::new(mock));

        let err = unifier.unify_tags(&[tagged(&["Career"])]).unwrap_err();

        assert!(matches!(err, UnifyError::Unparseable(_)));
        assert!(err.to_string().contains("unable to parse unified tags"));
    }

    #[test]
    fn non_object_response_is_an_error() {
        let mock = MockGateway::new(r#"["Career"]"#);
        let unifier = TagUnifier::new(Arc::new(mock));

        let err = unifier.unify_tags(&[tagged(&["Career"])]).unwrap_err();
        assert!(matches!(
            err,
            UnifyError::Unparseable(OutputParseError::NotAnObject)
        ));
    }

    #[test]
    fn non_string_canonical_value_is_an_error() {
        let mock = MockGateway::new(r#"{"Career": {"canonical": "Career"}}"#);
        let unifier = TagUnifier::new(Arc::new(mock));

        let err = unifier.unify_tags(&[tagged(&["Career"])]).unwrap_err();
        assert!(matches!(err, UnifyError::InvalidMapping(_)));
    }

    #[test]
    fn gateway_error_propagates() {
        struct FailingGateway;

        impl ModelGateway for FailingGateway {
            fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
                Err(GatewayError::Api {
                    message: "context_length_exceeded".to_string(),
                })
            }
        }

        let unifier = TagUnifier::new(Arc::new(FailingGateway));
        let err = unifier.unify_tags(&[tagged(&["Career"])]).unwrap_err();

        assert!(matches!(err, UnifyError::Gateway(GatewayError::Api { .. })));
    }

    #[test]
    fn empty_vocabulary_skips_model_call() {
        let mock = Arc::new(MockGateway::new("not json"));
        let unifier = TagUnifier::new(mock.clone());

        let mapping = unifier.unify_tags(&[tagged(&[]), tagged(&[])]).unwrap();

        assert!(mapping.is_empty());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn model_is_called_once_per_batch() {
        let mock = Arc::new(MockGateway::new(r#"{"A": "A", "B": "B", "C": "C"}"#));
        let unifier = TagUnifierBuilder::new().gateway(mock.clone()).build();

        unifier
            .unify_tags(&[tagged(&["A", "B"]), tagged(&["C"]), tagged(&["A"])])
            .unwrap();

        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn incomplete_mapping_is_returned_as_is() {
        let mock = MockGateway::new(r#"{"A": "Alpha"}"#);
        let unifier = TagUnifier::new(Arc::new(mock));

        let mapping = unifier.unify_tags(&[tagged(&["A", "B"])]).unwrap();

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("B"), None);
    }
}
