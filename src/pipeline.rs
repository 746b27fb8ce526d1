//! Two-pass corpus enrichment.
//!
//! `CorpusPipeline` runs metadata extraction over every post in order, unifies the
//! resulting tag vocabulary with a single model call, rewrites each post's tags
//! through that mapping and, via [`CorpusPipeline::run`], persists the batch.
//!
//! Execution is strictly sequential. Any fatal error aborts the run before
//! anything is written.
//!
//! Post bodies reach the extractor unchanged. Surrogate code points cannot occur in
//! a Rust string; lone surrogate escapes are removed when the corpus is loaded
//! (see [`corpus::parse_posts`]).

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::corpus::{self, CorpusError};
use crate::extractor::StructuredExtractor;
use crate::gateway::{GatewayError, ModelGateway};
use crate::models::{Language, Post, TagMapping};
use crate::unifier::{TagUnifier, UnifyError, collect_tags};

/// Field holding the post body when none is configured.
pub const DEFAULT_TEXT_FIELD: &str = "text";

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A metadata extraction call failed
    #[error("Metadata extraction failed for post {index}: {source}")]
    Gateway {
        index: usize,
        #[source]
        source: GatewayError,
    },

    /// Tag unification failed; the batch cannot be completed
    #[error("Tag unification failed: {0}")]
    Unify(#[from] UnifyError),

    /// A post has no string body under the configured field
    #[error("Post {index} has no text field '{field}'")]
    MissingText { index: usize, field: String },

    /// A post's tag has no entry in the unified mapping
    #[error("Post {index} has tag '{tag}' with no unified mapping")]
    UnmappedTag { index: usize, tag: String },

    /// Loading or saving the corpus failed
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

/// How to treat a post tag that the unified mapping does not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingTagPolicy {
    /// Abort the run with `PipelineError::UnmappedTag`.
    #[default]
    Fail,
    /// Keep the original, unmapped tag.
    KeepOriginal,
    /// Remove the tag from the post.
    Drop,
}

impl FromStr for MissingTagPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "keep" | "keep-original" => Ok(Self::KeepOriginal),
            "drop" => Ok(Self::Drop),
            other => Err(format!(
                "unknown missing-tag policy '{other}' (expected fail, keep or drop)"
            )),
        }
    }
}

/// Counts describing one enrichment run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnrichmentSummary {
    pub posts: usize,
    /// Posts whose extraction response could not be parsed.
    pub degraded: usize,
    pub languages: BTreeMap<Language, usize>,
    /// Distinct tags before unification.
    pub tags_before: usize,
    /// Distinct tags after remapping.
    pub tags_after: usize,
}

impl fmt::Display for EnrichmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} posts ({} degraded), {} tags unified into {}",
            self.posts, self.degraded, self.tags_before, self.tags_after
        )?;
        for (language, count) in &self.languages {
            write!(f, ", {language}: {count}")?;
        }
        Ok(())
    }
}

/// Rewrites every post's tags through `mapping`.
///
/// Canonical tags are deduplicated per post, keeping first-occurrence order.
/// Non-string elements of a `tags` array are dropped with a warning.
///
/// # Errors
///
/// With `MissingTagPolicy::Fail`, returns `PipelineError::UnmappedTag` for the first
/// tag without a mapping entry. Posts are left untouched in that case.
pub fn remap_tags(
    posts: &mut [Post],
    mapping: &TagMapping,
    policy: MissingTagPolicy,
) -> Result<(), PipelineError> {
    let mut remapped = Vec::with_capacity(posts.len());

    for (index, post) in posts.iter().enumerate() {
        let ignored = post.non_string_tags();
        if ignored > 0 {
            tracing::warn!(index, ignored, "dropping non-string tags");
        }

        let mut canonical: Vec<String> = Vec::new();
        for tag in post.tags() {
            let unified = match (mapping.get(&tag), policy) {
                (Some(unified), _) => unified.to_string(),
                (None, MissingTagPolicy::KeepOriginal) => tag,
                (None, MissingTagPolicy::Drop) => continue,
                (None, MissingTagPolicy::Fail) => {
                    return Err(PipelineError::UnmappedTag { index, tag });
                }
            };
            if !canonical.contains(&unified) {
                canonical.push(unified);
            }
        }
        remapped.push(canonical);
    }

    for (post, tags) in posts.iter_mut().zip(remapped) {
        post.set_tags(tags);
    }
    Ok(())
}

/// Builder for constructing `CorpusPipeline` instances.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use posttag::gateway::GroqClientBuilder;
/// use posttag::pipeline::{CorpusPipelineBuilder, MissingTagPolicy};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GroqClientBuilder::new().build()?;
/// let pipeline = CorpusPipelineBuilder::new()
///     .gateway(Arc::new(client))
///     .missing_tag_policy(MissingTagPolicy::KeepOriginal)
///     .build();
///
/// let summary = pipeline.run(
///     Path::new("data/raw_posts.json"),
///     Path::new("data/processed_posts.json"),
/// )?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CorpusPipelineBuilder {
    gateway: Option<Arc<dyn ModelGateway>>,
    text_field: Option<String>,
    missing_tag_policy: MissingTagPolicy,
}

impl CorpusPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gateway shared by extraction and unification.
    pub fn gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Sets the post attribute holding the body text (default `"text"`).
    pub fn text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = Some(field.into());
        self
    }

    pub fn missing_tag_policy(mut self, policy: MissingTagPolicy) -> Self {
        self.missing_tag_policy = policy;
        self
    }

    /// Builds the `CorpusPipeline`.
    ///
    /// # Panics
    ///
    /// Panics if `gateway()` was not called before `build()`.
    #[must_use]
    pub fn build(self) -> CorpusPipeline {
        let gateway = self
            .gateway
            .expect("gateway must be set via gateway() method");

        CorpusPipeline {
            extractor: StructuredExtractor::new(Arc::clone(&gateway)),
            unifier: TagUnifier::new(gateway),
            text_field: self
                .text_field
                .unwrap_or_else(|| DEFAULT_TEXT_FIELD.to_string()),
            missing_tag_policy: self.missing_tag_policy,
        }
    }
}

/// Orchestrates extraction, unification and remapping for one batch of posts.
pub struct CorpusPipeline {
    extractor: StructuredExtractor,
    unifier: TagUnifier,
    text_field: String,
    missing_tag_policy: MissingTagPolicy,
}

impl CorpusPipeline {
    /// Creates a pipeline with the default text field and `MissingTagPolicy::Fail`.
    #[must_use]
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        CorpusPipelineBuilder::new().gateway(gateway).build()
    }

    /// Enriches a batch of posts, returning them in input order.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if a post has no text, a model call fails, tag
    /// unification fails, or a tag is unmapped under `MissingTagPolicy::Fail`.
    pub fn process(&self, raw_posts: Vec<Post>) -> Result<Vec<Post>, PipelineError> {
        self.enrich(raw_posts).map(|(posts, _)| posts)
    }

    /// Loads `input`, enriches it and writes the result to `output`.
    ///
    /// The output file is only created once every step has succeeded.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` for any load, enrichment or write failure.
    pub fn run(&self, input: &Path, output: &Path) -> Result<EnrichmentSummary, PipelineError> {
        let raw_posts = corpus::load_posts(input)?;
        tracing::info!(posts = raw_posts.len(), input = %input.display(), "loaded corpus");

        let (posts, summary) = self.enrich(raw_posts)?;

        corpus::save_posts(output, &posts)?;
        tracing::info!(output = %output.display(), %summary, "wrote enriched corpus");
        Ok(summary)
    }

    fn enrich(&self, raw_posts: Vec<Post>) -> Result<(Vec<Post>, EnrichmentSummary), PipelineError> {
        let mut summary = EnrichmentSummary {
            posts: raw_posts.len(),
            ..EnrichmentSummary::default()
        };
        let mut posts = Vec::with_capacity(raw_posts.len());

        for (index, mut post) in raw_posts.into_iter().enumerate() {
            let text = post
                .text(&self.text_field)
                .ok_or_else(|| PipelineError::MissingText {
                    index,
                    field: self.text_field.clone(),
                })?;

            let metadata = self
                .extractor
                .extract_metadata(text)
                .map_err(|source| PipelineError::Gateway { index, source })?;

            if metadata.is_degraded() {
                summary.degraded += 1;
            }
            tracing::debug!(
                index,
                language = %metadata.language(),
                tags = metadata.tags().len(),
                "extracted metadata"
            );

            post.merge_metadata(metadata);
            posts.push(post);
        }

        summary.tags_before = collect_tags(&posts).len();
        let mapping = self.unifier.unify_tags(&posts)?;
        remap_tags(&mut posts, &mapping, self.missing_tag_policy)?;
        summary.tags_after = collect_tags(&posts).len();

        for post in &posts {
            *summary.languages.entry(post.language()).or_default() += 1;
        }

        Ok((posts, summary))
    }
}
