//! Per-post metadata extraction using a hosted LLM.
//!
//! This module provides the `StructuredExtractor` struct which asks the model for a
//! post's line count, language and up to two topical tags. Unparseable model output
//! never fails the call; it degrades to `MetadataRecord::degraded()` so one bad
//! response cannot abort a batch.

use std::sync::Arc;

use crate::gateway::{GatewayError, ModelGateway};
use crate::models::MetadataRecord;
use crate::output::parse_json_object;

/// Prompt template for metadata extraction.
///
/// The post body is embedded verbatim in place of `{post}`.
const PROMPT_TEMPLATE: &str = r#"You are given a LinkedIn post. Extract the number of lines, the language of the post and its tags.

INSTRUCTIONS:
1. Return ONLY a valid JSON object. No preamble and no explanatory text.
2. The JSON object must have exactly three keys: line_count, language and tags.
3. line_count is an integer.
4. tags is an array of short text tags. Extract at most two tags.
5. language must be "English" or "Hinglish" (Hinglish means Hindi mixed with English).

EXAMPLE OUTPUT:
{"line_count": 4, "language": "English", "tags": ["Job Search", "Motivation"]}

POST:
{post}

JSON OUTPUT:"#;

/// Renders the extraction prompt for one post body.
fn render_prompt(post_text: &str) -> String {
    PROMPT_TEMPLATE.replace("{post}", post_text)
}

/// Builder for constructing `StructuredExtractor` instances.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use posttag::extractor::StructuredExtractorBuilder;
/// use posttag::gateway::GroqClientBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GroqClientBuilder::new().build()?;
///
/// let extractor = StructuredExtractorBuilder::new()
///     .gateway(Arc::new(client))
///     .build();
///
/// let metadata = extractor.extract_metadata("Excited to start my new job! #career")?;
/// println!("{} / {:?}", metadata.language(), metadata.tags());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct StructuredExtractorBuilder {
    gateway: Option<Arc<dyn ModelGateway>>,
}

impl StructuredExtractorBuilder {
    /// Creates a new `StructuredExtractorBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model gateway used for extraction calls.
    pub fn gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Builds the `StructuredExtractor`.
    ///
    /// # Panics
    ///
    /// Panics if `gateway()` was not called before `build()`.
    #[must_use]
    pub fn build(self) -> StructuredExtractor {
        StructuredExtractor {
            gateway: self
                .gateway
                .expect("gateway must be set via gateway() method"),
        }
    }
}

/// Extracts structured metadata from post text via the model gateway.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use posttag::extractor::StructuredExtractor;
/// use posttag::gateway::GroqClientBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GroqClientBuilder::new().build()?;
/// let extractor = StructuredExtractor::new(Arc::new(client));
///
/// let metadata = extractor.extract_metadata("Aaj ka din bahut productive tha!")?;
/// println!("{:?} lines, {}", metadata.line_count(), metadata.language());
/// # Ok(())
/// # }
/// ```
pub struct StructuredExtractor {
    gateway: Arc<dyn ModelGateway>,
}

impl StructuredExtractor {
    #[must_use]
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Extracts `line_count`, `language` and `tags` for one post.
    ///
    /// Returns the model's JSON object as-is when it parses; no schema validation
    /// is applied beyond that. Any parse failure returns the degraded record
    /// `{"line_count": null, "language": "Unknown", "tags": []}` instead.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` only when the model call itself fails. The model is
    /// called exactly once; nothing is retried.
    pub fn extract_metadata(&self, post_text: &str) -> Result<MetadataRecord, GatewayError> {
        let prompt = render_prompt(post_text);
        let response = self.gateway.complete(&prompt)?;

        match parse_json_object(&response) {
            Ok(fields) => Ok(MetadataRecord::from_fields(fields)),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable metadata response, using degraded record");
                Ok(MetadataRecord::degraded())
            }
        }
    }
}
