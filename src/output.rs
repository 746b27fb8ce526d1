//! Parsing of JSON objects out of raw model completions.
//!
//! Models are instructed to reply with a bare JSON object and no preamble. The
//! parser accepts that, plus the common case of the object wrapped in a markdown
//! code fence. Prose around an unfenced object is treated as a parse failure.

use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a model completion could not be read as a JSON object.
#[derive(Debug, Error)]
pub enum OutputParseError {
    /// The completion was empty or whitespace only
    #[error("model returned an empty response")]
    Empty,

    /// The completion is not valid JSON
    #[error("model response is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// Valid JSON, but not an object
    #[error("model response is JSON but not an object")]
    NotAnObject,
}

/// Parses a model completion as a JSON object.
///
/// # Examples
///
/// ```
/// use posttag::output::parse_json_object;
///
/// let fenced = "```json\n{\"Career\": \"Career\"}\n```";
/// assert!(parse_json_object(fenced).is_ok());
/// assert!(parse_json_object("Sure! {\"Career\": \"Career\"}").is_err());
/// ```
///
/// # Errors
///
/// Returns `OutputParseError` when the response is empty, is not valid JSON, or
/// parses to something other than an object.
pub fn parse_json_object(response: &str) -> Result<Map<String, Value>, OutputParseError> {
    let trimmed = response.trim();
    let candidate = if trimmed.starts_with('{') {
        trimmed
    } else {
        fenced_body(trimmed).unwrap_or(trimmed).trim()
    };

    if candidate.is_empty() {
        return Err(OutputParseError::Empty);
    }

    match serde_json::from_str::<Value>(candidate).map_err(OutputParseError::Json)? {
        Value::Object(object) => Ok(object),
        _ => Err(OutputParseError::NotAnObject),
    }
}

/// Returns the body of the first markdown code fence, tolerating a missing closer.
fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after
        .strip_prefix("json")
        .or_else(|| after.strip_prefix("JSON"))
        .unwrap_or(after);
    let end = after.find("```").unwrap_or(after.len());
    Some(&after[..end])
}
