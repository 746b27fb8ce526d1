/// Groq chat-completions client implementation.
///
/// This module provides `GroqClient` for making synchronous HTTP requests to an
/// OpenAI-compatible chat-completions API, along with error types and the builder
/// used to configure it from code or the environment.
use std::time::Duration;

use thiserror::Error;

/// Default model used when neither the builder nor `GROQ_MODEL` names one.
const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Default API root used when neither the builder nor `GROQ_BASE_URL` sets one.
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Errors that can occur when calling the hosted model.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network-related errors (connection failures, DNS resolution, timeouts, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Non-success HTTP status returned by the provider
    #[error("HTTP error: status {status}")]
    Http { status: u16, body: String },

    /// Well-formed HTTP response that does not carry a completion
    #[error("Model API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No credential supplied through the builder or `GROQ_API_KEY`
    #[error("Missing API key: set GROQ_API_KEY")]
    MissingApiKey,

    /// `GROQ_TIMEOUT_SECS` is set but is not a whole number of seconds
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Abstraction over a hosted text-completion service.
///
/// The extractor, unifier and pipeline take an `Arc<dyn ModelGateway>` so tests
/// can substitute a deterministic stub for the live endpoint.
pub trait ModelGateway: Send + Sync {
    /// Sends one rendered prompt and returns the raw completion text.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the call fails. Callers receive the error unmodified;
    /// no retry is attempted at this layer.
    fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Builder for constructing `GroqClient` instances.
///
/// # Examples
///
/// ```
/// use posttag::gateway::GroqClientBuilder;
///
/// let client = GroqClientBuilder::new()
///     .api_key("gsk_test")
///     .base_url("https://api.groq.com/openai/v1")
///     .build()
///     .expect("Failed to create client");
/// ```
#[derive(Debug, Default)]
pub struct GroqClientBuilder {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GroqClientBuilder {
    /// Creates a new `GroqClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key used as the bearer credential.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model name sent with every completion request.
    ///
    /// # Arguments
    ///
    /// * `model` - The model name (e.g., "meta-llama/llama-4-scout-17b-16e-instruct")
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API root; `/chat/completions` is appended per request.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets a whole-request timeout. Without one, a hung call blocks indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `GroqClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// Each setting not given to the builder is read from the environment:
    /// `GROQ_API_KEY` (required), `GROQ_MODEL`, `GROQ_BASE_URL` and
    /// `GROQ_TIMEOUT_SECS`. Model and base URL fall back to the Groq defaults.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::MissingApiKey` when no key is available,
    /// `GatewayError::InvalidUrl` for an unparseable base URL and
    /// `GatewayError::InvalidTimeout` for a malformed `GROQ_TIMEOUT_SECS`.
    pub fn build(self) -> Result<GroqClient, GatewayError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or(GatewayError::MissingApiKey)?;

        let model = self
            .model
            .or_else(|| std::env::var("GROQ_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = self
            .base_url
            .or_else(|| std::env::var("GROQ_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Validate URL
        reqwest::Url::parse(&base_url)
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let timeout = match self.timeout {
            Some(timeout) => Some(timeout),
            None => timeout_from_env()?,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Network)?;

        Ok(GroqClient {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Reads `GROQ_TIMEOUT_SECS`, if set.
fn timeout_from_env() -> Result<Option<Duration>, GatewayError> {
    match std::env::var("GROQ_TIMEOUT_SECS") {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| GatewayError::InvalidTimeout(format!("{}: {}", raw, e))),
        Err(_) => Ok(None),
    }
}

/// Synchronous client for an OpenAI-compatible chat-completions endpoint.
///
/// Each call is a single blocking request with no retry. Construct it with
/// `GroqClientBuilder`.
pub struct GroqClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GroqClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn complete_internal(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .map_err(GatewayError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response.json().map_err(GatewayError::Network)?;
        completion_content(&json)
    }
}

impl ModelGateway for GroqClient {
    fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        self.complete_internal(prompt)
    }
}

/// Pulls `choices[0].message.content` out of a chat-completions response body.
fn completion_content(json: &serde_json::Value) -> Result<String, GatewayError> {
    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Err(GatewayError::Api {
            message: message.to_string(),
        });
    }

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| GatewayError::Api {
            message: "Missing 'choices[0].message.content' in API response".to_string(),
        })
}
