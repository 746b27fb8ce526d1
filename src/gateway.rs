/// Hosted model gateway module.
///
/// This module provides the `ModelGateway` abstraction over a hosted text-completion
/// service and a blocking client for OpenAI-compatible endpoints such as Groq.
mod client;

pub use client::{GatewayError, GroqClient, GroqClientBuilder, ModelGateway};
