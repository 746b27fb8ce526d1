pub mod corpus;
pub mod extractor;
pub mod gateway;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod unifier;

pub use extractor::{StructuredExtractor, StructuredExtractorBuilder};
pub use gateway::{GatewayError, GroqClient, GroqClientBuilder, ModelGateway};
pub use models::{Language, MetadataRecord, Post, TagMapping};
pub use pipeline::{CorpusPipeline, CorpusPipelineBuilder, EnrichmentSummary, MissingTagPolicy, PipelineError};
pub use unifier::{TagUnifier, TagUnifierBuilder, UnifyError};
