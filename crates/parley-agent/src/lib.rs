//! Conversation pipeline for parley.
//!
//! The crate is layered leaf-first:
//!
//! - [`config`]: provider selection and backend configuration.
//! - [`backends`]: the [`ChatModel`] trait and one implementation per provider.
//! - [`llm`]: the closed backend factory, [`create_model`].
//! - [`prompt`]: prompt template rendering.
//! - [`pipeline`]: template + model + output normalizer, built once and shared.
//! - [`tools`]: the static tool catalog a model can be bound to.
//! - [`orchestrator`]: the public entry point, [`Orchestrator::chat`].

/// Chat model trait and provider backends.
pub mod backends;
/// Provider selection and backend configuration.
pub mod config;
/// Model output and the backend factory.
pub mod llm;
/// Session-bound chat entry point.
pub mod orchestrator;
/// Render, invoke and normalize pipeline.
pub mod pipeline;
/// Prompt templates and rendered contexts.
pub mod prompt;
/// Static tool catalog.
pub mod tools;

pub use backends::ChatModel;
pub use config::{BackendConfig, Provider};
pub use llm::{create_model, ModelOutput};
pub use orchestrator::Orchestrator;
pub use pipeline::{try_bind_tools, OutputNormalizer, Pipeline, PipelineBuilder};
pub use prompt::{
    PromptContext, PromptMessage, PromptPart, PromptTemplate, PromptValue, PromptVariables,
    DEFAULT_SYSTEM_PROMPT,
};
pub use tools::builtin_tools;
