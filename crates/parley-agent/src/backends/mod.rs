#[cfg(feature = "anthropic")]
pub mod anthropic;
/// Deterministic echo backend.
pub mod fake;
#[cfg(any(feature = "openai", feature = "anthropic", feature = "ollama"))]
pub(crate) mod http;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

use crate::config::Provider;
use crate::llm::ModelOutput;
use crate::prompt::PromptContext;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult, ToolDescriptor};
use std::sync::Arc;

/// A language model as seen by the pipeline: rendered context in, output out.
///
/// Each provider implements this trait in its own module. The set of
/// implementations is closed; [`crate::llm::create_model`] picks one with a
/// `match` over [`Provider`].
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends one rendered prompt to the model. No retries.
    async fn invoke(&self, context: &PromptContext) -> ParleyResult<ModelOutput>;

    /// Which provider this model talks to.
    fn provider(&self) -> Provider;

    /// Returns a copy of this model that advertises `tools` on every call.
    ///
    /// Models without tool support keep the default, which fails.
    fn bind_tools(&self, _tools: &[ToolDescriptor]) -> ParleyResult<Arc<dyn ChatModel>> {
        Err(ParleyError::ModelInvocationFailed(format!(
            "provider '{}' does not support tool binding",
            self.provider()
        )))
    }

    /// Tools currently advertised by this model.
    fn bound_tools(&self) -> &[ToolDescriptor] {
        &[]
    }
}
