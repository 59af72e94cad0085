use crate::backends::fake::FakeBackend;
use crate::backends::ChatModel;
use crate::config::{BackendConfig, Provider};
use parley_core::{ParleyResult, ToolCall};
use std::sync::Arc;
use tracing::info;

/// Raw output of a model call, before normalization to plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// A single text reply.
    Text(String),
    /// Several text blocks from one response.
    Parts(Vec<String>),
    /// The model asked for tool calls, possibly with accompanying text.
    ToolCalls {
        /// Text sent alongside the calls, if any.
        content: Option<String>,
        /// Requested calls, in the order the model listed them.
        calls: Vec<ToolCall>,
    },
}

impl ModelOutput {
    /// Flattens the output to text, ignoring tool calls.
    pub fn into_text(self) -> String {
        match self {
            ModelOutput::Text(t) => t,
            ModelOutput::Parts(parts) => parts.join("\n"),
            ModelOutput::ToolCalls { content, .. } => content.unwrap_or_default(),
        }
    }
}

/// Creates the model for `config.provider`.
///
/// The dispatch is a closed `match`. Network providers that were compiled
/// out, or whose credentials are missing, fail with
/// [`parley_core::ParleyError::ProviderUnavailable`].
pub fn create_model(config: &BackendConfig) -> ParleyResult<Arc<dyn ChatModel>> {
    config.validate()?;
    let model: Arc<dyn ChatModel> = match config.provider {
        Provider::Fake => Arc::new(FakeBackend::new()),
        Provider::OpenAi => openai_model(config)?,
        Provider::Anthropic => anthropic_model(config)?,
        Provider::Ollama => ollama_model(config)?,
    };
    info!(
        provider = %config.provider,
        model = config.model_name(),
        "Created chat model"
    );
    Ok(model)
}

#[cfg(feature = "openai")]
fn openai_model(config: &BackendConfig) -> ParleyResult<Arc<dyn ChatModel>> {
    Ok(Arc::new(crate::backends::openai::OpenAiBackend::new(
        config.clone(),
    )?))
}

#[cfg(not(feature = "openai"))]
fn openai_model(_config: &BackendConfig) -> ParleyResult<Arc<dyn ChatModel>> {
    Err(parley_core::ParleyError::provider_unavailable(
        "openai",
        "built without the `openai` feature",
    ))
}

#[cfg(feature = "anthropic")]
fn anthropic_model(config: &BackendConfig) -> ParleyResult<Arc<dyn ChatModel>> {
    Ok(Arc::new(crate::backends::anthropic::AnthropicBackend::new(
        config.clone(),
    )?))
}

#[cfg(not(feature = "anthropic"))]
fn anthropic_model(_config: &BackendConfig) -> ParleyResult<Arc<dyn ChatModel>> {
    Err(parley_core::ParleyError::provider_unavailable(
        "anthropic",
        "built without the `anthropic` feature",
    ))
}

#[cfg(feature = "ollama")]
fn ollama_model(config: &BackendConfig) -> ParleyResult<Arc<dyn ChatModel>> {
    Ok(Arc::new(crate::backends::ollama::OllamaBackend::new(
        config.clone(),
    )?))
}

#[cfg(not(feature = "ollama"))]
fn ollama_model(_config: &BackendConfig) -> ParleyResult<Arc<dyn ChatModel>> {
    Err(parley_core::ParleyError::provider_unavailable(
        "ollama",
        "built without the `ollama` feature",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use parley_core::ParleyError;

    #[test]
    fn test_fake_needs_no_credentials() {
        let model = create_model(&BackendConfig::fake()).unwrap();
        assert_eq!(model.provider(), Provider::Fake);
    }

    #[test]
    fn test_network_provider_without_key_is_unavailable() {
        for provider in [Provider::OpenAi, Provider::Anthropic] {
            let err = create_model(&BackendConfig::new(provider)).err().unwrap();
            assert!(
                matches!(err, ParleyError::ProviderUnavailable { .. }),
                "{provider}: {err}"
            );
        }
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_ollama_needs_no_key() {
        let model = create_model(&BackendConfig::new(Provider::Ollama)).unwrap();
        assert_eq!(model.provider(), Provider::Ollama);
    }

    #[test]
    fn test_invalid_temperature_is_rejected_before_dispatch() {
        let config = BackendConfig::fake().with_temperature(-0.5);
        let err = create_model(&config).err().unwrap();
        assert!(matches!(err, ParleyError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_into_text() {
        assert_eq!(
            ModelOutput::Parts(vec!["a".into(), "b".into()]).into_text(),
            "a\nb"
        );
        let calls = ModelOutput::ToolCalls {
            content: None,
            calls: vec![],
        };
        assert_eq!(calls.into_text(), "");
    }
}
