use super::ChatModel;
use crate::config::Provider;
use crate::llm::ModelOutput;
use crate::prompt::PromptContext;
use async_trait::async_trait;
use parley_core::ParleyResult;

/// Prefix of every reply produced by [`FakeBackend`].
pub const FAKE_PREFIX: &str = "[provider=fake][echo] ";

/// Deterministic echo model. Makes no network calls and needs no credentials.
///
/// The echoed text is the context's `input`, else the content of the last
/// message, else the JSON form of the whole context.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend;

impl FakeBackend {
    /// Creates the echo backend.
    pub fn new() -> Self {
        Self
    }

    fn extract_text(context: &PromptContext) -> String {
        if let Some(input) = &context.input {
            return input.clone();
        }
        if let Some(last) = context.messages.last() {
            return last.content.clone();
        }
        serde_json::to_string(context).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for FakeBackend {
    async fn invoke(&self, context: &PromptContext) -> ParleyResult<ModelOutput> {
        Ok(ModelOutput::Text(format!(
            "{FAKE_PREFIX}{}",
            Self::extract_text(context)
        )))
    }

    fn provider(&self) -> Provider {
        Provider::Fake
    }
}
