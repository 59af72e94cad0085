use super::http::{build_client, post_json};
use super::ChatModel;
use crate::config::{BackendConfig, Provider};
use crate::llm::ModelOutput;
use crate::prompt::PromptContext;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult, ToolCall, ToolDescriptor};
use std::sync::Arc;
use tracing::debug;

/// OpenAI chat completions backend.
///
/// Also works against any server exposing `/v1/chat/completions` when
/// `OPENAI_BASE_URL` points at it.
#[derive(Clone)]
pub struct OpenAiBackend {
    config: BackendConfig,
    api_key: String,
    http: reqwest::Client,
    tools: Vec<ToolDescriptor>,
}

impl OpenAiBackend {
    /// Fails with [`ParleyError::ProviderUnavailable`] when no API key is configured.
    pub fn new(config: BackendConfig) -> ParleyResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ParleyError::provider_unavailable("openai", "OPENAI_API_KEY is not set"))?;
        let http = build_client(&config)?;
        Ok(Self {
            config,
            api_key,
            http,
            tools: Vec::new(),
        })
    }

    fn build_messages(&self, context: &PromptContext) -> Vec<serde_json::Value> {
        let mut api_messages = Vec::with_capacity(context.messages.len() + 1);

        if let Some(sys) = &context.system {
            api_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }

        for m in &context.messages {
            api_messages.push(serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content
            }));
        }

        api_messages
    }

    fn build_tools(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema,
                    }
                })
            })
            .collect()
    }
}

#[async_trait]
impl ChatModel for OpenAiBackend {
    async fn invoke(&self, context: &PromptContext) -> ParleyResult<ModelOutput> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let mut body = serde_json::json!({
            "model": self.config.model_name(),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": self.build_messages(context),
        });

        if !self.tools.is_empty() {
            body["tools"] = serde_json::json!(self.build_tools());
        }

        debug!(url = %url, model = self.config.model_name(), "Calling OpenAI");
        let request = self.http.post(&url).bearer_auth(&self.api_key);
        let resp_body = post_json(request, &body, "OpenAI").await?;

        parse_openai_response(&resp_body)
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn bind_tools(&self, tools: &[ToolDescriptor]) -> ParleyResult<Arc<dyn ChatModel>> {
        let mut bound = self.clone();
        bound.tools = tools.to_vec();
        Ok(Arc::new(bound))
    }

    fn bound_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }
}

/// Parses a chat completions response body.
///
/// `content` may be a string or, on some compatible servers, an array of
/// `{type: "text", text}` parts.
pub fn parse_openai_response(body: &serde_json::Value) -> ParleyResult<ModelOutput> {
    let message = body["choices"]
        .get(0)
        .map(|choice| &choice["message"])
        .ok_or_else(|| {
            ParleyError::ModelInvocationFailed("Missing choices in OpenAI response".into())
        })?;

    let content = match &message["content"] {
        serde_json::Value::String(s) => Some(ModelOutput::Text(s.clone())),
        serde_json::Value::Array(parts) => Some(ModelOutput::Parts(
            parts
                .iter()
                .filter_map(|p| p["text"].as_str().map(str::to_string))
                .collect(),
        )),
        _ => None,
    };

    if let Some(tool_calls_json) = message["tool_calls"].as_array() {
        let calls: Vec<ToolCall> = tool_calls_json
            .iter()
            .filter_map(|tc| {
                let id = tc["id"].as_str()?.to_string();
                let name = tc["function"]["name"].as_str()?.to_string();
                let arguments: serde_json::Value =
                    serde_json::from_str(tc["function"]["arguments"].as_str()?).unwrap_or_default();
                Some(ToolCall {
                    id,
                    name,
                    arguments,
                })
            })
            .collect();

        if !calls.is_empty() {
            return Ok(ModelOutput::ToolCalls {
                content: content.map(ModelOutput::into_text).filter(|c| !c.is_empty()),
                calls,
            });
        }
    }

    Ok(content.unwrap_or_else(|| ModelOutput::Text(String::new())))
}
