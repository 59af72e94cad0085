use super::http::{build_client, post_json};
use super::ChatModel;
use crate::config::{BackendConfig, Provider};
use crate::llm::ModelOutput;
use crate::prompt::PromptContext;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult, ToolCall, ToolDescriptor};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API backend.
#[derive(Clone)]
pub struct AnthropicBackend {
    config: BackendConfig,
    api_key: String,
    http: reqwest::Client,
    tools: Vec<ToolDescriptor>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

impl AnthropicBackend {
    /// Fails with [`ParleyError::ProviderUnavailable`] when no API key is configured.
    pub fn new(config: BackendConfig) -> ParleyResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ParleyError::provider_unavailable("anthropic", "ANTHROPIC_API_KEY is not set")
            })?;
        let http = build_client(&config)?;
        Ok(Self {
            config,
            api_key,
            http,
            tools: Vec::new(),
        })
    }
}

#[async_trait]
impl ChatModel for AnthropicBackend {
    async fn invoke(&self, context: &PromptContext) -> ParleyResult<ModelOutput> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let api_messages: Vec<AnthropicMessage<'_>> = context
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model_name(),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": serde_json::to_value(&api_messages)?,
        });

        if let Some(sys) = &context.system {
            body["system"] = serde_json::json!(sys);
        }

        if !self.tools.is_empty() {
            let tools: Vec<AnthropicTool<'_>> = self
                .tools
                .iter()
                .map(|t| AnthropicTool {
                    name: &t.name,
                    description: &t.description,
                    input_schema: &t.parameters_schema,
                })
                .collect();
            body["tools"] = serde_json::to_value(&tools)?;
        }

        debug!(url = %url, model = self.config.model_name(), "Calling Anthropic");
        let request = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let resp_body = post_json(request, &body, "Anthropic").await?;

        parse_anthropic_response(&resp_body)
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
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

/// Parses a Messages API response. Multiple text blocks come back as
/// [`ModelOutput::Parts`].
pub fn parse_anthropic_response(body: &serde_json::Value) -> ParleyResult<ModelOutput> {
    let content = body["content"].as_array().ok_or_else(|| {
        ParleyError::ModelInvocationFailed("Missing content in Anthropic response".into())
    })?;

    let mut text_parts = Vec::new();
    let mut calls = Vec::new();

    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(t) = block["text"].as_str() {
                    text_parts.push(t.to_string());
                }
            }
            Some("tool_use") => {
                calls.push(ToolCall {
                    id: block["id"].as_str().unwrap_or_default().to_string(),
                    name: block["name"].as_str().unwrap_or_default().to_string(),
                    arguments: block["input"].clone(),
                });
            }
            _ => {}
        }
    }

    if !calls.is_empty() {
        return Ok(ModelOutput::ToolCalls {
            content: if text_parts.is_empty() {
                None
            } else {
                Some(text_parts.join("\n"))
            },
            calls,
        });
    }

    match text_parts.len() {
        0 => Ok(ModelOutput::Text(String::new())),
        1 => Ok(ModelOutput::Text(text_parts.remove(0))),
        _ => Ok(ModelOutput::Parts(text_parts)),
    }
}
