use super::http::{build_client, post_json};
use super::ChatModel;
use crate::config::{BackendConfig, Provider};
use crate::llm::ModelOutput;
use crate::prompt::PromptContext;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult, ToolCall, ToolDescriptor};
use std::sync::Arc;
use tracing::debug;

/// Native Ollama chat backend (`/api/chat`, non-streaming). No API key.
#[derive(Clone)]
pub struct OllamaBackend {
    config: BackendConfig,
    http: reqwest::Client,
    tools: Vec<ToolDescriptor>,
}

impl OllamaBackend {
    /// Builds the HTTP client for a local or remote Ollama server.
    pub fn new(config: BackendConfig) -> ParleyResult<Self> {
        let http = build_client(&config)?;
        Ok(Self {
            config,
            http,
            tools: Vec::new(),
        })
    }

    fn build_body(&self, context: &PromptContext) -> serde_json::Value {
        let mut messages = Vec::with_capacity(context.messages.len() + 1);
        if let Some(sys) = &context.system {
            messages.push(serde_json::json!({"role": "system", "content": sys}));
        }
        for m in &context.messages {
            messages.push(serde_json::json!({"role": m.role.as_str(), "content": m.content}));
        }

        let mut body = serde_json::json!({
            "model": self.config.model_name(),
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens,
            },
        });

        if !self.tools.is_empty() {
            body["tools"] = self
                .tools
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
                .collect();
        }
        body
    }
}

#[async_trait]
impl ChatModel for OllamaBackend {
    async fn invoke(&self, context: &PromptContext) -> ParleyResult<ModelOutput> {
        let url = format!("{}/api/chat", self.config.base_url());
        debug!(url = %url, model = self.config.model_name(), "Calling Ollama");
        let request = self.http.post(&url);
        let resp_body = post_json(request, &self.build_body(context), "Ollama").await?;
        parse_ollama_response(&resp_body)
    }

    fn provider(&self) -> Provider {
        Provider::Ollama
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

/// Parses an `/api/chat` response. Ollama does not assign tool call ids, so
/// they are numbered `call_0`, `call_1`, ...
pub fn parse_ollama_response(body: &serde_json::Value) -> ParleyResult<ModelOutput> {
    if let Some(err) = body["error"].as_str() {
        return Err(ParleyError::ModelInvocationFailed(format!("Ollama error: {err}")));
    }

    let message = body.get("message").ok_or_else(|| {
        ParleyError::ModelInvocationFailed("Missing message in Ollama response".into())
    })?;
    let content = message["content"].as_str().unwrap_or_default().to_string();

    let calls: Vec<ToolCall> = message["tool_calls"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .enumerate()
                .filter_map(|(i, tc)| {
                    let name = tc["function"]["name"].as_str()?.to_string();
                    let id = tc["id"]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{i}"));
                    Some(ToolCall {
                        id,
                        name,
                        arguments: tc["function"]["arguments"].clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if calls.is_empty() {
        Ok(ModelOutput::Text(content))
    } else {
        Ok(ModelOutput::ToolCalls {
            content: Some(content).filter(|c| !c.is_empty()),
            calls,
        })
    }
}
