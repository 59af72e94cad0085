use crate::backends::ChatModel;
use crate::config::BackendConfig;
use crate::llm::{create_model, ModelOutput};
use crate::prompt::{PromptTemplate, PromptVariables};
use crate::tools::builtin_tools;
use parley_core::{ParleyResult, ToolDescriptor};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns any [`ModelOutput`] into a single plain string.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputNormalizer;

impl OutputNormalizer {
    /// Text passes through, parts are joined with newlines, and tool calls
    /// become their accompanying text or, when there is none, one JSON line
    /// per requested call.
    pub fn normalize(&self, output: ModelOutput) -> String {
        match output {
            ModelOutput::Text(text) => text,
            ModelOutput::Parts(parts) => parts.join("\n"),
            ModelOutput::ToolCalls { content, calls } => match content {
                Some(text) if !text.trim().is_empty() => text,
                _ => calls
                    .iter()
                    .map(|call| serde_json::to_string(call).unwrap_or_else(|_| call.name.clone()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
        }
    }
}

/// Template, model and normalizer composed into one invocable unit.
///
/// Holds no conversation state, so one instance is shared by all sessions.
pub struct Pipeline {
    template: PromptTemplate,
    model: Arc<dyn ChatModel>,
    normalizer: OutputNormalizer,
}

impl Pipeline {
    /// Assembles a pipeline from an already built model.
    pub fn new(template: PromptTemplate, model: Arc<dyn ChatModel>) -> Self {
        Self {
            template,
            model,
            normalizer: OutputNormalizer,
        }
    }

    /// Model the pipeline invokes, possibly with tools bound.
    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    /// Template rendered on each invocation.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Renders the template, calls the model once and normalizes the output.
    pub async fn invoke(&self, vars: &PromptVariables) -> ParleyResult<String> {
        let context = self.template.render(vars)?;
        debug!(
            provider = %self.model.provider(),
            messages = context.messages.len(),
            "Invoking model"
        );
        let output = self.model.invoke(&context).await?;
        Ok(self.normalizer.normalize(output))
    }
}

/// Binds `tools` to `model`, returning the original model on failure.
///
/// The failure is logged at `warn` and never propagated.
pub fn try_bind_tools(model: Arc<dyn ChatModel>, tools: &[ToolDescriptor]) -> Arc<dyn ChatModel> {
    if tools.is_empty() {
        return model;
    }
    match model.bind_tools(tools) {
        Ok(bound) => {
            info!(provider = %model.provider(), tools = tools.len(), "Bound tools to model");
            bound
        }
        Err(e) => {
            warn!(
                provider = %model.provider(),
                error = %e,
                "Tool binding failed, continuing without tools"
            );
            model
        }
    }
}

/// Builds a [`Pipeline`] from a backend configuration.
pub struct PipelineBuilder {
    config: BackendConfig,
    template: PromptTemplate,
    tools_enabled: bool,
    model: Option<Arc<dyn ChatModel>>,
}

impl PipelineBuilder {
    /// Starts from a backend configuration and the default template.
    pub fn new(config: BackendConfig) -> Self {
        let tools_enabled = config.enable_tools;
        Self {
            config,
            template: PromptTemplate::default(),
            tools_enabled,
            model: None,
        }
    }

    /// Uses `template` instead of the default chat template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Overrides the tool-binding flag from the configuration.
    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    /// Uses a prebuilt model instead of calling [`create_model`].
    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Creates the model (unless one was supplied) and binds tools if enabled.
    pub fn build(self) -> ParleyResult<Pipeline> {
        let model = match self.model {
            Some(model) => model,
            None => create_model(&self.config)?,
        };
        let model = if self.tools_enabled {
            try_bind_tools(model, &builtin_tools())
        } else {
            model
        };
        Ok(Pipeline::new(self.template, model))
    }
}
