use crate::backends::ChatModel;
use crate::config::{BackendConfig, Provider};
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::prompt::{PromptTemplate, PromptVariables};
use parley_core::{validate_non_empty, ParleyError, ParleyResult, Role, Turn};
use parley_session::{InMemorySessionStore, SessionStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{error, info};
use uuid::Uuid;

/// Variables the orchestrator binds on every exchange.
const BOUND_VARIABLES: [&str; 2] = ["history", "input"];

/// Public entry point: routes a session-bound message through the pipeline.
///
/// One call runs `validating → history-loaded → invoking → response-validated
/// → history-updated → returned`. The user turn is recorded before the model
/// is called; the assistant turn only after a non-empty reply. Exchanges on
/// the same session are serialized, different sessions run in parallel.
pub struct Orchestrator {
    config: BackendConfig,
    sessions: Arc<dyn SessionStore>,
    template: PromptTemplate,
    model: Option<Arc<dyn ChatModel>>,
    pipeline: OnceCell<Arc<Pipeline>>,
}

impl Orchestrator {
    /// Validates `config`. No backend is created until the first chat.
    pub fn new(config: BackendConfig) -> ParleyResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: Arc::new(InMemorySessionStore::new()),
            template: PromptTemplate::default(),
            model: None,
            pipeline: OnceCell::new(),
        })
    }

    /// Resolves the configuration from environment variables.
    pub fn from_env() -> ParleyResult<Self> {
        Self::new(BackendConfig::from_env()?)
    }

    /// Shorthand for a provider identifier with default settings.
    pub fn for_provider(provider: &str) -> ParleyResult<Self> {
        Self::new(BackendConfig::new(Provider::parse(provider)?))
    }

    /// Uses a prebuilt model instead of the backend factory.
    pub fn with_model(model: Arc<dyn ChatModel>) -> Self {
        Self {
            config: BackendConfig::new(model.provider()),
            sessions: Arc::new(InMemorySessionStore::new()),
            template: PromptTemplate::default(),
            model: Some(model),
            pipeline: OnceCell::new(),
        }
    }

    /// Replaces the default in-memory session store.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = store;
        self
    }

    /// Replaces the system prompt of the default chat template.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.template = PromptTemplate::chat(prompt);
        self
    }

    /// Replaces the whole prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Overrides the tool-binding flag taken from the configuration.
    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.config.enable_tools = enabled;
        self
    }

    /// Validated backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Configured provider.
    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    async fn pipeline(&self) -> ParleyResult<Arc<Pipeline>> {
        self.pipeline
            .get_or_try_init(|| async {
                check_template_variables(&self.template)?;
                let mut builder =
                    PipelineBuilder::new(self.config.clone()).with_template(self.template.clone());
                if let Some(model) = &self.model {
                    builder = builder.with_model(model.clone());
                }
                let pipeline = builder.build()?;
                info!(provider = %self.config.provider, "Pipeline ready");
                Ok::<_, ParleyError>(Arc::new(pipeline))
            })
            .await
            .cloned()
    }

    /// Sends `message` on behalf of `session_id` and returns the assistant reply.
    pub async fn chat(&self, message: &str, session_id: &str) -> ParleyResult<String> {
        let message = validate_non_empty("message", message)?;
        let session_id = validate_non_empty("session_id", session_id)?;

        let exchange_id = Uuid::new_v4();
        let session = self.sessions.get_or_create(session_id).await?;
        let _exchange = session.begin_exchange().await;

        let history = session.turns();
        self.sessions
            .append_turn(session_id, Role::User, message)
            .await?;

        let started = Instant::now();
        let reply = match self.invoke(message, history).await {
            Ok(reply) => reply,
            Err(e) => {
                let err = classify_failure(e);
                error!(
                    session_id = %session_id,
                    exchange_id = %exchange_id,
                    provider = %self.config.provider,
                    kind = err.kind(),
                    error = %err,
                    "Chat invocation failed"
                );
                return Err(err);
            }
        };

        if reply.trim().is_empty() {
            error!(
                session_id = %session_id,
                exchange_id = %exchange_id,
                provider = %self.config.provider,
                "Model returned empty response"
            );
            return Err(ParleyError::ModelInvocationFailed(
                "Model returned empty response".into(),
            ));
        }

        self.sessions
            .append_turn(session_id, Role::Assistant, &reply)
            .await?;

        info!(
            session_id = %session_id,
            exchange_id = %exchange_id,
            provider = %self.config.provider,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat exchange completed"
        );
        Ok(reply)
    }

    async fn invoke(&self, message: &str, history: Vec<Turn>) -> ParleyResult<String> {
        let pipeline = self.pipeline().await?;
        let vars = PromptVariables::new()
            .turns("history", history)
            .text("input", message);
        pipeline.invoke(&vars).await
    }

    /// Ordered copy of a session's turns; empty for unknown sessions.
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions.history(session_id).await
    }

    /// Number of sessions created so far.
    pub async fn session_count(&self) -> usize {
        self.sessions.session_count().await
    }
}

/// Rejects templates that read variables the orchestrator never binds.
fn check_template_variables(template: &PromptTemplate) -> ParleyResult<()> {
    let unbound: Vec<String> = template
        .input_variables()?
        .into_iter()
        .filter(|name| !BOUND_VARIABLES.contains(&name.as_str()))
        .collect();
    if unbound.is_empty() {
        Ok(())
    } else {
        Err(ParleyError::AgentMisconfigured(format!(
            "prompt template reads unbound variables: {}",
            unbound.join(", ")
        )))
    }
}

/// Maps an invocation failure onto the caller-facing taxonomy.
///
/// Provider, wiring and model errors pass through. Transport errors and
/// anything else become [`ParleyError::ModelInvocationFailed`].
fn classify_failure(err: ParleyError) -> ParleyError {
    match err {
        e @ (ParleyError::ProviderUnavailable { .. }
        | ParleyError::AgentMisconfigured(_)
        | ParleyError::ModelInvocationFailed(_)
        | ParleyError::InvalidConfiguration(_)) => e,
        other => ParleyError::ModelInvocationFailed(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::prompt::PromptPart;

    #[test]
    fn test_classify_failure() {
        let http = classify_failure(ParleyError::Http("502 Bad Gateway".into()));
        assert!(matches!(http, ParleyError::ModelInvocationFailed(ref m) if m.contains("502")));

        let io = classify_failure(ParleyError::Io(std::io::Error::other("reset")));
        assert!(matches!(io, ParleyError::ModelInvocationFailed(_)));

        let unavailable = classify_failure(ParleyError::provider_unavailable("openai", "no key"));
        assert!(matches!(unavailable, ParleyError::ProviderUnavailable { .. }));

        let wiring = classify_failure(ParleyError::AgentMisconfigured("x".into()));
        assert!(matches!(wiring, ParleyError::AgentMisconfigured(_)));
    }

    #[test]
    fn test_check_template_variables() {
        assert!(check_template_variables(&PromptTemplate::default()).is_ok());

        let template = PromptTemplate::new(vec![
            PromptPart::History("history".into()),
            PromptPart::Human("{topic}: {input}".into()),
        ]);
        let err = check_template_variables(&template).unwrap_err();
        assert!(matches!(err, ParleyError::AgentMisconfigured(ref m) if m.contains("topic")));
    }

    #[tokio::test]
    async fn test_unbound_template_variable_fails_before_model_creation() {
        let orch = Orchestrator::new(BackendConfig::fake())
            .unwrap()
            .with_template(PromptTemplate::new(vec![PromptPart::Human(
                "{question}".into(),
            )]));
        let err = orch.chat("hi", "s1").await.unwrap_err();
        assert!(matches!(err, ParleyError::AgentMisconfigured(_)));
        assert!(orch.pipeline.get().is_none());
    }

    #[test]
    fn test_for_provider_rejects_unknown() {
        let err = Orchestrator::for_provider("palm").err().unwrap();
        assert!(matches!(err, ParleyError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn test_pipeline_is_built_once() {
        let orch = Orchestrator::new(BackendConfig::fake()).unwrap();
        let a = orch.pipeline().await.unwrap();
        let b = orch.pipeline().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_failed_build_is_not_cached() {
        let orch = Orchestrator::new(BackendConfig::new(Provider::OpenAi)).unwrap();
        assert!(orch.pipeline().await.is_err());
        assert!(orch.pipeline.get().is_none());
    }
}
