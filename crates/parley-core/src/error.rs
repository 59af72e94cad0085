use thiserror::Error;

/// A convenience `Result` alias using [`ParleyError`].
pub type ParleyResult<T> = Result<T, ParleyError>;

/// Top-level error type for the chat pipeline.
///
/// The first five variants form the caller-facing taxonomy. The transport
/// variants (`Http`, `Json`, `Io`) are produced inside backends and are
/// reclassified by the orchestrator before they reach a caller.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Malformed caller input. Raised before any side effect.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unrecognized or out-of-range backend configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The provider integration is not compiled in, or its credentials are missing.
    #[error("Provider '{provider}' not available: {reason}")]
    ProviderUnavailable {
        /// Provider identifier, e.g. `openai`.
        provider: String,
        /// What is missing.
        reason: String,
    },

    /// Internal wiring mismatch, e.g. a prompt variable that was never supplied.
    #[error("Invalid agent configuration: {0}")]
    AgentMisconfigured(String),

    /// The backend call failed or returned unusable output.
    #[error("Model invocation failed: {0}")]
    ModelInvocationFailed(String),

    /// An outbound HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParleyError {
    /// Shorthand for [`ParleyError::ProviderUnavailable`].
    pub fn provider_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case label, used in logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::AgentMisconfigured(_) => "agent_misconfigured",
            Self::ModelInvocationFailed(_) => "model_invocation_failed",
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
        }
    }

    /// Whether the error was caused by the caller's request itself.
    ///
    /// Configuration problems belong to the host, not the caller, so
    /// [`ParleyError::InvalidConfiguration`] is not a client error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Rejects empty or whitespace-only strings with [`ParleyError::InvalidArgument`].
pub fn validate_non_empty<'a>(field: &str, value: &'a str) -> ParleyResult<&'a str> {
    if value.trim().is_empty() {
        return Err(ParleyError::InvalidArgument(format!(
            "{field} must be a non-empty string"
        )));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_unavailable_display() {
        let err = ParleyError::provider_unavailable("openai", "OPENAI_API_KEY is not set");
        assert_eq!(
            err.to_string(),
            "Provider 'openai' not available: OPENAI_API_KEY is not set"
        );
        assert_eq!(err.kind(), "provider_unavailable");
    }

    #[test]
    fn test_validate_non_empty() {
        assert_eq!(validate_non_empty("message", "hi").unwrap(), "hi");
        let err = validate_non_empty("session_id", "   ").unwrap_err();
        assert!(matches!(err, ParleyError::InvalidArgument(_)));
        assert!(err.to_string().contains("session_id"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ParleyError::InvalidArgument("x".into()).is_client_error());
        assert!(!ParleyError::InvalidConfiguration("x".into()).is_client_error());
        assert!(!ParleyError::ModelInvocationFailed("x".into()).is_client_error());
    }
}
