use parley_core::{ParleyError, ParleyResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Language-model providers parley can talk to.
///
/// The set is closed: adding a provider means adding a variant here and a
/// match arm in [`crate::llm::create_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI Chat Completions API.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic Messages API. Also accepted as `claude`.
    #[serde(alias = "claude")]
    Anthropic,
    /// Locally hosted Ollama server.
    Ollama,
    /// Deterministic echo backend with no network access.
    Fake,
}

impl Provider {
    /// Every provider, in display order.
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Ollama,
        Provider::Fake,
    ];

    /// Canonical lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
            Provider::Fake => "fake",
        }
    }

    /// Parses a provider identifier.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace; `claude`
    /// resolves to [`Provider::Anthropic`] and a blank value to [`Provider::Fake`].
    /// Anything else is [`ParleyError::InvalidConfiguration`].
    pub fn parse(raw: &str) -> ParleyResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "fake" => Ok(Provider::Fake),
            "openai" => Ok(Provider::OpenAi),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "ollama" => Ok(Provider::Ollama),
            _ => {
                let valid: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                Err(ParleyError::InvalidConfiguration(format!(
                    "Invalid provider '{raw}'. Valid options: {}",
                    valid.join(", ")
                )))
            }
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-sonnet-latest",
            Provider::Ollama => "llama3.1:8b",
            Provider::Fake => "echo",
        }
    }

    /// API root used when none is configured.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com",
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::Ollama => "http://localhost:11434",
            Provider::Fake => "local://fake",
        }
    }

    /// Whether the provider refuses to run without an API key.
    pub fn requires_api_key(self) -> bool {
        matches!(self, Provider::OpenAi | Provider::Anthropic)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::parse(s)
    }
}

/// Backend configuration, resolved once and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Which backend to build.
    pub provider: Provider,
    /// Sampling temperature, never negative.
    #[serde(default)]
    pub temperature: f32,
    /// Overrides [`Provider::default_model`].
    #[serde(default)]
    pub model: Option<String>,
    /// Overrides [`Provider::default_base_url`].
    #[serde(default)]
    pub base_url: Option<String>,
    /// Required by the OpenAI and Anthropic backends. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Reply length limit sent to the provider.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// HTTP request timeout for network backends.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Bind the static tool catalog to the model when the pipeline is built.
    #[serde(default)]
    pub enable_tools: bool,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl BackendConfig {
    /// Provider defaults with temperature 0 and tools disabled.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            temperature: 0.0,
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            enable_tools: false,
        }
    }

    /// Configuration for the network-free echo backend.
    pub fn fake() -> Self {
        Self::new(Provider::Fake)
    }

    /// Sets the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Enables or disables tool binding.
    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.enable_tools = enabled;
        self
    }

    /// Configured model, or the provider default.
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Checks value ranges. Called by the factory and the orchestrator.
    pub fn validate(&self) -> ParleyResult<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ParleyError::InvalidConfiguration(format!(
                "temperature must be a finite number >= 0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ParleyError::InvalidConfiguration(
                "max_tokens must be greater than 0".into(),
            ));
        }
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ParleyError::InvalidConfiguration(
                    "model override must not be blank".into(),
                ));
            }
        }
        Ok(())
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> ParleyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a key lookup function.
    ///
    /// Recognized keys: `PARLEY_PROVIDER`, `PARLEY_TEMPERATURE`,
    /// `PARLEY_ENABLE_TOOLS`, `PARLEY_MAX_TOKENS`, `PARLEY_REQUEST_TIMEOUT_SECS`,
    /// and per provider `OPENAI_MODEL` / `OPENAI_BASE_URL` / `OPENAI_API_KEY`,
    /// `ANTHROPIC_MODEL` (or `CLAUDE_MODEL`) / `ANTHROPIC_BASE_URL` /
    /// `ANTHROPIC_API_KEY` (or `CLAUDE_API_KEY`), `OLLAMA_MODEL` / `OLLAMA_BASE_URL`.
    pub fn from_lookup<F>(lookup: F) -> ParleyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = Provider::parse(&get("PARLEY_PROVIDER").unwrap_or_default())?;
        let mut config = Self::new(provider);

        if let Some(raw) = get("PARLEY_TEMPERATURE") {
            config.temperature = raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Invalid PARLEY_TEMPERATURE, using 0");
                0.0
            });
        }
        if let Some(raw) = get("PARLEY_MAX_TOKENS") {
            match raw.trim().parse() {
                Ok(n) => config.max_tokens = n,
                Err(_) => warn!(value = %raw, "Invalid PARLEY_MAX_TOKENS, using default"),
            }
        }
        if let Some(raw) = get("PARLEY_REQUEST_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(n) => config.request_timeout_secs = n,
                Err(_) => warn!(value = %raw, "Invalid PARLEY_REQUEST_TIMEOUT_SECS, using default"),
            }
        }
        config.enable_tools = get("PARLEY_ENABLE_TOOLS")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        match provider {
            Provider::OpenAi => {
                config.model = get("OPENAI_MODEL");
                config.base_url = get("OPENAI_BASE_URL");
                config.api_key = get("OPENAI_API_KEY");
            }
            Provider::Anthropic => {
                config.model = get("ANTHROPIC_MODEL").or_else(|| get("CLAUDE_MODEL"));
                config.base_url = get("ANTHROPIC_BASE_URL");
                config.api_key = get("ANTHROPIC_API_KEY").or_else(|| get("CLAUDE_API_KEY"));
            }
            Provider::Ollama => {
                config.model = get("OLLAMA_MODEL");
                config.base_url = get("OLLAMA_BASE_URL");
            }
            Provider::Fake => {}
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
