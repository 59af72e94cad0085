use parley_core::{ParleyError, ParleyResult};
use serde::{Deserialize, Serialize};

/// How scripts are materialized and launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Interpreter executable, looked up on `PATH` (default: "python3").
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Arguments placed before the script path.
    #[serde(default)]
    pub interpreter_args: Vec<String>,

    /// Extension of the written script file, including the dot (default: ".py").
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Deadline used by [`crate::Sandbox::run_default`] (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Bytes kept per captured stream (default: 64 KiB).
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_file_extension() -> String {
    ".py".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    64 * 1024
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            interpreter_args: Vec::new(),
            file_extension: default_file_extension(),
            default_timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl SandboxConfig {
    /// A config that runs scripts with `interpreter` and no extra arguments.
    pub fn with_interpreter(interpreter: impl Into<String>, file_extension: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            file_extension: file_extension.into(),
            ..Self::default()
        }
    }

    /// Rejects an empty interpreter, a zero output cap or a path-like extension.
    pub fn validate(&self) -> ParleyResult<()> {
        if self.interpreter.trim().is_empty() {
            return Err(ParleyError::InvalidConfiguration(
                "sandbox interpreter must not be empty".into(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(ParleyError::InvalidConfiguration(
                "sandbox max_output_bytes must be greater than 0".into(),
            ));
        }
        if self.file_extension.contains(['/', '\\']) {
            return Err(ParleyError::InvalidConfiguration(format!(
                "sandbox file_extension '{}' must not contain path separators",
                self.file_extension
            )));
        }
        Ok(())
    }
}
