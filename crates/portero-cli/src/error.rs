//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Some scenarios did not pass
    #[error("{failed} of {total} scenario(s) failed")]
    ScenariosFailed {
        /// Scenarios that did not pass
        failed: usize,
        /// Scenarios run
        total: usize,
    },

    /// A driver failure stopped the run early
    #[error("Run aborted: {message}")]
    RunAborted {
        /// Cause reported by the runner
        message: String,
    },

    /// Library error
    #[error(transparent)]
    Probe(#[from] portero::ProbeError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML rendering error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Process exit code: 1 when scenarios failed, 2 for everything else
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ScenariosFailed { .. } => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_scenarios_failed() {
        let err = CliError::ScenariosFailed {
            failed: 2,
            total: 12,
        };
        assert_eq!(err.to_string(), "2 of 12 scenario(s) failed");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_run_aborted() {
        let err = CliError::RunAborted {
            message: "Driver error: browser closed".to_string(),
        };
        assert_eq!(err.to_string(), "Run aborted: Driver error: browser closed");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_probe_error_is_transparent() {
        let err: CliError = portero::ProbeError::driver("chromium exited").into();
        assert_eq!(err.to_string(), "Driver error: chromium exited");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
