//! Result and error types for Portero.
//!
//! The taxonomy separates scenario-local failures (markup drift, asynchronous
//! state that never settles, behavioral regressions) from infrastructure
//! failures that make every later scenario meaningless.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for Portero operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving or verifying a page
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Locator never resolved to any element within the wait budget
    #[error("Element '{locator}' not found after {timeout_ms}ms (last observed: {last_observed})")]
    ElementNotFound {
        /// Semantic locator name
        locator: String,
        /// Wait budget in milliseconds
        timeout_ms: u64,
        /// Summary of the last observed page state
        last_observed: String,
    },

    /// Predicate was never satisfied within the wait budget
    #[error("Timed out after {timeout_ms}ms waiting for {waiting_for} (last observed: {last_observed})")]
    Timeout {
        /// Description of the awaited condition
        waiting_for: String,
        /// Wait budget in milliseconds
        timeout_ms: u64,
        /// Summary of the last observed page state
        last_observed: String,
    },

    /// Predicate evaluated and mismatched the expectation
    #[error("Assertion failed: expected {expected}, observed {observed}")]
    AssertionFailed {
        /// What the verification expected
        expected: String,
        /// What the page actually showed
        observed: String,
    },

    /// The automation primitive itself failed
    #[error("Driver error: {message}")]
    DriverError {
        /// Error message
        message: String,
    },

    /// Fixture data missing or malformed
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create an element-not-found error
    #[must_use]
    pub fn element_not_found(
        locator: impl Into<String>,
        timeout_ms: u64,
        last_observed: impl Into<String>,
    ) -> Self {
        Self::ElementNotFound {
            locator: locator.into(),
            timeout_ms,
            last_observed: last_observed.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(
        waiting_for: impl Into<String>,
        timeout_ms: u64,
        last_observed: impl Into<String>,
    ) -> Self {
        Self::Timeout {
            waiting_for: waiting_for.into(),
            timeout_ms,
            last_observed: last_observed.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(expected: impl Into<String>, observed: impl Into<String>) -> Self {
        Self::AssertionFailed {
            expected: expected.into(),
            observed: observed.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::DriverError {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify the error for reporting
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::ElementNotFound { .. } => FailureKind::ElementNotFound,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::AssertionFailed { .. } => FailureKind::AssertionFailed,
            Self::DriverError { .. } => FailureKind::DriverError,
            Self::Fixture { .. }
            | Self::Config { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => FailureKind::Setup,
        }
    }

    /// Whether this error must stop the whole run rather than one scenario
    #[must_use]
    pub const fn aborts_run(&self) -> bool {
        self.kind().aborts_run()
    }
}

/// Failure category shown in summaries and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Locator never resolved
    ElementNotFound,
    /// Predicate never satisfied, or the scenario ran out of time
    Timeout,
    /// Behavioral mismatch
    AssertionFailed,
    /// Automation primitive failure
    DriverError,
    /// Scenario could not be prepared (credentials, configuration)
    Setup,
}

impl FailureKind {
    /// Stable label used in summaries
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ElementNotFound => "ElementNotFound",
            Self::Timeout => "Timeout",
            Self::AssertionFailed => "AssertionFailed",
            Self::DriverError => "DriverError",
            Self::Setup => "Setup",
        }
    }

    /// Failures of this kind stop the whole run
    #[must_use]
    pub const fn aborts_run(self) -> bool {
        matches!(self, Self::DriverError)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
