//! Expectation results recorded while a scenario runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::result::{FailureKind, ProbeError};

/// Outcome of one expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Predicate held
    Pass,
    /// Predicate was evaluated and did not hold
    Fail,
    /// Predicate never settled within its budget
    Timeout,
}

/// One evaluated expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationResult {
    /// What was checked
    pub description: String,
    /// Outcome
    pub outcome: Outcome,
    /// What the page showed
    pub observed: String,
    /// What was expected
    pub expected: String,
    /// Time spent waiting, in milliseconds
    pub elapsed_ms: u64,
    /// Failure category for non-passing results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ExpectationResult {
    /// A passing result
    #[must_use]
    pub fn pass(
        description: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            description: description.into(),
            outcome: Outcome::Pass,
            observed: observed.into(),
            expected: expected.into(),
            elapsed_ms: elapsed.as_millis() as u64,
            failure: None,
        }
    }

    /// The terminal failing result for an aborted scenario
    #[must_use]
    pub fn from_error(description: impl Into<String>, error: &ProbeError, elapsed: Duration) -> Self {
        let kind = error.kind();
        let outcome = if kind == FailureKind::Timeout {
            Outcome::Timeout
        } else {
            Outcome::Fail
        };
        let (expected, observed) = match error {
            ProbeError::AssertionFailed { expected, observed } => {
                (expected.clone(), observed.clone())
            }
            ProbeError::ElementNotFound {
                locator,
                last_observed,
                ..
            } => (format!("{locator} present"), last_observed.clone()),
            ProbeError::Timeout {
                waiting_for,
                last_observed,
                ..
            } => (waiting_for.clone(), last_observed.clone()),
            other => (String::new(), other.to_string()),
        };
        Self {
            description: description.into(),
            outcome,
            observed,
            expected,
            elapsed_ms: elapsed.as_millis() as u64,
            failure: Some(kind),
        }
    }

    /// Whether the expectation passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass() {
        let result = ExpectationResult::pass(
            "identifier input visible",
            "visible",
            "1 element",
            Duration::from_millis(120),
        );
        assert!(result.passed());
        assert_eq!(result.elapsed_ms, 120);
        assert!(result.failure.is_none());
    }

    #[test]
    fn test_from_assertion() {
        let err = ProbeError::assertion("url contains \"applynow\"", "https://x/dashboard");
        let result = ExpectationResult::from_error("stays on entry", &err, Duration::ZERO);
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.failure, Some(FailureKind::AssertionFailed));
        assert_eq!(result.observed, "https://x/dashboard");
    }

    #[test]
    fn test_from_timeout_and_not_found() {
        let err = ProbeError::timeout("dashboard welcome visible", 10_000, "none visible");
        let result = ExpectationResult::from_error("welcome", &err, Duration::from_secs(10));
        assert_eq!(result.outcome, Outcome::Timeout);
        assert_eq!(result.expected, "dashboard welcome visible");

        let err = ProbeError::element_not_found("sign_in.secret_input", 5_000, "no match");
        let result = ExpectationResult::from_error("secret", &err, Duration::from_secs(5));
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.failure, Some(FailureKind::ElementNotFound));
        assert_eq!(result.expected, "sign_in.secret_input present");
    }
}
