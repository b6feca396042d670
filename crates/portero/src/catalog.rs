//! Built-in sign-in suite.
//!
//! TC-001..TC-005 exercise the successful path and the dashboard it lands on;
//! TC-006..TC-012 exercise refusals. Message literals come from [`Messages`]
//! so deployments with different copy only need configuration.

use crate::auth_flow::AuthSessionState;
use crate::config::Messages;
use crate::fixture::tags;
use crate::scenario::{CredentialSource, Scenario, ScenarioKind, Step};

/// Identifiers that must never get past the first phase
pub const INJECTION_IDENTIFIERS: [&str; 4] = [
    "' OR '1'='1",
    "admin'--",
    "' OR '1'='1' --",
    "1' OR '1' = '1",
];

/// Identifier with a plus sign, refused by the entry surface's validation
pub const SPECIAL_CHARACTER_IDENTIFIER: &str = "test+special@example.com";

/// Identifier that is not shaped like an address at all
pub const MALFORMED_IDENTIFIER: &str = "invalid-email-format";

fn state(state: AuthSessionState) -> Step {
    Step::ExpectState { state }
}

fn message(text: &str) -> Option<String> {
    Some(text.to_string())
}

/// The full suite in catalog order
#[must_use]
pub fn sign_in_suite(messages: &Messages) -> Vec<Scenario> {
    let mut suite = positive_scenarios(messages);
    suite.extend(negative_scenarios(messages));
    suite
}

/// TC-001..TC-005
#[must_use]
pub fn positive_scenarios(messages: &Messages) -> Vec<Scenario> {
    vec![
        Scenario::new(
            "TC-001",
            "Sign in with fixture credentials",
            ScenarioKind::Positive,
        )
        .with_credential(CredentialSource::fixture(tags::VALID_USER))
        .step(Step::SignIn)
        .step(state(AuthSessionState::Authenticated))
        .step(Step::ExpectDashboard)
        .step(Step::ExpectDashboardWelcome)
        .step(Step::ExpectProfileVisible)
        .tag("smoke"),
        Scenario::new(
            "TC-002",
            "Sign in with environment credentials, one phase at a time",
            ScenarioKind::Positive,
        )
        .with_credential(CredentialSource::Environment)
        .step(Step::SubmitIdentifier { value: None })
        .step(state(AuthSessionState::AwaitingSecret))
        .step(Step::SubmitSecret { value: None })
        .step(state(AuthSessionState::Authenticated))
        .step(Step::ExpectDashboard)
        .step(Step::ExpectProfileVisible),
        Scenario::new(
            "TC-003",
            "Entry surface shows its elements",
            ScenarioKind::Positive,
        )
        .step(Step::WaitForPageLoad)
        .step(Step::ExpectEntryElements)
        .step(Step::ExpectWelcome)
        .step(Step::ExpectSubmitDisabled)
        .tag("smoke"),
        Scenario::new(
            "TC-004",
            "Dashboard navigation after sign-in",
            ScenarioKind::Positive,
        )
        .with_credential(CredentialSource::fixture(tags::VALID_USER))
        .step(Step::SignIn)
        .step(Step::ExpectDashboard)
        .step(Step::ExpectNavigationLinks)
        .step(Step::ExpectApplicationSummary),
        Scenario::new(
            "TC-005",
            "User information after sign-in",
            ScenarioKind::Positive,
        )
        .with_credential(CredentialSource::fixture(tags::VALID_USER))
        .step(Step::SignIn)
        .step(Step::ExpectDashboard)
        .step(Step::ExpectUserName {
            name: messages.user_name.clone(),
        })
        .step(Step::ExpectDashboardWelcome)
        .step(Step::ExpectScoreSection),
    ]
}

/// TC-006..TC-012
#[must_use]
pub fn negative_scenarios(messages: &Messages) -> Vec<Scenario> {
    vec![
        Scenario::new("TC-006", "Empty secret is refused", ScenarioKind::Negative)
            .with_credential(CredentialSource::Environment)
            .step(Step::SubmitIdentifier { value: None })
            .step(Step::SubmitSecret {
                value: Some(String::new()),
            })
            .step(Step::ExpectSecretError { message: None })
            .step(state(AuthSessionState::Rejected))
            .step(Step::ExpectNotAuthenticated),
        Scenario::new(
            "TC-007",
            "Clearing both fields shows both errors",
            ScenarioKind::Negative,
        )
        .with_credential(CredentialSource::Environment)
        .step(Step::SubmitIdentifier { value: None })
        .step(Step::ClearForm)
        .step(Step::ExpectIdentifierError {
            message: message(&messages.invalid_identifier),
        })
        .step(Step::ExpectSecretError { message: None })
        .step(state(AuthSessionState::AwaitingIdentifier))
        .step(Step::ExpectNotAuthenticated),
        Scenario::new(
            "TC-008",
            "Malformed identifier never advances",
            ScenarioKind::Negative,
        )
        .step(Step::SubmitIdentifier {
            value: message(MALFORMED_IDENTIFIER),
        })
        .step(Step::ExpectIdentifierError {
            message: message(&messages.invalid_identifier),
        })
        .step(state(AuthSessionState::AwaitingIdentifier))
        .step(Step::ExpectNotAuthenticated),
        Scenario::new("TC-009", "Wrong secret is refused", ScenarioKind::Negative)
            .with_credential(CredentialSource::fixture(tags::WRONG_PASSWORD))
            .step(Step::SignIn)
            .step(state(AuthSessionState::Rejected))
            .step(Step::ExpectErrorMessage {
                message: message(&messages.invalid_credentials),
            })
            .step(Step::ExpectInvalidCredentials)
            .step(Step::ExpectNotAuthenticated),
        Scenario::new("TC-010", "Unknown identifier is refused", ScenarioKind::Negative)
            .with_credential(CredentialSource::fixture(tags::NON_EXISTENT_USER))
            .step(Step::SubmitIdentifier { value: None })
            .step(Step::ExpectErrorMessage {
                message: message(&messages.unknown_identifier),
            })
            .step(state(AuthSessionState::AwaitingIdentifier))
            .step(Step::ExpectNotAuthenticated),
        Scenario::new(
            "TC-011",
            "Injection-style identifiers never authenticate",
            ScenarioKind::Negative,
        )
        .step(Step::RepeatIdentifiers {
            values: INJECTION_IDENTIFIERS.iter().map(ToString::to_string).collect(),
        })
        .step(state(AuthSessionState::AwaitingIdentifier))
        .tag("security"),
        Scenario::new(
            "TC-012",
            "Special characters in the identifier are refused",
            ScenarioKind::Negative,
        )
        .step(Step::SubmitIdentifier {
            value: message(SPECIAL_CHARACTER_IDENTIFIER),
        })
        .step(Step::ExpectIdentifierError { message: None })
        .step(Step::ExpectNotAuthenticated),
    ]
}

/// Scenarios matching a pattern, in their original order; `None` keeps all
#[must_use]
pub fn filter(scenarios: Vec<Scenario>, pattern: Option<&str>) -> Vec<Scenario> {
    match pattern {
        Some(pattern) if !pattern.is_empty() => scenarios
            .into_iter()
            .filter(|s| s.matches(pattern))
            .collect(),
        _ => scenarios,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scenario;

    #[test]
    fn test_catalog_shape() {
        let suite = sign_in_suite(&Messages::default());
        assert_eq!(suite.len(), 12);
        scenario::validate(&suite).unwrap();
        let ids: Vec<_> = suite.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids[0], "TC-001");
        assert_eq!(ids[11], "TC-012");
        assert!(suite[..5].iter().all(|s| s.kind == ScenarioKind::Positive));
        assert!(suite[5..].iter().all(|s| s.kind == ScenarioKind::Negative));
    }

    #[test]
    fn test_messages_flow_into_steps() {
        let messages = Messages {
            invalid_credentials: "Bad login".to_string(),
            user_name: Some("Ada".to_string()),
            ..Messages::default()
        };
        let suite = sign_in_suite(&messages);
        let tc009 = suite.iter().find(|s| s.id == "TC-009").unwrap();
        assert!(tc009.steps.contains(&Step::ExpectErrorMessage {
            message: Some("Bad login".to_string())
        }));
        let tc005 = suite.iter().find(|s| s.id == "TC-005").unwrap();
        assert!(tc005.steps.contains(&Step::ExpectUserName {
            name: Some("Ada".to_string())
        }));
    }

    #[test]
    fn test_filter() {
        let suite = sign_in_suite(&Messages::default());
        let smoke = filter(suite.clone(), Some("smoke"));
        assert_eq!(
            smoke.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            ["TC-001", "TC-003"]
        );
        assert_eq!(filter(suite.clone(), Some("TC-01")).len(), 3);
        assert_eq!(filter(suite.clone(), None).len(), 12);
        assert_eq!(filter(suite, Some("")).len(), 12);
    }
}
