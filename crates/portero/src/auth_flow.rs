//! Two-Phase Auth Flow Driver
//!
//! Drives identifier → submit → (secret field appears) → secret → submit and
//! tracks the observable [`AuthSessionState`]. After every submit it polls for
//! the first of several outcomes instead of sleeping; the transition table
//! rejects anything the flow cannot legally do, so a scenario that reaches
//! `Authenticated` through an identifier rejection fails loudly.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use async_trait::async_trait;

use crate::config::Surfaces;
use crate::driver::BrowserDriver;
use crate::fixture::Credential;
use crate::locator::Locator;
use crate::pages::sign_in::{
    ERROR_MESSAGE, IDENTIFIER_ERROR, SECRET_ERROR, SECRET_INPUT, SUBMIT_BUTTON,
};
use crate::pages::SignInPage;
use crate::result::{ProbeError, ProbeResult};
use crate::session::{Budget, Session, SuiteContext};
use crate::wait::{Check, Condition, ElementProbe, Observation, Probe};

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Observable state of one sign-in attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSessionState {
    /// Entry surface shows the identifier field
    AwaitingIdentifier,
    /// Identifier accepted; secret field shown
    AwaitingSecret,
    /// Entry surface left after a correct secret
    Authenticated,
    /// Secret refused; entry surface retained
    Rejected,
}

impl AuthSessionState {
    /// Snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingIdentifier => "awaiting_identifier",
            Self::AwaitingSecret => "awaiting_secret",
            Self::Authenticated => "authenticated",
            Self::Rejected => "rejected",
        }
    }

    /// `Authenticated` or `Rejected`
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Authenticated | Self::Rejected)
    }
}

impl fmt::Display for AuthSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the flow observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEvent {
    /// Secret field appeared after an identifier submit
    IdentifierAccepted,
    /// Identifier error or message after an identifier submit, or no submit possible
    IdentifierRejected,
    /// Entry surface left after a secret submit
    SecretAccepted,
    /// Error after a secret submit
    SecretRejected,
    /// Entry fields were cleared
    FieldsCleared,
}

impl AuthEvent {
    /// Snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdentifierAccepted => "identifier_accepted",
            Self::IdentifierRejected => "identifier_rejected",
            Self::SecretAccepted => "secret_accepted",
            Self::SecretRejected => "secret_rejected",
            Self::FieldsCleared => "fields_cleared",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next state for an event, or `AssertionFailed` when the move is illegal
pub fn transition(from: AuthSessionState, event: AuthEvent) -> ProbeResult<AuthSessionState> {
    use AuthEvent as E;
    use AuthSessionState as S;

    match (from, event) {
        (S::AwaitingIdentifier, E::IdentifierAccepted) => Ok(S::AwaitingSecret),
        (S::AwaitingIdentifier, E::IdentifierRejected) => Ok(S::AwaitingIdentifier),
        (S::AwaitingSecret, E::SecretAccepted) => Ok(S::Authenticated),
        (S::AwaitingSecret, E::SecretRejected) => Ok(S::Rejected),
        (S::AwaitingIdentifier | S::AwaitingSecret | S::Rejected, E::FieldsCleared) => {
            Ok(S::AwaitingIdentifier)
        }
        (from, event) => Err(ProbeError::assertion(
            format!("a legal transition from {from}"),
            format!("{event}"),
        )),
    }
}

// =============================================================================
// SUBMIT OUTCOMES
// =============================================================================

/// Which submit the outcome probe is watching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    /// After submitting the identifier
    Identifier,
    /// After submitting the secret
    Secret,
}

/// First observable consequence of a submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The secret field is visible
    SecretFieldShown,
    /// Identifier refused, with the text shown
    IdentifierRejected(String),
    /// The entry surface was left, with the new URL
    SurfaceLeft(String),
    /// Secret refused, with the text shown
    SecretRejected(String),
}

impl SubmitOutcome {
    /// Event the outcome feeds the state machine
    #[must_use]
    pub const fn event(&self) -> AuthEvent {
        match self {
            Self::SecretFieldShown => AuthEvent::IdentifierAccepted,
            Self::IdentifierRejected(_) => AuthEvent::IdentifierRejected,
            Self::SurfaceLeft(_) => AuthEvent::SecretAccepted,
            Self::SecretRejected(_) => AuthEvent::SecretRejected,
        }
    }

    /// Human-readable summary
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::SecretFieldShown => "secret field shown".to_string(),
            Self::IdentifierRejected(text) => format!("identifier rejected: {text}"),
            Self::SurfaceLeft(url) => format!("navigated to {url}"),
            Self::SecretRejected(text) => format!("secret rejected: {text}"),
        }
    }
}

/// Polls for whichever submit outcome shows up first
#[derive(Debug, Clone)]
pub struct OutcomeProbe {
    phase: SubmitPhase,
    surfaces: Surfaces,
    secret_input: Locator,
    identifier_error: Locator,
    secret_error: Locator,
    error_message: Locator,
    unknown_identifier: String,
    invalid_credentials: String,
}

impl OutcomeProbe {
    /// Probe for a phase, using the context's locators and messages
    #[must_use]
    pub fn new(phase: SubmitPhase, context: &SuiteContext) -> Self {
        Self {
            phase,
            surfaces: context.surfaces.clone(),
            secret_input: context.locator(SECRET_INPUT),
            identifier_error: context.locator(IDENTIFIER_ERROR),
            secret_error: context.locator(SECRET_ERROR),
            error_message: context.locator(ERROR_MESSAGE),
            unknown_identifier: context.messages.unknown_identifier.clone(),
            invalid_credentials: context.messages.invalid_credentials.clone(),
        }
    }
}

async fn shown(
    driver: &mut dyn BrowserDriver,
    locator: &Locator,
    condition: Condition,
) -> ProbeResult<Option<String>> {
    match ElementProbe::new(locator, condition).check(driver).await? {
        Check::Ready(resolved) => Ok(Some(
            resolved.first().map(|e| e.text.clone()).unwrap_or_default(),
        )),
        Check::Pending(_) => Ok(None),
    }
}

#[async_trait]
impl Probe for OutcomeProbe {
    type Output = SubmitOutcome;

    async fn check(&self, driver: &mut dyn BrowserDriver) -> ProbeResult<Check<SubmitOutcome>> {
        match self.phase {
            SubmitPhase::Identifier => {
                if let Some(text) = shown(driver, &self.identifier_error, Condition::Visible).await? {
                    return Ok(Check::Ready(SubmitOutcome::IdentifierRejected(text)));
                }
                let unknown = Condition::TextContains(self.unknown_identifier.clone());
                if let Some(text) = shown(driver, &self.error_message, unknown).await? {
                    return Ok(Check::Ready(SubmitOutcome::IdentifierRejected(text)));
                }
                if shown(driver, &self.secret_input, Condition::Visible)
                    .await?
                    .is_some()
                {
                    return Ok(Check::Ready(SubmitOutcome::SecretFieldShown));
                }
                Ok(Check::Pending(Observation::pending(
                    "no secret field, identifier error or message yet",
                )))
            }
            SubmitPhase::Secret => {
                let url = driver.current_url().await?;
                if !self.surfaces.is_sign_in(&url) {
                    return Ok(Check::Ready(SubmitOutcome::SurfaceLeft(url)));
                }
                let refused = Condition::TextContains(self.invalid_credentials.clone());
                if let Some(text) = shown(driver, &self.error_message, refused).await? {
                    return Ok(Check::Ready(SubmitOutcome::SecretRejected(text)));
                }
                if let Some(text) = shown(driver, &self.secret_error, Condition::Visible).await? {
                    return Ok(Check::Ready(SubmitOutcome::SecretRejected(text)));
                }
                Ok(Check::Pending(Observation::pending(format!(
                    "still on {url} with no error"
                ))))
            }
        }
    }

    fn describe(&self) -> String {
        match self.phase {
            SubmitPhase::Identifier => "outcome of identifier submit".to_string(),
            SubmitPhase::Secret => "outcome of secret submit".to_string(),
        }
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Drives the two-phase flow on one session and tracks its state
#[derive(Debug)]
pub struct AuthFlowDriver<'s> {
    session: &'s mut Session,
    state: AuthSessionState,
    history: Vec<AuthSessionState>,
    secret_revealed: bool,
}

impl<'s> AuthFlowDriver<'s> {
    /// Start in `AwaitingIdentifier` on an already open entry surface
    #[must_use]
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            state: AuthSessionState::AwaitingIdentifier,
            history: vec![AuthSessionState::AwaitingIdentifier],
            secret_revealed: false,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> AuthSessionState {
        self.state
    }

    /// Every state entered, starting with the initial one
    #[must_use]
    pub fn history(&self) -> &[AuthSessionState] {
        &self.history
    }

    /// Underlying session
    pub fn session(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Release the session borrow
    #[must_use]
    pub fn into_session(self) -> &'s mut Session {
        self.session
    }

    fn page(&mut self) -> SignInPage<'_> {
        SignInPage::attach(&mut *self.session)
    }

    fn apply(&mut self, event: AuthEvent) -> ProbeResult<AuthSessionState> {
        let next = transition(self.state, event)?;
        debug!(from = %self.state, to = %next, %event, "auth transition");
        self.state = next;
        self.history.push(next);
        Ok(next)
    }

    fn require(&self, expected: AuthSessionState, action: &str) -> ProbeResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ProbeError::assertion(
                format!("{expected} before {action}"),
                self.state.as_str(),
            ))
        }
    }

    async fn await_outcome(&mut self, phase: SubmitPhase) -> ProbeResult<SubmitOutcome> {
        let probe = OutcomeProbe::new(phase, self.session.context());
        let polled = self.session.wait_for(&probe, Budget::Critical).await?;
        self.session.record_pass(
            probe.describe(),
            "a terminal observation",
            polled.value.describe(),
            polled.elapsed,
        );
        Ok(polled.value)
    }

    /// Navigate to the entry surface; a fresh page awaits the identifier
    pub async fn open(&mut self) -> ProbeResult<()> {
        self.page().visit().await?;
        self.secret_revealed = false;
        if self.state != AuthSessionState::AwaitingIdentifier {
            self.state = AuthSessionState::AwaitingIdentifier;
            self.history.push(self.state);
        }
        Ok(())
    }

    /// Enter and submit an identifier, then wait for its outcome.
    ///
    /// An empty identifier leaves the submit button disabled; that counts as a
    /// rejection without clicking. After any rejection the URL must still be
    /// the entry surface and, on a page that never revealed it, the secret
    /// field must be absent.
    pub async fn submit_identifier(&mut self, identifier: &str) -> ProbeResult<AuthSessionState> {
        self.require(AuthSessionState::AwaitingIdentifier, "submitting an identifier")?;
        self.page().enter_identifier(identifier).await?;

        let outcome = if identifier.is_empty() && !self.submit_enabled().await? {
            SubmitOutcome::IdentifierRejected("submit disabled".to_string())
        } else {
            self.session.click(SUBMIT_BUTTON).await?;
            self.await_outcome(SubmitPhase::Identifier).await?
        };
        debug!(outcome = %outcome.describe(), "identifier submitted");

        let state = self.apply(outcome.event())?;
        if state == AuthSessionState::AwaitingSecret {
            self.secret_revealed = true;
        } else {
            let revealed = self.secret_revealed;
            let page = self.page().verify_stays_on_entry_surface().await?;
            if !revealed {
                page.verify_secret_hidden().await?;
            }
        }
        Ok(state)
    }

    async fn submit_enabled(&mut self) -> ProbeResult<bool> {
        let locator = self.session.context().locator(SUBMIT_BUTTON);
        let check = self
            .session
            .check_once(&ElementProbe::new(&locator, Condition::Enabled))
            .await?;
        Ok(matches!(check, Check::Ready(_)))
    }

    /// Wait for the secret field, enter and submit a secret, then wait for its
    /// outcome. A rejected secret must leave the entry surface in place.
    pub async fn submit_secret(&mut self, secret: &str) -> ProbeResult<AuthSessionState> {
        self.require(AuthSessionState::AwaitingSecret, "submitting a secret")?;
        self.page().enter_secret(secret).await?;
        self.session.click(SUBMIT_BUTTON).await?;
        let outcome = self.await_outcome(SubmitPhase::Secret).await?;
        debug!(outcome = %outcome.describe(), "secret submitted");

        let state = self.apply(outcome.event())?;
        if state == AuthSessionState::Rejected {
            self.page().verify_stays_on_entry_surface().await?;
        } else {
            info!(base_url = %self.session.context().base_url, "signed in");
        }
        Ok(state)
    }

    /// Both phases; stops after the identifier phase if it did not advance
    pub async fn sign_in(&mut self, credential: &Credential) -> ProbeResult<AuthSessionState> {
        let state = self.submit_identifier(&credential.identifier).await?;
        if state != AuthSessionState::AwaitingSecret {
            return Ok(state);
        }
        self.submit_secret(&credential.secret).await
    }

    /// Clear the identifier and any shown secret; back to `AwaitingIdentifier`
    pub async fn clear_fields(&mut self) -> ProbeResult<AuthSessionState> {
        transition(self.state, AuthEvent::FieldsCleared)?;
        self.page().clear_form().await?;
        self.apply(AuthEvent::FieldsCleared)
    }

    /// Fail unless the flow is in the expected state
    pub fn assert_state(&mut self, expected: AuthSessionState) -> ProbeResult<()> {
        if self.state != expected {
            return Err(ProbeError::assertion(
                format!("state {expected}"),
                self.state.as_str(),
            ));
        }
        self.session.record_pass(
            format!("auth state is {expected}"),
            expected.as_str(),
            self.state.as_str(),
            std::time::Duration::ZERO,
        );
        Ok(())
    }

    /// Fail if the flow authenticated or the entry surface was left
    pub async fn assert_not_authenticated(&mut self) -> ProbeResult<()> {
        if self.state == AuthSessionState::Authenticated {
            return Err(ProbeError::assertion(
                "not authenticated",
                self.state.as_str(),
            ));
        }
        self.page().verify_stays_on_entry_surface().await?;
        Ok(())
    }
}
