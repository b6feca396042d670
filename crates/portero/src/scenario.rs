//! Scenarios: an ordered list of steps run against one credential.
//!
//! Steps are serde-tagged by `action` so suites can be written in YAML:
//!
//! ```yaml
//! - id: TC-009
//!   title: Wrong secret is refused
//!   kind: negative
//!   credential: { source: fixture, tag: wrong-password }
//!   steps:
//!     - action: sign_in
//!     - action: expect_state
//!       state: rejected
//!     - action: expect_error_message
//!       message: Invalid Credentials
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, trace};

use crate::auth_flow::{AuthFlowDriver, AuthSessionState};
use crate::fixture::{tags, Credential};
use crate::pages::{DashboardPage, SignInPage};
use crate::result::{ProbeError, ProbeResult};

/// Whether a scenario expects the sign-in to succeed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Expected to authenticate
    #[default]
    Positive,
    /// Expected to be refused
    Negative,
}

/// Where a scenario's credential comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CredentialSource {
    /// `TEST_EMAIL` / `TEST_PASSWORD`, or the command-line override
    Environment,
    /// A tagged fixture entry
    Fixture {
        /// Scenario tag in the fixture store
        tag: String,
        /// Use the environment pair when the tag is missing
        #[serde(default = "default_fallback")]
        fallback: bool,
    },
    /// Values written into the scenario
    Literal {
        /// Identifier
        #[serde(default)]
        identifier: Option<String>,
        /// Secret
        #[serde(default)]
        secret: Option<String>,
    },
    /// No credential; steps carry their own values
    #[default]
    None,
}

const fn default_fallback() -> bool {
    true
}

impl CredentialSource {
    /// Fixture source with environment fallback
    #[must_use]
    pub fn fixture(tag: &str) -> Self {
        Self::Fixture {
            tag: tag.to_string(),
            fallback: true,
        }
    }

    /// Literal pair
    #[must_use]
    pub fn literal(identifier: &str, secret: &str) -> Self {
        Self::Literal {
            identifier: Some(identifier.to_string()),
            secret: Some(secret.to_string()),
        }
    }

    /// Short label for reports
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Environment => tags::ENVIRONMENT.to_string(),
            Self::Fixture { tag, .. } => format!("fixture:{tag}"),
            Self::Literal { .. } => tags::LITERAL.to_string(),
            Self::None => "none".to_string(),
        }
    }
}

/// One scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to the entry surface again
    Visit,
    /// Title and identifier input are visible
    WaitForPageLoad,
    /// Type an identifier without submitting; the credential's when omitted
    EnterIdentifier {
        /// Value to type
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// Wait for the secret field and type a secret without submitting
    EnterSecret {
        /// Value to type
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// Click submit without tracking state
    Submit,
    /// Enter and submit an identifier through the auth flow
    SubmitIdentifier {
        /// Value to submit
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// Enter and submit a secret through the auth flow
    SubmitSecret {
        /// Value to submit
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// Both phases with the scenario credential
    SignIn,
    /// Clear the identifier field
    ClearIdentifier,
    /// Clear the secret field
    ClearSecret,
    /// Clear both fields through the auth flow
    ClearForm,
    /// Auth state equals
    ExpectState {
        /// Expected state
        state: AuthSessionState,
    },
    /// Not authenticated and still on the entry surface
    ExpectNotAuthenticated,
    /// Identifier validation message
    ExpectIdentifierError {
        /// Text the message contains
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Secret validation message
    ExpectSecretError {
        /// Text the message contains
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Message area
    ExpectErrorMessage {
        /// Text the message contains
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Rejected-secret message with the configured text
    ExpectInvalidCredentials,
    /// URL is the entry surface
    ExpectEntrySurface,
    /// Identifier input and label, phone login, divider and sign-up link
    /// are visible
    ExpectEntryElements,
    /// Entry surface greeting
    ExpectWelcome,
    /// Entry surface left and dashboard loaded
    ExpectDashboard,
    /// Dashboard greeting
    ExpectDashboardWelcome,
    /// Dashboard avatar
    ExpectProfileVisible,
    /// Dashboard display name
    ExpectUserName {
        /// Name shown; the configured one when omitted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Every dashboard navigation link
    ExpectNavigationLinks,
    /// Application summary heading
    ExpectApplicationSummary,
    /// Score percentage
    ExpectScoreSection,
    /// Submit button disabled
    ExpectSubmitDisabled,
    /// Clear, submit and check each identifier in turn; none may authenticate
    RepeatIdentifiers {
        /// Identifiers to try
        values: Vec<String>,
    },
}

impl Step {
    /// Snake-case action name
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Visit => "visit",
            Self::WaitForPageLoad => "wait_for_page_load",
            Self::EnterIdentifier { .. } => "enter_identifier",
            Self::EnterSecret { .. } => "enter_secret",
            Self::Submit => "submit",
            Self::SubmitIdentifier { .. } => "submit_identifier",
            Self::SubmitSecret { .. } => "submit_secret",
            Self::SignIn => "sign_in",
            Self::ClearIdentifier => "clear_identifier",
            Self::ClearSecret => "clear_secret",
            Self::ClearForm => "clear_form",
            Self::ExpectState { .. } => "expect_state",
            Self::ExpectNotAuthenticated => "expect_not_authenticated",
            Self::ExpectIdentifierError { .. } => "expect_identifier_error",
            Self::ExpectSecretError { .. } => "expect_secret_error",
            Self::ExpectErrorMessage { .. } => "expect_error_message",
            Self::ExpectInvalidCredentials => "expect_invalid_credentials",
            Self::ExpectEntrySurface => "expect_entry_surface",
            Self::ExpectEntryElements => "expect_entry_elements",
            Self::ExpectWelcome => "expect_welcome",
            Self::ExpectDashboard => "expect_dashboard",
            Self::ExpectDashboardWelcome => "expect_dashboard_welcome",
            Self::ExpectProfileVisible => "expect_profile_visible",
            Self::ExpectUserName { .. } => "expect_user_name",
            Self::ExpectNavigationLinks => "expect_navigation_links",
            Self::ExpectApplicationSummary => "expect_application_summary",
            Self::ExpectScoreSection => "expect_score_section",
            Self::ExpectSubmitDisabled => "expect_submit_disabled",
            Self::RepeatIdentifiers { .. } => "repeat_identifiers",
        }
    }

    /// Description for reports; secrets are never included
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::EnterIdentifier { value: Some(v) } | Self::SubmitIdentifier { value: Some(v) } => {
                format!("{} {v:?}", self.action())
            }
            Self::ExpectState { state } => format!("expect_state {state}"),
            Self::ExpectIdentifierError { message: Some(m) }
            | Self::ExpectSecretError { message: Some(m) }
            | Self::ExpectErrorMessage { message: Some(m) } => format!("{} {m:?}", self.action()),
            Self::ExpectUserName { name: Some(n) } => format!("expect_user_name {n:?}"),
            Self::RepeatIdentifiers { values } => {
                format!("repeat_identifiers ({} values)", values.len())
            }
            _ => self.action().to_string(),
        }
    }
}

/// A named, isolated sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable identifier, e.g. `TC-001`
    pub id: String,
    /// One-line title
    pub title: String,
    /// Expected direction of the outcome
    #[serde(default)]
    pub kind: ScenarioKind,
    /// Credential the steps use
    #[serde(default)]
    pub credential: CredentialSource,
    /// Steps, run in order
    pub steps: Vec<Step>,
    /// Free-form labels for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Scenario {
    /// Create a scenario with no steps
    #[must_use]
    pub fn new(id: &str, title: &str, kind: ScenarioKind) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind,
            credential: CredentialSource::None,
            steps: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the credential source
    #[must_use]
    pub fn with_credential(mut self, credential: CredentialSource) -> Self {
        self.credential = credential;
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Add a tag
    #[must_use]
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Case-insensitive match on id, title or tags
    #[must_use]
    pub fn matches(&self, pattern: &str) -> bool {
        let pattern = pattern.to_lowercase();
        self.id.to_lowercase().contains(&pattern)
            || self.title.to_lowercase().contains(&pattern)
            || self.tags.iter().any(|t| t.to_lowercase() == pattern)
    }

    /// Run every step on an auth flow that already sits on the entry surface.
    ///
    /// Fail-fast: the first failing step ends the scenario with its error.
    pub async fn execute(
        &self,
        flow: &mut AuthFlowDriver<'_>,
        credential: Option<&Credential>,
    ) -> ProbeResult<AuthSessionState> {
        for (index, step) in self.steps.iter().enumerate() {
            trace!(scenario = %self.id, step = index + 1, action = step.action(), "step");
            run_step(flow, step, credential).await.map_err(|e| {
                debug!(scenario = %self.id, step = %step.describe(), error = %e, "step failed");
                e
            })?;
        }
        Ok(flow.state())
    }
}

fn pick(
    value: Option<&str>,
    credential: Option<&Credential>,
    field: impl Fn(&Credential) -> &str,
    step: &Step,
) -> ProbeResult<String> {
    value
        .map(str::to_string)
        .or_else(|| credential.map(|c| field(c).to_string()))
        .ok_or_else(|| {
            ProbeError::fixture(format!(
                "step {} needs a value or a scenario credential",
                step.action()
            ))
        })
}

fn identifier_of(step: &Step, value: Option<&String>, credential: Option<&Credential>) -> ProbeResult<String> {
    pick(value.map(String::as_str), credential, |c| c.identifier.as_str(), step)
}

fn secret_of(step: &Step, value: Option<&String>, credential: Option<&Credential>) -> ProbeResult<String> {
    pick(value.map(String::as_str), credential, |c| c.secret.as_str(), step)
}

async fn run_step(
    flow: &mut AuthFlowDriver<'_>,
    step: &Step,
    credential: Option<&Credential>,
) -> ProbeResult<()> {
    match step {
        Step::Visit => flow.open().await?,
        Step::WaitForPageLoad => {
            SignInPage::attach(flow.session()).wait_for_page_load().await?;
        }
        Step::EnterIdentifier { value } => {
            let identifier = identifier_of(step, value.as_ref(), credential)?;
            SignInPage::attach(flow.session())
                .enter_identifier(&identifier)
                .await?;
        }
        Step::EnterSecret { value } => {
            let secret = secret_of(step, value.as_ref(), credential)?;
            SignInPage::attach(flow.session()).enter_secret(&secret).await?;
        }
        Step::Submit => {
            SignInPage::attach(flow.session()).submit().await?;
        }
        Step::SubmitIdentifier { value } => {
            let identifier = identifier_of(step, value.as_ref(), credential)?;
            flow.submit_identifier(&identifier).await?;
        }
        Step::SubmitSecret { value } => {
            let secret = secret_of(step, value.as_ref(), credential)?;
            flow.submit_secret(&secret).await?;
        }
        Step::SignIn => {
            let credential = credential.ok_or_else(|| {
                ProbeError::fixture("step sign_in needs a scenario credential")
            })?;
            flow.sign_in(credential).await?;
        }
        Step::ClearIdentifier => {
            SignInPage::attach(flow.session()).clear_identifier().await?;
        }
        Step::ClearSecret => {
            SignInPage::attach(flow.session()).clear_secret().await?;
        }
        Step::ClearForm => {
            flow.clear_fields().await?;
        }
        Step::ExpectState { state } => flow.assert_state(*state)?,
        Step::ExpectNotAuthenticated => flow.assert_not_authenticated().await?,
        Step::ExpectIdentifierError { message } => {
            SignInPage::attach(flow.session())
                .verify_identifier_error(message.as_deref())
                .await?;
        }
        Step::ExpectSecretError { message } => {
            SignInPage::attach(flow.session())
                .verify_secret_error(message.as_deref())
                .await?;
        }
        Step::ExpectErrorMessage { message } => {
            SignInPage::attach(flow.session())
                .verify_error_message(message.as_deref())
                .await?;
        }
        Step::ExpectInvalidCredentials => {
            SignInPage::attach(flow.session())
                .verify_invalid_credentials()
                .await?;
        }
        Step::ExpectEntrySurface => {
            SignInPage::attach(flow.session())
                .verify_stays_on_entry_surface()
                .await?;
        }
        Step::ExpectEntryElements => {
            SignInPage::attach(flow.session())
                .verify_entry_elements()
                .await?;
        }
        Step::ExpectWelcome => {
            SignInPage::attach(flow.session())
                .verify_welcome_message()
                .await?;
        }
        Step::ExpectDashboard => {
            SignInPage::attach(flow.session())
                .verify_successful_sign_in()
                .await?
                .verify_loaded()
                .await?
                .wait_for_load()
                .await?;
        }
        Step::ExpectDashboardWelcome => {
            DashboardPage::attach(flow.session())
                .verify_welcome_message()
                .await?;
        }
        Step::ExpectProfileVisible => {
            DashboardPage::attach(flow.session())
                .verify_profile_visible()
                .await?;
        }
        Step::ExpectUserName { name } => {
            DashboardPage::attach(flow.session())
                .verify_user_name(name.as_deref())
                .await?;
        }
        Step::ExpectNavigationLinks => {
            DashboardPage::attach(flow.session())
                .verify_navigation_links()
                .await?;
        }
        Step::ExpectApplicationSummary => {
            DashboardPage::attach(flow.session())
                .verify_application_summary()
                .await?;
        }
        Step::ExpectScoreSection => {
            DashboardPage::attach(flow.session())
                .verify_score_section()
                .await?;
        }
        Step::ExpectSubmitDisabled => {
            SignInPage::attach(flow.session())
                .verify_submit_disabled()
                .await?;
        }
        Step::RepeatIdentifiers { values } => {
            for value in values {
                flow.clear_fields().await?;
                flow.submit_identifier(value).await?;
                flow.assert_not_authenticated().await?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// SCENARIO FILES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Wrapped { scenarios: Vec<Scenario> },
    List(Vec<Scenario>),
}

/// Check ids are unique and every scenario has steps
pub fn validate(scenarios: &[Scenario]) -> ProbeResult<()> {
    let mut seen = HashSet::new();
    for scenario in scenarios {
        if scenario.id.trim().is_empty() {
            return Err(ProbeError::config(format!(
                "scenario {:?} has an empty id",
                scenario.title
            )));
        }
        if !seen.insert(scenario.id.as_str()) {
            return Err(ProbeError::config(format!(
                "duplicate scenario id {}",
                scenario.id
            )));
        }
        if scenario.steps.is_empty() {
            return Err(ProbeError::config(format!(
                "scenario {} has no steps",
                scenario.id
            )));
        }
    }
    Ok(())
}

/// Parse scenarios from YAML (a list, or a map with a `scenarios` list)
pub fn parse_scenarios(yaml: &str) -> ProbeResult<Vec<Scenario>> {
    let scenarios = match serde_yaml_ng::from_str::<ScenarioFile>(yaml)? {
        ScenarioFile::Wrapped { scenarios } | ScenarioFile::List(scenarios) => scenarios,
    };
    validate(&scenarios)?;
    Ok(scenarios)
}

/// Load a scenario file
pub fn load_scenarios(path: &Path) -> ProbeResult<Vec<Scenario>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ProbeError::config(format!("cannot read {}: {e}", path.display()))
    })?;
    let scenarios = parse_scenarios(&content)?;
    debug!(path = %path.display(), count = scenarios.len(), "loaded scenarios");
    Ok(scenarios)
}
