//! Sign-in surface: identifier entry, then a secret field revealed after the
//! identifier is accepted.

use tracing::debug;

use crate::config::Messages;
use crate::locator::{Locator, LocatorRegistry, Selector};
use crate::page_object::PageObject;
use crate::pages::DashboardPage;
use crate::result::ProbeResult;
use crate::session::{Budget, Session};
use crate::wait::{Condition, UrlCondition};

/// Sign-in form container
pub const FORM: &str = "sign_in.form";
/// Identifier (email) input
pub const IDENTIFIER_INPUT: &str = "sign_in.identifier_input";
/// Secret (password) input, present only after the identifier is accepted
pub const SECRET_INPUT: &str = "sign_in.secret_input";
/// Submit button, disabled while the identifier is empty
pub const SUBMIT_BUTTON: &str = "sign_in.submit_button";
/// Alternative phone login
pub const PHONE_LOGIN_BUTTON: &str = "sign_in.phone_login_button";
/// Surface title
pub const TITLE: &str = "sign_in.title";
/// Greeting
pub const WELCOME_MESSAGE: &str = "sign_in.welcome_message";
/// Link to account creation
pub const SIGN_UP_LINK: &str = "sign_in.sign_up_link";
/// Generic message area
pub const ERROR_MESSAGE: &str = "sign_in.error_message";
/// Validation message under the identifier
pub const IDENTIFIER_ERROR: &str = "sign_in.identifier_error";
/// Validation message under the secret
pub const SECRET_ERROR: &str = "sign_in.secret_error";
/// Rejected-secret message
pub const INVALID_CREDENTIALS: &str = "sign_in.invalid_credentials";
/// Identifier field label
pub const IDENTIFIER_LABEL: &str = "sign_in.identifier_label";
/// "Or login with email" divider
pub const DIVIDER_TEXT: &str = "sign_in.divider_text";

/// Every sign-in locator name
pub const ALL: &[&str] = &[
    FORM,
    IDENTIFIER_INPUT,
    SECRET_INPUT,
    SUBMIT_BUTTON,
    PHONE_LOGIN_BUTTON,
    TITLE,
    WELCOME_MESSAGE,
    SIGN_UP_LINK,
    ERROR_MESSAGE,
    IDENTIFIER_ERROR,
    SECRET_ERROR,
    INVALID_CREDENTIALS,
    IDENTIFIER_LABEL,
    DIVIDER_TEXT,
];

/// Default sign-in locators
#[must_use]
pub fn registry(messages: &Messages) -> LocatorRegistry {
    let title = messages.sign_in_title.as_str();
    LocatorRegistry::new()
        .with(Locator::new(
            FORM,
            vec![Selector::css("form.sign-in-form"), Selector::css(".sign-in-form")],
        ))
        .with(Locator::new(
            IDENTIFIER_INPUT,
            vec![
                Selector::css(r#"input[autocomplete="username"]"#),
                Selector::css(r#"input[name="email"]"#),
                Selector::css(r#"input[placeholder*="Email"]"#),
            ],
        ))
        .with(Locator::new(
            SECRET_INPUT,
            vec![
                Selector::css(r#"input[type="password"]"#),
                Selector::css(r#"input[autocomplete="current-password"]"#),
                Selector::css(r#"input[name="password"]"#),
            ],
        ))
        .with(Locator::new(
            SUBMIT_BUTTON,
            vec![
                Selector::css_with_text(r#"button[type="submit"]"#, title),
                Selector::css(r#".sign-in-form button[type="submit"]"#),
            ],
        ))
        .with(Locator::new(
            PHONE_LOGIN_BUTTON,
            vec![Selector::css_with_text("button", "Login with phone")],
        ))
        .with(
            Locator::new(
                TITLE,
                vec![
                    Selector::css_with_text("span", title),
                    Selector::css_with_text(".MuiTypography-root", title),
                ],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                WELCOME_MESSAGE,
                vec![Selector::css_with_text("span", &messages.welcome_back)],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                SIGN_UP_LINK,
                vec![
                    Selector::css_with_text("span", "Create Account"),
                    Selector::css_with_text(".MuiTypography-root", "Create Account"),
                ],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                ERROR_MESSAGE,
                vec![Selector::css(".MuiTypography-root.MuiTypography-body2")],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                IDENTIFIER_ERROR,
                vec![Selector::css_with_text("p", &messages.invalid_identifier)],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                SECRET_ERROR,
                vec![
                    Selector::css("#password-helper-text.Mui-error"),
                    Selector::css(".MuiFormHelperText-root.Mui-error"),
                ],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                INVALID_CREDENTIALS,
                vec![Selector::css_with_text("p", &messages.invalid_credentials)],
            )
            .at_least_one(),
        )
        .with(Locator::new(
            IDENTIFIER_LABEL,
            vec![Selector::css_with_text("label", "Email")],
        ))
        .with(Locator::new(
            DIVIDER_TEXT,
            vec![Selector::css_with_text("span", "Or login with email")],
        ))
}

/// The sign-in surface
#[derive(Debug)]
pub struct SignInPage<'s> {
    session: &'s mut Session,
}

impl PageObject for SignInPage<'_> {
    fn url_pattern(&self) -> &str {
        &self.session.context().surfaces.sign_in_path
    }

    fn required_locators(&self) -> &'static [&'static str] {
        &[TITLE, IDENTIFIER_INPUT]
    }

    fn page_name(&self) -> &str {
        "SignInPage"
    }
}

impl<'s> SignInPage<'s> {
    /// Attach to a session without navigating
    #[must_use]
    pub fn attach(session: &'s mut Session) -> Self {
        Self { session }
    }

    /// Navigate to the surface and wait for the form
    pub async fn open(session: &'s mut Session) -> ProbeResult<Self> {
        Self::attach(session).visit().await
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

    fn sign_in_path(&self) -> String {
        self.session.context().surfaces.sign_in_path.clone()
    }

    fn messages(&self) -> &Messages {
        &self.session.context().messages
    }

    /// Navigate to the surface and wait for the form
    pub async fn visit(self) -> ProbeResult<Self> {
        let path = self.sign_in_path();
        debug!(page = self.page_name(), "visit");
        self.session.goto(&path).await?;
        self.session
            .expect_url(UrlCondition::Contains(path), Budget::Critical)
            .await?;
        self.session
            .expect(FORM, Condition::Visible, Budget::Critical)
            .await?;
        Ok(self)
    }

    /// Wait for the title and identifier input
    pub async fn wait_for_page_load(self) -> ProbeResult<Self> {
        for name in self.required_locators() {
            self.session
                .expect(name, Condition::Visible, Budget::Critical)
                .await?;
        }
        Ok(self)
    }

    /// Replace the identifier field's value
    pub async fn enter_identifier(self, identifier: &str) -> ProbeResult<Self> {
        self.session.fill(IDENTIFIER_INPUT, identifier).await?;
        Ok(self)
    }

    /// Wait for the secret field, then replace its value
    pub async fn enter_secret(self, secret: &str) -> ProbeResult<Self> {
        self.session
            .expect(SECRET_INPUT, Condition::Visible, Budget::Normal)
            .await?;
        self.session.fill(SECRET_INPUT, secret).await?;
        Ok(self)
    }

    /// Clear the identifier field
    pub async fn clear_identifier(self) -> ProbeResult<Self> {
        self.session.clear(IDENTIFIER_INPUT).await?;
        Ok(self)
    }

    /// Wait for the secret field, then clear it
    pub async fn clear_secret(self) -> ProbeResult<Self> {
        self.session
            .expect(SECRET_INPUT, Condition::Visible, Budget::Normal)
            .await?;
        self.session.clear(SECRET_INPUT).await?;
        Ok(self)
    }

    /// Clear the identifier, and the secret if it is currently shown
    pub async fn clear_form(self) -> ProbeResult<Self> {
        self.session.clear(IDENTIFIER_INPUT).await?;
        if self.session.is_present(SECRET_INPUT).await? {
            self.session.clear(SECRET_INPUT).await?;
        }
        Ok(self)
    }

    /// Click the submit button once it is enabled
    pub async fn submit(self) -> ProbeResult<Self> {
        self.session.click(SUBMIT_BUTTON).await?;
        Ok(self)
    }

    async fn verify_message(self, name: &str, message: Option<&str>) -> ProbeResult<Self> {
        self.session
            .expect(name, Condition::Visible, Budget::Normal)
            .await?;
        if let Some(text) = message {
            self.session
                .expect(name, Condition::TextContains(text.to_string()), Budget::Normal)
                .await?;
        }
        Ok(self)
    }

    /// Identifier validation message is shown, optionally containing text
    pub async fn verify_identifier_error(self, message: Option<&str>) -> ProbeResult<Self> {
        self.verify_message(IDENTIFIER_ERROR, message).await
    }

    /// Secret validation message is shown, optionally containing text
    pub async fn verify_secret_error(self, message: Option<&str>) -> ProbeResult<Self> {
        self.verify_message(SECRET_ERROR, message).await
    }

    /// Message area is shown, optionally containing text
    pub async fn verify_error_message(self, message: Option<&str>) -> ProbeResult<Self> {
        self.verify_message(ERROR_MESSAGE, message).await
    }

    /// Rejected-secret message is shown
    pub async fn verify_invalid_credentials(self) -> ProbeResult<Self> {
        self.verify_message(INVALID_CREDENTIALS, None).await
    }

    /// URL is still on the entry surface
    pub async fn verify_stays_on_entry_surface(self) -> ProbeResult<Self> {
        let path = self.sign_in_path();
        self.session
            .expect_url(UrlCondition::Contains(path), Budget::Normal)
            .await?;
        Ok(self)
    }

    /// URL has left the entry surface; hands over to the dashboard
    pub async fn verify_successful_sign_in(self) -> ProbeResult<DashboardPage<'s>> {
        let path = self.sign_in_path();
        let entry_url = self.session.context().url(&path);
        self.session
            .expect_url(UrlCondition::NotContains(path), Budget::Critical)
            .await?;
        self.session
            .expect_url(UrlCondition::NotEquals(entry_url), Budget::Normal)
            .await?;
        Ok(DashboardPage::attach(self.session))
    }

    /// Greeting is shown
    pub async fn verify_welcome_message(self) -> ProbeResult<Self> {
        self.session
            .expect(WELCOME_MESSAGE, Condition::Visible, Budget::Normal)
            .await?;
        Ok(self)
    }

    /// Title contains the given text, or the configured title
    pub async fn verify_page_title(self, title: Option<&str>) -> ProbeResult<Self> {
        let title = title.map_or_else(|| self.messages().sign_in_title.clone(), str::to_string);
        self.session
            .expect(TITLE, Condition::TextContains(title), Budget::Normal)
            .await?;
        Ok(self)
    }

    /// Submit button is enabled
    pub async fn verify_submit_enabled(self) -> ProbeResult<Self> {
        self.session
            .expect(SUBMIT_BUTTON, Condition::Enabled, Budget::Normal)
            .await?;
        Ok(self)
    }

    /// Submit button is disabled
    pub async fn verify_submit_disabled(self) -> ProbeResult<Self> {
        self.session
            .expect(SUBMIT_BUTTON, Condition::Disabled, Budget::Normal)
            .await?;
        Ok(self)
    }

    /// Identifier input and its label, phone login, the email divider and
    /// the sign-up link are visible
    pub async fn verify_entry_elements(self) -> ProbeResult<Self> {
        for name in [
            IDENTIFIER_LABEL,
            IDENTIFIER_INPUT,
            PHONE_LOGIN_BUTTON,
            DIVIDER_TEXT,
            SIGN_UP_LINK,
        ] {
            self.session
                .expect(name, Condition::Visible, Budget::Normal)
                .await?;
        }
        Ok(self)
    }

    /// Secret field is not shown
    pub async fn verify_secret_hidden(self) -> ProbeResult<Self> {
        self.session
            .expect(SECRET_INPUT, Condition::NotVisible, Budget::Normal)
            .await?;
        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::MockBrowser;
    use crate::result::FailureKind;
    use crate::session::SuiteContext;
    use std::sync::Arc;

    fn session() -> Session {
        Session::new(Box::new(MockBrowser::new()), Arc::new(SuiteContext::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_visit_and_page_load() {
        let mut session = session();
        SignInPage::open(&mut session)
            .await
            .unwrap()
            .wait_for_page_load()
            .await
            .unwrap()
            .verify_entry_elements()
            .await
            .unwrap()
            .verify_welcome_message()
            .await
            .unwrap()
            .verify_page_title(None)
            .await
            .unwrap()
            .verify_submit_disabled()
            .await
            .unwrap();
        assert!(session.journal().len() >= 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_sign_in_reaches_dashboard() {
        let mut session = session();
        let dashboard = SignInPage::open(&mut session)
            .await
            .unwrap()
            .enter_identifier("test@example.com")
            .await
            .unwrap()
            .verify_submit_enabled()
            .await
            .unwrap()
            .submit()
            .await
            .unwrap()
            .enter_secret("Test@123")
            .await
            .unwrap()
            .submit()
            .await
            .unwrap()
            .verify_successful_sign_in()
            .await
            .unwrap();
        dashboard.verify_loaded().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_identifier_shows_error() {
        let mut session = session();
        SignInPage::open(&mut session)
            .await
            .unwrap()
            .enter_identifier("invalid-email-format")
            .await
            .unwrap()
            .submit()
            .await
            .unwrap()
            .verify_identifier_error(Some("Invalid Email"))
            .await
            .unwrap()
            .verify_secret_hidden()
            .await
            .unwrap()
            .verify_stays_on_entry_surface()
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_secret_shows_invalid_credentials() {
        let mut session = session();
        SignInPage::open(&mut session)
            .await
            .unwrap()
            .enter_identifier("test@example.com")
            .await
            .unwrap()
            .submit()
            .await
            .unwrap()
            .enter_secret("WrongPass")
            .await
            .unwrap()
            .submit()
            .await
            .unwrap()
            .verify_invalid_credentials()
            .await
            .unwrap()
            .verify_stays_on_entry_surface()
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_credentials_uses_its_own_locator() {
        let mut session = session();
        let mut page = SignInPage::open(&mut session)
            .await
            .unwrap()
            .enter_identifier("test@example.com")
            .await
            .unwrap()
            .submit()
            .await
            .unwrap();
        // Before the secret is rejected nothing matches
        let err = page
            .session
            .expect(INVALID_CREDENTIALS, Condition::Visible, Budget::Normal)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ElementNotFound);

        page.enter_secret("WrongPass")
            .await
            .unwrap()
            .submit()
            .await
            .unwrap()
            .verify_invalid_credentials()
            .await
            .unwrap();
        let last = session.journal().last().unwrap().clone();
        assert!(last.description.contains(INVALID_CREDENTIALS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_elements_include_label_and_divider() {
        let mut session = session();
        SignInPage::open(&mut session)
            .await
            .unwrap()
            .verify_entry_elements()
            .await
            .unwrap();
        let checked: Vec<String> = session
            .journal()
            .iter()
            .map(|e| e.description.clone())
            .collect();
        for name in [IDENTIFIER_LABEL, DIVIDER_TEXT] {
            assert!(checked.iter().any(|d| d.contains(name)), "{name} not checked");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_form_without_secret_field() {
        let mut session = session();
        let page = SignInPage::open(&mut session)
            .await
            .unwrap()
            .enter_identifier("someone@example.com")
            .await
            .unwrap()
            .clear_form()
            .await
            .unwrap()
            .verify_submit_disabled()
            .await
            .unwrap();
        let err = page.enter_secret("x").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ElementNotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_locators_and_pattern() {
        let mut session = session();
        let page = SignInPage::attach(&mut session);
        assert_eq!(page.url_pattern(), "applynow");
        assert_eq!(page.page_name(), "SignInPage");
        assert_eq!(page.required_locators(), &[TITLE, IDENTIFIER_INPUT]);
    }
}
