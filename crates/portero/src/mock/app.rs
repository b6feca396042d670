//! Simulated two-step sign-in application.
//!
//! Behaves like the real entry surface closely enough to verify the engine
//! end to end: the secret field appears only after the identifier is
//! accepted, server-side checks take virtual time, a correct secret stores a
//! session cookie and token and redirects to the dashboard, and an existing
//! session short-circuits the entry surface.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::config::Messages;
use crate::mock::dom::MockElement;
use crate::page_object::url_path;
use crate::result::{ProbeError, ProbeResult};

/// Session cookie name
pub const SESSION_COOKIE: &str = "session";
/// Local storage key holding the access token
pub const TOKEN_KEY: &str = "token";
/// Helper text under an empty secret
pub const SECRET_REQUIRED: &str = "Password is required";

/// An account the simulated backend knows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Email
    pub identifier: String,
    /// Password
    pub secret: String,
    /// Name shown on the dashboard
    pub display_name: String,
}

impl Account {
    /// Create an account
    #[must_use]
    pub fn new(identifier: &str, secret: &str, display_name: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Timing, accounts and fault injection for the simulated application
#[derive(Debug, Clone)]
pub struct AppBehavior {
    /// Known accounts
    pub accounts: Vec<Account>,
    /// Texts the application renders
    pub messages: Messages,
    /// Delay before a navigated page renders
    pub page_load_ms: u64,
    /// Server check of a submitted identifier
    pub identifier_check_ms: u64,
    /// Server check of a submitted secret
    pub secret_check_ms: u64,
    /// Every navigation fails at the transport level
    pub fail_navigation: bool,
    /// Accepted identifiers never reveal the secret field
    pub secret_field_never_appears: bool,
    /// Submissions are swallowed without any response
    pub unresponsive: bool,
    /// Number of initial correct-secret submissions that never complete
    pub flaky_sign_ins: u32,
}

impl Default for AppBehavior {
    fn default() -> Self {
        Self {
            accounts: vec![Account::new("test@example.com", "Test@123", "Test User")],
            messages: Messages::default(),
            page_load_ms: 200,
            identifier_check_ms: 300,
            secret_check_ms: 400,
            fail_navigation: false,
            secret_field_never_appears: false,
            unresponsive: false,
            flaky_sign_ins: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Identifier,
    Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Transition {
    RevealSecret,
    UnknownIdentifier,
    Authenticate(usize),
    RejectSecret,
}

const NAVIGATION: &[(&str, &str)] = &[
    ("nav-home", "/dashboard"),
    ("nav-profile", "/dashboard/profile"),
    ("nav-documents", "/dashboard/documents"),
    ("nav-applications", "/dashboard/applications"),
    ("nav-universities", "/dashboard/universitiesandprograms"),
    ("nav-score", "/dashboard/wisescore"),
];

#[allow(clippy::unwrap_used)]
fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$").unwrap()
    })
}

/// Client-side identifier validation
#[must_use]
pub fn is_well_formed_identifier(identifier: &str) -> bool {
    email_regex().is_match(identifier)
}

/// The simulated application's state
#[derive(Debug, Clone)]
pub struct SimulatedSignInApp {
    behavior: AppBehavior,
    origin: String,
    path: String,
    ready_at: Instant,
    phase: Phase,
    identifier: String,
    secret: String,
    identifier_submitted: bool,
    accepted_identifier: Option<String>,
    identifier_error: bool,
    secret_error: bool,
    banner: Option<String>,
    pending: Option<(Instant, Transition)>,
    account: Option<usize>,
    cookies: BTreeMap<String, String>,
    local_storage: BTreeMap<String, String>,
    session_storage: BTreeMap<String, String>,
    sign_in_attempts: u32,
}

impl Default for SimulatedSignInApp {
    fn default() -> Self {
        Self::new(AppBehavior::default())
    }
}

impl SimulatedSignInApp {
    /// Create an application on a blank page
    #[must_use]
    pub fn new(behavior: AppBehavior) -> Self {
        Self {
            behavior,
            origin: String::new(),
            path: "about:blank".to_string(),
            ready_at: Instant::now(),
            phase: Phase::Identifier,
            identifier: String::new(),
            secret: String::new(),
            identifier_submitted: false,
            accepted_identifier: None,
            identifier_error: false,
            secret_error: false,
            banner: None,
            pending: None,
            account: None,
            cookies: BTreeMap::new(),
            local_storage: BTreeMap::new(),
            session_storage: BTreeMap::new(),
            sign_in_attempts: 0,
        }
    }

    /// Behavior this application was built with
    #[must_use]
    pub fn behavior(&self) -> &AppBehavior {
        &self.behavior
    }

    fn authenticated(&self) -> bool {
        self.cookies.contains_key(SESSION_COOKIE) || self.local_storage.contains_key(TOKEN_KEY)
    }

    fn on_sign_in(&self) -> bool {
        self.path.trim_start_matches('/').starts_with("applynow")
    }

    fn on_dashboard(&self) -> bool {
        self.path.starts_with("/dashboard")
    }

    fn load(&mut self, path: &str) {
        self.path = path.to_string();
        self.ready_at = Instant::now() + Duration::from_millis(self.behavior.page_load_ms);
        self.phase = Phase::Identifier;
        self.identifier.clear();
        self.secret.clear();
        self.identifier_submitted = false;
        self.accepted_identifier = None;
        self.identifier_error = false;
        self.secret_error = false;
        self.banner = None;
        self.pending = None;

        if self.on_sign_in() && self.authenticated() {
            self.path = "/dashboard".to_string();
        } else if self.on_dashboard() && !self.authenticated() {
            self.path = "/applynow".to_string();
        }
    }

    /// Navigate to an absolute URL
    pub fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        if self.behavior.fail_navigation {
            return Err(ProbeError::driver(format!(
                "net::ERR_CONNECTION_REFUSED at {url}"
            )));
        }
        let path = url_path(url);
        self.origin = url.find("://").map_or_else(String::new, |i| {
            let host_start = i + 3;
            let end = url[host_start..]
                .find(['/', '?', '#'])
                .map_or(url.len(), |j| host_start + j);
            url[..end].to_string()
        });
        self.load(if path.is_empty() { "/" } else { path });
        Ok(())
    }

    /// Current URL
    pub fn current_url(&mut self) -> String {
        self.settle();
        if self.origin.is_empty() {
            self.path.clone()
        } else {
            format!("{}{}", self.origin, self.path)
        }
    }

    fn settle(&mut self) {
        let Some((at, _)) = &self.pending else {
            return;
        };
        if Instant::now() < *at {
            return;
        }
        let Some((_, transition)) = self.pending.take() else {
            return;
        };
        match transition {
            Transition::RevealSecret => {
                if !self.behavior.secret_field_never_appears {
                    self.phase = Phase::Secret;
                    self.accepted_identifier = Some(self.identifier.clone());
                }
            }
            Transition::UnknownIdentifier => {
                self.banner = Some(self.behavior.messages.unknown_identifier.clone());
            }
            Transition::RejectSecret => {
                self.banner = Some(self.behavior.messages.invalid_credentials.clone());
            }
            Transition::Authenticate(index) => {
                self.account = Some(index);
                self.cookies
                    .insert(SESSION_COOKIE.to_string(), format!("s-{index}"));
                self.local_storage
                    .insert(TOKEN_KEY.to_string(), format!("t-{index}"));
                self.load("/dashboard");
            }
        }
    }

    fn schedule(&mut self, delay_ms: u64, transition: Transition) {
        self.pending = Some((Instant::now() + Duration::from_millis(delay_ms), transition));
    }

    /// Elements currently rendered
    pub fn elements(&mut self) -> Vec<MockElement> {
        self.settle();
        if Instant::now() < self.ready_at {
            return vec![MockElement::new("spinner", "span").class("MuiCircularProgress-root")];
        }
        if self.on_sign_in() {
            self.sign_in_elements()
        } else if self.on_dashboard() {
            self.dashboard_elements()
        } else {
            Vec::new()
        }
    }

    fn sign_in_elements(&self) -> Vec<MockElement> {
        let messages = &self.behavior.messages;
        let mut elements = vec![
            MockElement::new("form", "form").class("sign-in-form"),
            MockElement::new("title", "span")
                .class("MuiTypography-root MuiTypography-h4")
                .text(&messages.sign_in_title),
            MockElement::new("welcome", "span")
                .class("MuiTypography-root")
                .text(format!("{}!", messages.welcome_back)),
            MockElement::new("phone", "button")
                .attr("type", "button")
                .text("Login with phone"),
            MockElement::new("divider", "span").text("Or login with email"),
            MockElement::new("email-label", "label")
                .attr("for", "email")
                .text("Email"),
            MockElement::new("email", "input")
                .attr("id", "email")
                .attr("name", "email")
                .attr("type", "email")
                .attr("placeholder", "Email address")
                .value(&self.identifier),
        ];
        if self.identifier_error {
            elements.push(
                MockElement::new("email-error", "p")
                    .attr("id", "email-helper-text")
                    .class("MuiFormHelperText-root Mui-error")
                    .text(&messages.invalid_identifier),
            );
        }
        if self.phase == Phase::Secret {
            elements.push(
                MockElement::new("password", "input")
                    .attr("id", "password")
                    .attr("name", "password")
                    .attr("type", "password")
                    .attr("autocomplete", "current-password")
                    .value(&self.secret),
            );
            if self.secret_error {
                elements.push(
                    MockElement::new("password-error", "p")
                        .attr("id", "password-helper-text")
                        .class("MuiFormHelperText-root Mui-error")
                        .text(SECRET_REQUIRED),
                );
            }
        }
        if let Some(banner) = &self.banner {
            elements.push(
                MockElement::new("banner", "p")
                    .class("MuiTypography-root MuiTypography-body2")
                    .text(banner),
            );
        }
        elements.push(
            MockElement::new("submit", "button")
                .attr("type", "submit")
                .text(&messages.sign_in_title)
                .enabled(!self.identifier.is_empty()),
        );
        elements.push(
            MockElement::new("no-account", "p")
                .class("MuiTypography-root MuiTypography-body2")
                .text("Don't have an account?"),
        );
        elements.push(
            MockElement::new("sign-up", "span")
                .class("MuiTypography-root")
                .text("Create Account"),
        );
        elements
    }

    fn dashboard_elements(&self) -> Vec<MockElement> {
        let messages = &self.behavior.messages;
        let name = self
            .account
            .and_then(|i| self.behavior.accounts.get(i))
            .map_or("Student", |a| a.display_name.as_str());

        let mut elements: Vec<MockElement> = NAVIGATION
            .iter()
            .map(|(key, href)| MockElement::new(*key, "a").attr("href", href))
            .collect();
        elements.extend([
            MockElement::new("avatar", "img").attr("alt", "User Avatar"),
            MockElement::new("user-name", "span")
                .class("MuiTypography-root MuiTypography-body3")
                .text(name),
            MockElement::new("dashboard-welcome", "span")
                .class("MuiTypography-root")
                .text(format!("{} your dashboard!", messages.dashboard_welcome)),
            MockElement::new("steps-title", "h5").text(&messages.dashboard_title),
            MockElement::new("score", "span")
                .class("MuiTypography-root MuiTypography-body3")
                .text("72%"),
            MockElement::new("score-card-link", "a").attr("href", "/dashboard/wisescore"),
            MockElement::new("summary-title", "span").text("Application summary"),
            MockElement::new("started", "span")
                .class("MuiTypography-root MuiTypography-h7")
                .text("Started 3"),
            MockElement::new("paid", "span")
                .class("MuiTypography-root MuiTypography-h7")
                .text("Paid 1"),
        ]);
        elements
    }

    fn rendered(&mut self, key: &str) -> ProbeResult<MockElement> {
        self.elements()
            .into_iter()
            .find(|e| e.key == key)
            .ok_or_else(|| ProbeError::driver(format!("element {key} is no longer attached")))
    }

    /// Type into a rendered field
    pub fn type_text(&mut self, key: &str, text: &str) -> ProbeResult<()> {
        self.rendered(key)?;
        match key {
            "email" => {
                self.identifier.push_str(text);
                self.identifier_error = false;
            }
            "password" => {
                self.secret.push_str(text);
                self.secret_error = false;
            }
            _ => {}
        }
        Ok(())
    }

    /// Clear a rendered field; a touched empty field shows its validation message
    pub fn clear(&mut self, key: &str) -> ProbeResult<()> {
        self.rendered(key)?;
        match key {
            "email" => {
                self.identifier.clear();
                if self.identifier_submitted {
                    self.identifier_error = true;
                }
            }
            "password" => {
                self.secret.clear();
                self.secret_error = true;
            }
            _ => {}
        }
        Ok(())
    }

    /// Click a rendered element
    pub fn click(&mut self, key: &str) -> ProbeResult<()> {
        let element = self.rendered(key)?;
        if !element.enabled {
            return Ok(());
        }
        if let Some(href) = element.attrs.get("href") {
            let href = href.clone();
            self.load(&href);
            return Ok(());
        }
        match key {
            "submit" => self.submit(),
            "sign-up" => self.load("/signup"),
            _ => {}
        }
        Ok(())
    }

    fn submit(&mut self) {
        if self.behavior.unresponsive {
            return;
        }
        self.banner = None;
        self.identifier_submitted = true;
        if !is_well_formed_identifier(&self.identifier) {
            self.identifier_error = true;
            return;
        }
        let identifier_changed = self.accepted_identifier.as_deref() != Some(self.identifier.as_str());
        if self.phase == Phase::Identifier || identifier_changed {
            self.phase = Phase::Identifier;
            self.accepted_identifier = None;
            let known = self
                .behavior
                .accounts
                .iter()
                .any(|a| a.identifier == self.identifier);
            let transition = if known {
                Transition::RevealSecret
            } else {
                Transition::UnknownIdentifier
            };
            self.schedule(self.behavior.identifier_check_ms, transition);
            return;
        }

        if self.secret.is_empty() {
            self.secret_error = true;
            return;
        }
        let matched = self
            .behavior
            .accounts
            .iter()
            .position(|a| a.identifier == self.identifier && a.secret == self.secret);
        match matched {
            Some(index) => {
                self.sign_in_attempts += 1;
                if self.sign_in_attempts <= self.behavior.flaky_sign_ins {
                    return;
                }
                self.schedule(self.behavior.secret_check_ms, Transition::Authenticate(index));
            }
            None => self.schedule(self.behavior.secret_check_ms, Transition::RejectSecret),
        }
    }

    /// Drop all cookies
    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    /// Drop local storage
    pub fn clear_local_storage(&mut self) {
        self.local_storage.clear();
    }

    /// Drop session storage
    pub fn clear_session_storage(&mut self) {
        self.session_storage.clear();
    }

    /// Whether a session cookie or token is stored
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.authenticated()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::time::advance;

    async fn loaded_sign_in() -> SimulatedSignInApp {
        let mut app = SimulatedSignInApp::default();
        app.navigate("https://app.test/applynow").unwrap();
        advance(Duration::from_millis(200)).await;
        app
    }

    fn keys(app: &mut SimulatedSignInApp) -> Vec<String> {
        app.elements().into_iter().map(|e| e.key).collect()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_well_formed_identifier("test@example.com"));
        assert!(is_well_formed_identifier("nonexistent.user@example.com"));
        assert!(!is_well_formed_identifier("invalid-email-format"));
        assert!(!is_well_formed_identifier("test+special@example.com"));
        assert!(!is_well_formed_identifier("' OR '1'='1"));
        assert!(!is_well_formed_identifier(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_renders_after_load_delay() {
        let mut app = SimulatedSignInApp::default();
        app.navigate("https://app.test/applynow").unwrap();
        assert_eq!(keys(&mut app), vec!["spinner"]);
        advance(Duration::from_millis(200)).await;
        let rendered = keys(&mut app);
        assert!(rendered.contains(&"email".to_string()));
        assert!(!rendered.contains(&"password".to_string()));
        assert_eq!(app.current_url(), "https://app.test/applynow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_secret_field_revealed_after_check() {
        let mut app = loaded_sign_in().await;
        app.type_text("email", "test@example.com").unwrap();
        app.click("submit").unwrap();
        assert!(!keys(&mut app).contains(&"password".to_string()));
        advance(Duration::from_millis(300)).await;
        assert!(keys(&mut app).contains(&"password".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_secret_redirects_and_stores_session() {
        let mut app = loaded_sign_in().await;
        app.type_text("email", "test@example.com").unwrap();
        app.click("submit").unwrap();
        advance(Duration::from_millis(300)).await;
        app.type_text("password", "Test@123").unwrap();
        app.click("submit").unwrap();
        advance(Duration::from_millis(400)).await;
        assert_eq!(app.current_url(), "https://app.test/dashboard");
        assert!(app.has_session());

        app.navigate("https://app.test/applynow").unwrap();
        assert_eq!(app.current_url(), "https://app.test/dashboard");
        app.clear_cookies();
        app.clear_local_storage();
        app.navigate("https://app.test/applynow").unwrap();
        assert_eq!(app.current_url(), "https://app.test/applynow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_identifier_banner() {
        let mut app = loaded_sign_in().await;
        app.type_text("email", "nobody@example.com").unwrap();
        app.click("submit").unwrap();
        advance(Duration::from_millis(300)).await;
        let banner = app.elements().into_iter().find(|e| e.key == "banner").unwrap();
        assert_eq!(banner.text, "Failed to get student");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_fields_show_validation() {
        let mut app = loaded_sign_in().await;
        app.type_text("email", "test@example.com").unwrap();
        app.click("submit").unwrap();
        advance(Duration::from_millis(300)).await;
        app.clear("password").unwrap();
        app.clear("email").unwrap();
        let rendered = keys(&mut app);
        assert!(rendered.contains(&"password-error".to_string()));
        assert!(rendered.contains(&"email-error".to_string()));
        let submit = app.elements().into_iter().find(|e| e.key == "submit").unwrap();
        assert!(!submit.enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_sign_in_swallows_first_attempt() {
        let mut app = SimulatedSignInApp::new(AppBehavior {
            flaky_sign_ins: 1,
            ..AppBehavior::default()
        });
        for expected in ["https://app.test/applynow", "https://app.test/dashboard"] {
            app.navigate("https://app.test/applynow").unwrap();
            advance(Duration::from_millis(200)).await;
            app.type_text("email", "test@example.com").unwrap();
            app.click("submit").unwrap();
            advance(Duration::from_millis(300)).await;
            app.type_text("password", "Test@123").unwrap();
            app.click("submit").unwrap();
            advance(Duration::from_millis(400)).await;
            assert_eq!(app.current_url(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure() {
        let mut app = SimulatedSignInApp::new(AppBehavior {
            fail_navigation: true,
            ..AppBehavior::default()
        });
        let err = app.navigate("https://app.test/applynow").unwrap_err();
        assert!(err.aborts_run());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_element() {
        let mut app = loaded_sign_in().await;
        let err = app.type_text("password", "x").unwrap_err();
        assert!(err.to_string().contains("no longer attached"));
    }
}
