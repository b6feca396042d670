//! Suite configuration: application surfaces, expected messages, wait budgets,
//! runner and browser settings.
//!
//! Loaded from `portero.yaml`; every section is optional and falls back to
//! the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::driver::DriverConfig;
use crate::locator::LocatorRegistry;
use crate::page_object::UrlMatcher;
use crate::pages;
use crate::result::{ProbeError, ProbeResult};
use crate::runner::RunnerConfig;
use crate::wait::WaitOptions;

/// Default base URL of the application under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

/// Which surface a URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// The identifier/secret entry surface
    SignIn,
    /// The authenticated landing surface
    Dashboard,
    /// Anything else
    Other,
}

/// URL paths of the surfaces the flow moves between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surfaces {
    /// Entry surface path, relative to the base URL
    pub sign_in_path: String,
    /// Authenticated landing path
    pub dashboard_path: String,
}

impl Default for Surfaces {
    fn default() -> Self {
        Self {
            sign_in_path: "applynow".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

impl Surfaces {
    /// Absolute URL of the entry surface
    #[must_use]
    pub fn sign_in_url(&self, base_url: &str) -> String {
        join_url(base_url, &self.sign_in_path)
    }

    /// Absolute URL of the landing surface
    #[must_use]
    pub fn dashboard_url(&self, base_url: &str) -> String {
        join_url(base_url, &self.dashboard_path)
    }

    /// Classify a URL by its path
    #[must_use]
    pub fn classify(&self, url: &str) -> Surface {
        if UrlMatcher::new(&self.sign_in_path).matches_prefix(url) {
            Surface::SignIn
        } else if UrlMatcher::new(&self.dashboard_path).matches_prefix(url) {
            Surface::Dashboard
        } else {
            Surface::Other
        }
    }

    /// Whether a URL is on the entry surface
    #[must_use]
    pub fn is_sign_in(&self, url: &str) -> bool {
        self.classify(url) == Surface::SignIn
    }
}

/// Join a base URL and a relative path with exactly one slash
#[must_use]
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Message texts the application shows.
///
/// These are test data for the application under test, not engine contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Shown when the secret does not match
    pub invalid_credentials: String,
    /// Shown when a well-formed identifier is unknown
    pub unknown_identifier: String,
    /// Shown under a malformed or empty identifier
    pub invalid_identifier: String,
    /// Greeting on the entry surface
    pub welcome_back: String,
    /// Greeting on the landing surface
    pub dashboard_welcome: String,
    /// Entry surface title
    pub sign_in_title: String,
    /// Dashboard heading
    pub dashboard_title: String,
    /// Display name of the signed-in account, when known
    pub user_name: Option<String>,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            invalid_credentials: "Invalid Credentials".to_string(),
            unknown_identifier: "Failed to get student".to_string(),
            invalid_identifier: "Invalid Email".to_string(),
            welcome_back: "Welcome back".to_string(),
            dashboard_welcome: "Welcome to".to_string(),
            sign_in_title: "Log in".to_string(),
            dashboard_title: "Your application steps".to_string(),
            user_name: None,
        }
    }
}

/// Complete suite configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Base URL of the application under test
    pub base_url: String,
    /// Surface paths
    pub surfaces: Surfaces,
    /// Expected message texts
    pub messages: Messages,
    /// Budget for ordinary element waits
    pub waits: WaitOptions,
    /// Budget for navigation and post-submit waits
    pub critical_waits: WaitOptions,
    /// Runner settings
    pub runner: RunnerConfig,
    /// Browser settings
    pub browser: DriverConfig,
    /// Selector chain overrides by locator name
    pub locators: BTreeMap<String, String>,
    /// Fixture file with credentials
    pub fixtures: Option<PathBuf>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            surfaces: Surfaces::default(),
            messages: Messages::default(),
            waits: WaitOptions::default(),
            critical_waits: WaitOptions::critical(),
            runner: RunnerConfig::default(),
            browser: DriverConfig::default(),
            locators: BTreeMap::new(),
            fixtures: None,
        }
    }
}

impl SuiteConfig {
    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check invariants the engine relies on
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.surfaces.sign_in_path.trim_matches('/').is_empty() {
            return Err(ProbeError::config("surfaces.sign_in_path must not be empty"));
        }
        if self.waits.timeout_ms == 0 || self.critical_waits.timeout_ms == 0 {
            return Err(ProbeError::config("wait timeouts must be positive"));
        }
        if self.runner.jobs == 0 {
            return Err(ProbeError::config("runner.jobs must be at least 1"));
        }
        Ok(())
    }

    /// Default locators for every page, with configured overrides applied
    pub fn build_registry(&self) -> ProbeResult<LocatorRegistry> {
        let mut registry = pages::default_registry(&self.messages);
        registry.apply_overrides(&self.locators)?;
        Ok(registry)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod surfaces_tests {
        use super::*;

        #[test]
        fn test_urls() {
            let surfaces = Surfaces::default();
            assert_eq!(
                surfaces.sign_in_url("https://app.test/"),
                "https://app.test/applynow"
            );
            assert_eq!(
                surfaces.dashboard_url("https://app.test"),
                "https://app.test/dashboard"
            );
        }

        #[test]
        fn test_classify() {
            let surfaces = Surfaces::default();
            assert_eq!(surfaces.classify("https://app.test/applynow"), Surface::SignIn);
            assert_eq!(
                surfaces.classify("https://app.test/dashboard/documents"),
                Surface::Dashboard
            );
            assert_eq!(surfaces.classify("https://app.test/"), Surface::Other);
            assert!(surfaces.is_sign_in("https://app.test/applynow?step=2"));
            assert!(!surfaces.is_sign_in("https://app.test/dashboard"));
        }
    }

    mod suite_config_tests {
        use super::*;

        #[test]
        fn test_defaults_validate() {
            let config = SuiteConfig::default();
            config.validate().unwrap();
            assert_eq!(config.runner.retries, 2);
            assert_eq!(config.critical_waits.timeout_ms, 10_000);
            assert_eq!(config.messages.invalid_credentials, "Invalid Credentials");
        }

        #[test]
        fn test_partial_yaml() {
            let yaml = r#"
base_url: https://staging.app.test/
messages:
  user_name: Test User
waits:
  timeout_ms: 3000
locators:
  sign_in.submit_button: "testid=signin-button"
"#;
            let config = SuiteConfig::from_yaml_str(yaml).unwrap();
            assert_eq!(config.base_url, "https://staging.app.test/");
            assert_eq!(config.messages.user_name.as_deref(), Some("Test User"));
            assert_eq!(config.messages.unknown_identifier, "Failed to get student");
            assert_eq!(config.waits.timeout_ms, 3000);
            assert_eq!(config.waits.poll_interval_ms, 100);

            let registry = config.build_registry().unwrap();
            assert_eq!(
                registry.resolve("sign_in.submit_button").unwrap().chain(),
                "testid=signin-button"
            );
        }

        #[test]
        fn test_rejects_bad_base_url() {
            let err = SuiteConfig::from_yaml_str("base_url: ftp://x\n").unwrap_err();
            assert!(err.to_string().contains("base_url"));
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("portero.yaml");
            std::fs::write(&path, "runner:\n  retries: 0\n").unwrap();
            let config = SuiteConfig::load(&path).unwrap();
            assert_eq!(config.runner.retries, 0);

            let missing = SuiteConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
            assert!(missing.to_string().contains("nope.yaml"));
        }

        #[test]
        fn test_yaml_output_round_trips_defaults() {
            let yaml = SuiteConfig::default().to_yaml().unwrap();
            assert!(yaml.contains("sign_in_path: applynow"));
        }
    }
}
