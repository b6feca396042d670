//! Credential sources: fixture files and the process environment.
//!
//! Credentials are loaded once per run and never mutated afterwards. A
//! fixture file is either a flat map of scenario tag to credential, or the
//! `users` shape with a `validUser` entry and a list of `invalidUsers`
//! labelled by scenario.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::result::{ProbeError, ProbeResult};
use crate::scenario::CredentialSource;

/// Environment variable holding the identifier
pub const ENV_IDENTIFIER: &str = "TEST_EMAIL";
/// Environment variable holding the secret
pub const ENV_SECRET: &str = "TEST_PASSWORD";
/// Identifier used when the environment has none
pub const DEFAULT_IDENTIFIER: &str = "test@example.com";
/// Secret used when the environment has none
pub const DEFAULT_SECRET: &str = "Test@123";

/// Well-known scenario tags
pub mod tags {
    /// Account that signs in successfully
    pub const VALID_USER: &str = "valid-user";
    /// Known identifier with the wrong secret
    pub const WRONG_PASSWORD: &str = "wrong-password";
    /// Well-formed identifier the backend does not know
    pub const NON_EXISTENT_USER: &str = "non-existent-user";
    /// Credentials read from the environment
    pub const ENVIRONMENT: &str = "environment";
    /// Credentials written inline in a scenario
    pub const LITERAL: &str = "literal";
}

/// An identifier/secret pair for one scenario
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Identifier (email)
    pub identifier: String,
    /// Secret (password)
    pub secret: String,
    /// Tag the credential was stored under
    #[serde(default)]
    pub scenario_tag: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("scenario_tag", &self.scenario_tag)
            .finish()
    }
}

impl Credential {
    /// Create an untagged credential
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            scenario_tag: String::new(),
        }
    }

    /// Set the scenario tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.scenario_tag = tag.into();
        self
    }

    /// Read `TEST_EMAIL` / `TEST_PASSWORD` through a lookup, with defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let identifier = lookup(ENV_IDENTIFIER)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string());
        let secret = lookup(ENV_SECRET)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SECRET.to_string());
        Self::new(identifier, secret).with_tag(tags::ENVIRONMENT)
    }

    /// Read the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Load a `.env` file from the working directory or its parents, if any
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            Some(path)
        }
        Err(_) => None,
    }
}

/// Kebab-case tag for a human scenario label ("Wrong password" → "wrong-password")
#[must_use]
pub fn tag_for(label: &str) -> String {
    label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

// =============================================================================
// FIXTURE FILES
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawCredential {
    #[serde(alias = "email")]
    identifier: String,
    #[serde(alias = "password", default)]
    secret: String,
}

#[derive(Debug, Deserialize)]
struct RawInvalidUser {
    #[serde(alias = "email")]
    identifier: String,
    #[serde(alias = "password", default)]
    secret: String,
    scenario: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersFixture {
    valid_user: RawCredential,
    #[serde(default)]
    invalid_users: Vec<RawInvalidUser>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Users(UsersFixture),
    Flat(BTreeMap<String, RawCredential>),
}

/// Fixture file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

impl FixtureFormat {
    /// Format implied by a file extension; JSON unless `.yaml` / `.yml`
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Scenario tag → credential, read-only once loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureStore {
    credentials: BTreeMap<String, Credential>,
}

impl FixtureStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store used when no fixture file is given
    #[must_use]
    pub fn builtin() -> Self {
        let mut store = Self::new();
        store.insert(tags::VALID_USER, Credential::new(DEFAULT_IDENTIFIER, DEFAULT_SECRET));
        store.insert(tags::WRONG_PASSWORD, Credential::new(DEFAULT_IDENTIFIER, "WrongPass"));
        store.insert(
            tags::NON_EXISTENT_USER,
            Credential::new("nonexistent.user@example.com", DEFAULT_SECRET),
        );
        store
    }

    /// Parse fixture text
    pub fn parse(content: &str, format: FixtureFormat) -> ProbeResult<Self> {
        let file: FixtureFile = match format {
            FixtureFormat::Json => serde_json::from_str(content)?,
            FixtureFormat::Yaml => serde_yaml_ng::from_str(content)?,
        };

        let mut store = Self::new();
        match file {
            FixtureFile::Users(users) => {
                store.insert(
                    tags::VALID_USER,
                    Credential::new(users.valid_user.identifier, users.valid_user.secret),
                );
                for user in users.invalid_users {
                    let tag = tag_for(&user.scenario);
                    if tag.is_empty() {
                        return Err(ProbeError::fixture(format!(
                            "invalid user {} has an empty scenario label",
                            user.identifier
                        )));
                    }
                    store.insert(&tag, Credential::new(user.identifier, user.secret));
                }
            }
            FixtureFile::Flat(map) => {
                for (tag, raw) in map {
                    store.insert(&tag_for(&tag), Credential::new(raw.identifier, raw.secret));
                }
            }
        }
        if store.is_empty() {
            return Err(ProbeError::fixture("fixture file holds no credentials"));
        }
        Ok(store)
    }

    /// Load a fixture file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::fixture(format!("cannot read {}: {e}", path.display()))
        })?;
        let store = Self::parse(&content, FixtureFormat::from_path(path))?;
        debug!(path = %path.display(), count = store.len(), "loaded fixtures");
        Ok(store)
    }

    /// Store a credential under a tag, replacing any previous one
    pub fn insert(&mut self, tag: &str, credential: Credential) {
        self.credentials
            .insert(tag.to_string(), credential.with_tag(tag));
    }

    /// Credential for a tag
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Credential> {
        self.credentials.get(tag)
    }

    /// Credential for a tag, or a fixture error
    pub fn require(&self, tag: &str) -> ProbeResult<&Credential> {
        self.get(tag).ok_or_else(|| {
            ProbeError::fixture(format!(
                "no credential tagged {tag:?} (known: {})",
                self.tags().join(", ")
            ))
        })
    }

    /// Known tags, sorted
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.credentials.keys().map(String::as_str).collect()
    }

    /// Number of credentials
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolves a scenario's credential source against the run's stores
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    fixtures: FixtureStore,
    environment: Credential,
    override_credential: Option<Credential>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(FixtureStore::builtin(), Credential::from_env())
    }
}

impl CredentialResolver {
    /// Create a resolver
    #[must_use]
    pub fn new(fixtures: FixtureStore, environment: Credential) -> Self {
        Self {
            fixtures,
            environment,
            override_credential: None,
        }
    }

    /// Replace the default identifier/secret pair (environment and valid user)
    #[must_use]
    pub fn with_override(mut self, credential: Option<Credential>) -> Self {
        self.override_credential = credential;
        self
    }

    /// Fixture store in use
    #[must_use]
    pub fn fixtures(&self) -> &FixtureStore {
        &self.fixtures
    }

    fn default_pair(&self) -> Credential {
        self.override_credential
            .clone()
            .unwrap_or_else(|| self.environment.clone())
    }

    /// Credential for a source; `None` when the scenario takes no credential
    pub fn resolve(&self, source: &CredentialSource) -> ProbeResult<Option<Credential>> {
        let credential = match source {
            CredentialSource::None => return Ok(None),
            CredentialSource::Environment => self.default_pair().with_tag(tags::ENVIRONMENT),
            CredentialSource::Fixture { tag, fallback } => {
                if tag == tags::VALID_USER {
                    if let Some(credential) = &self.override_credential {
                        return Ok(Some(credential.clone().with_tag(tag.as_str())));
                    }
                }
                match (self.fixtures.get(tag), fallback) {
                    (Some(credential), _) => credential.clone(),
                    (None, true) => self.default_pair().with_tag(tag.as_str()),
                    (None, false) => self.fixtures.require(tag)?.clone(),
                }
            }
            CredentialSource::Literal { identifier, secret } => Credential::new(
                identifier.clone().unwrap_or_default(),
                secret.clone().unwrap_or_default(),
            )
            .with_tag(tags::LITERAL),
        };
        Ok(Some(credential))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod credential_tests {
        use super::*;

        #[test]
        fn test_debug_redacts_secret() {
            let credential = Credential::new("test@example.com", "Test@123");
            let printed = format!("{credential:?}");
            assert!(printed.contains("test@example.com"));
            assert!(!printed.contains("Test@123"));
            assert!(printed.contains("<redacted>"));
        }

        #[test]
        fn test_from_lookup_defaults() {
            let credential = Credential::from_lookup(|_| None);
            assert_eq!(credential.identifier, DEFAULT_IDENTIFIER);
            assert_eq!(credential.secret, DEFAULT_SECRET);
            assert_eq!(credential.scenario_tag, tags::ENVIRONMENT);
        }

        #[test]
        fn test_from_lookup_reads_variables() {
            let credential = Credential::from_lookup(|key| match key {
                ENV_IDENTIFIER => Some("ci@example.com".to_string()),
                ENV_SECRET => Some(String::new()),
                _ => None,
            });
            assert_eq!(credential.identifier, "ci@example.com");
            assert_eq!(credential.secret, DEFAULT_SECRET);
        }

        #[test]
        fn test_tag_for() {
            assert_eq!(tag_for("Wrong password"), "wrong-password");
            assert_eq!(tag_for("Non-existent user"), "non-existent-user");
            assert_eq!(tag_for("validUser"), "validuser");
            assert_eq!(tag_for("  "), "");
        }
    }

    mod store_tests {
        use super::*;
        use std::io::Write;

        const USERS_JSON: &str = r#"{
            "validUser": { "email": "student@example.com", "password": "S3cret!" },
            "invalidUsers": [
                { "email": "student@example.com", "password": "nope", "scenario": "Wrong password" },
                { "email": "ghost@example.com", "password": "x", "scenario": "Non-existent user" }
            ]
        }"#;

        #[test]
        fn test_users_shape() {
            let store = FixtureStore::parse(USERS_JSON, FixtureFormat::Json).unwrap();
            assert_eq!(
                store.tags(),
                vec!["non-existent-user", "valid-user", "wrong-password"]
            );
            let wrong = store.require(tags::WRONG_PASSWORD).unwrap();
            assert_eq!(wrong.secret, "nope");
            assert_eq!(wrong.scenario_tag, tags::WRONG_PASSWORD);
        }

        #[test]
        fn test_flat_yaml_shape() {
            let yaml = "valid-user:\n  identifier: a@example.com\n  secret: pw\nLocked Out:\n  email: b@example.com\n";
            let store = FixtureStore::parse(yaml, FixtureFormat::Yaml).unwrap();
            assert_eq!(store.get("locked-out").unwrap().secret, "");
            assert_eq!(store.get(tags::VALID_USER).unwrap().identifier, "a@example.com");
        }

        #[test]
        fn test_empty_and_malformed_files() {
            let err = FixtureStore::parse("{}", FixtureFormat::Json).unwrap_err();
            assert_eq!(err.kind(), crate::result::FailureKind::Setup);
            assert!(FixtureStore::parse("[1, 2]", FixtureFormat::Json).is_err());
        }

        #[test]
        fn test_load_by_extension() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("users.json");
            std::fs::File::create(&path)
                .unwrap()
                .write_all(USERS_JSON.as_bytes())
                .unwrap();
            let store = FixtureStore::load(&path).unwrap();
            assert_eq!(store.len(), 3);
            assert!(FixtureStore::load(&dir.path().join("missing.json")).is_err());
        }

        #[test]
        fn test_require_lists_known_tags() {
            let err = FixtureStore::builtin().require("locked-out").unwrap_err();
            assert!(err.to_string().contains("valid-user"));
        }
    }

    mod resolver_tests {
        use super::*;

        fn resolver() -> CredentialResolver {
            CredentialResolver::new(
                FixtureStore::builtin(),
                Credential::new("env@example.com", "EnvPass1").with_tag(tags::ENVIRONMENT),
            )
        }

        #[test]
        fn test_sources() {
            let resolver = resolver();
            assert!(resolver.resolve(&CredentialSource::None).unwrap().is_none());
            let env = resolver
                .resolve(&CredentialSource::Environment)
                .unwrap()
                .unwrap();
            assert_eq!(env.identifier, "env@example.com");
            let wrong = resolver
                .resolve(&CredentialSource::fixture(tags::WRONG_PASSWORD))
                .unwrap()
                .unwrap();
            assert_eq!(wrong.secret, "WrongPass");
            let literal = resolver
                .resolve(&CredentialSource::Literal {
                    identifier: Some("' OR '1'='1".to_string()),
                    secret: None,
                })
                .unwrap()
                .unwrap();
            assert_eq!(literal.identifier, "' OR '1'='1");
            assert_eq!(literal.secret, "");
        }

        #[test]
        fn test_missing_fixture_falls_back_or_fails() {
            let resolver = CredentialResolver::new(
                FixtureStore::new(),
                Credential::new("env@example.com", "EnvPass1"),
            );
            let fallback = resolver
                .resolve(&CredentialSource::fixture(tags::VALID_USER))
                .unwrap()
                .unwrap();
            assert_eq!(fallback.identifier, "env@example.com");
            assert_eq!(fallback.scenario_tag, tags::VALID_USER);
            let strict = CredentialSource::Fixture {
                tag: tags::WRONG_PASSWORD.to_string(),
                fallback: false,
            };
            assert!(resolver.resolve(&strict).is_err());
        }

        #[test]
        fn test_override_replaces_default_pair() {
            let resolver =
                resolver().with_override(Some(Credential::new("cli@example.com", "CliPass1")));
            for source in [
                CredentialSource::Environment,
                CredentialSource::fixture(tags::VALID_USER),
            ] {
                let credential = resolver.resolve(&source).unwrap().unwrap();
                assert_eq!(credential.identifier, "cli@example.com");
            }
            let wrong = resolver
                .resolve(&CredentialSource::fixture(tags::WRONG_PASSWORD))
                .unwrap()
                .unwrap();
            assert_eq!(wrong.identifier, DEFAULT_IDENTIFIER);
        }
    }
}
