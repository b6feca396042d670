//! Portero: browser-driven verification of a two-phase sign-in flow
//!
//! Portero drives an identifier-then-secret sign-in surface through a narrow
//! [`BrowserDriver`] seam and checks that it behaves: valid credentials reach
//! the dashboard, everything else is refused on the entry surface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Scenario     │──►│ Auth flow     │──►│ Page objects │──►│ Wait / poll  │
//! │ runner       │   │ state machine │   │ (locators)   │   │ engine       │
//! └──────────────┘   └───────────────┘   └──────────────┘   └──────┬───────┘
//!        │                                                         │
//!        ▼                                                         ▼
//! ┌──────────────┐                                          ┌──────────────┐
//! │ Report sinks │                                          │ BrowserDriver│
//! └──────────────┘                                          │ CDP | mock   │
//!                                                           └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use portero::{catalog, CredentialResolver, MockSessionFactory, ScenarioRunner, SuiteConfig, SuiteContext};
//!
//! # async fn run() -> portero::ProbeResult<()> {
//! let config = SuiteConfig::default();
//! let context = Arc::new(SuiteContext::from_config(&config)?);
//! let suite = catalog::sign_in_suite(&config.messages);
//! let report = ScenarioRunner::new(
//!     Arc::new(MockSessionFactory::new()),
//!     context,
//!     CredentialResolver::default(),
//! )
//! .with_config(config.runner)
//! .run(&suite)
//! .await;
//! assert!(report.all_passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod auth_flow;
#[cfg(feature = "browser")]
pub mod browser;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod expectation;
pub mod fixture;
pub mod locator;
pub mod mock;
pub mod page_object;
pub mod pages;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod wait;

pub use auth_flow::{transition, AuthEvent, AuthFlowDriver, AuthSessionState};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumSessionFactory};
pub use config::{Messages, SuiteConfig, Surfaces};
pub use driver::{BrowserDriver, DriverConfig, ElementHandle};
pub use expectation::{ExpectationResult, Outcome};
pub use fixture::{Credential, CredentialResolver, FixtureStore};
pub use locator::{Arity, Locator, LocatorRegistry, Selector};
pub use mock::{AppBehavior, MockBrowser, MockSessionFactory};
pub use page_object::{PageObject, UrlMatcher};
pub use pages::{DashboardPage, SignInPage};
pub use reporter::{ConsoleSink, JsonSink, JunitSink, ReportSink};
pub use result::{FailureKind, ProbeError, ProbeResult};
pub use runner::{
    RunObserver, RunReport, RunnerConfig, ScenarioReport, ScenarioRunner, ScenarioStatus,
    SessionFactory,
};
pub use scenario::{CredentialSource, Scenario, ScenarioKind, Step};
pub use session::{Budget, Session, SuiteContext};
pub use wait::{poll, Condition, UrlCondition, WaitOptions};
