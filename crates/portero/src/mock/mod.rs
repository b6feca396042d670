//! In-process browser double.
//!
//! [`SimulatedSignInApp`] renders the sign-in and dashboard surfaces as flat
//! element lists, [`MockBrowser`] exposes it through `BrowserDriver`, and
//! [`MockSessionFactory`] hands every scenario a fresh browser. Server checks
//! are modeled as virtual-time delays so the whole engine can be exercised
//! under `#[tokio::test(start_paused = true)]`.

pub mod app;
pub mod browser;
pub mod dom;

pub use app::{is_well_formed_identifier, Account, AppBehavior, SimulatedSignInApp};
pub use browser::MockBrowser;
pub use dom::{select, MockElement};

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::result::ProbeResult;
use crate::runner::SessionFactory;
use crate::session::{Session, SuiteContext};

/// Opens sessions backed by independent [`MockBrowser`]s
#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    behavior: AppBehavior,
    opened: Arc<Mutex<Vec<MockBrowser>>>,
}

impl MockSessionFactory {
    /// Factory with the default application
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose browsers run a custom application
    #[must_use]
    pub fn with_behavior(behavior: AppBehavior) -> Self {
        Self {
            behavior,
            opened: Arc::default(),
        }
    }

    /// Handles to every browser opened so far
    #[must_use]
    pub fn browsers(&self) -> Vec<MockBrowser> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn open(&self, context: Arc<SuiteContext>) -> ProbeResult<Session> {
        let browser = MockBrowser::with_behavior(self.behavior.clone());
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(browser.handle());
        Ok(Session::new(Box::new(browser), context))
    }
}
