//! `BrowserDriver` over the simulated application, with call history.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::driver::{BrowserDriver, ElementHandle};
use crate::locator::Selector;
use crate::mock::app::{AppBehavior, SimulatedSignInApp};
use crate::mock::dom::select;
use crate::result::{ProbeError, ProbeResult};

#[derive(Debug, Default)]
struct BrowserState {
    app: SimulatedSignInApp,
    call_history: Vec<String>,
    queries: usize,
    closed: bool,
}

/// Mock browser for unit tests and dry runs.
///
/// Clones share one page, so a test can keep a [`MockBrowser::handle`] after
/// handing the browser to a session and inspect the calls it received.
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl MockBrowser {
    /// Create a mock browser with the default application
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock browser with custom application behavior
    #[must_use]
    pub fn with_behavior(behavior: AppBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrowserState {
                app: SimulatedSignInApp::new(behavior),
                ..BrowserState::default()
            })),
        }
    }

    /// Shared handle for inspection
    #[must_use]
    pub fn handle(&self) -> Self {
        self.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of selector queries served
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.lock().queries
    }

    /// Whether the application currently holds a session cookie or token
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.lock().app.has_session()
    }

    fn call<T>(
        &self,
        entry: String,
        f: impl FnOnce(&mut SimulatedSignInApp) -> ProbeResult<T>,
    ) -> ProbeResult<T> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProbeError::driver(format!("{entry}: browser is closed")));
        }
        state.call_history.push(entry);
        f(&mut state.app)
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.call(format!("navigate:{url}"), |app| app.navigate(url))
    }

    async fn query(&mut self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProbeError::driver("query: browser is closed"));
        }
        state.queries += 1;
        let elements = state.app.elements();
        Ok(select(&elements, selector)
            .into_iter()
            .map(|e| e.handle())
            .collect())
    }

    async fn type_text(&mut self, element_id: &str, text: &str) -> ProbeResult<()> {
        self.call(format!("type_text:{element_id}"), |app| {
            app.type_text(element_id, text)
        })
    }

    async fn clear(&mut self, element_id: &str) -> ProbeResult<()> {
        self.call(format!("clear:{element_id}"), |app| app.clear(element_id))
    }

    async fn click(&mut self, element_id: &str) -> ProbeResult<()> {
        self.call(format!("click:{element_id}"), |app| app.click(element_id))
    }

    async fn clear_cookies(&mut self) -> ProbeResult<()> {
        self.call("clear_cookies".to_string(), |app| {
            app.clear_cookies();
            Ok(())
        })
    }

    async fn clear_local_storage(&mut self) -> ProbeResult<()> {
        self.call("clear_local_storage".to_string(), |app| {
            app.clear_local_storage();
            Ok(())
        })
    }

    async fn clear_session_storage(&mut self) -> ProbeResult<()> {
        self.call("clear_session_storage".to_string(), |app| {
            app.clear_session_storage();
            Ok(())
        })
    }

    async fn current_url(&mut self) -> ProbeResult<String> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProbeError::driver("current_url: browser is closed"));
        }
        Ok(state.app.current_url())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        let mut state = self.lock();
        state.call_history.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}
