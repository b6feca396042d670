//! Browser session: one driver plus the run-wide context it is verified
//! against.
//!
//! Page objects borrow the session mutably for the duration of a scenario.
//! Every wait goes through [`crate::wait::poll`]; passing expectations are
//! journaled here and handed to the runner when the scenario ends.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::{join_url, Messages, SuiteConfig, Surfaces};
use crate::driver::BrowserDriver;
use crate::expectation::ExpectationResult;
use crate::locator::{Locator, LocatorRegistry};
use crate::pages;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{
    poll, Check, Condition, ElementProbe, Polled, Probe, Resolved, UrlCondition, UrlProbe,
    WaitOptions,
};

/// Read-only context shared by every session of a run
#[derive(Debug, Clone)]
pub struct SuiteContext {
    /// Base URL of the application under test
    pub base_url: String,
    /// Surface paths
    pub surfaces: Surfaces,
    /// Expected message texts
    pub messages: Messages,
    /// Locators for every page
    pub registry: LocatorRegistry,
    /// Budget for ordinary waits
    pub waits: WaitOptions,
    /// Budget for navigation and post-submit waits
    pub critical_waits: WaitOptions,
}

impl SuiteContext {
    /// Build the context from a validated configuration
    pub fn from_config(config: &SuiteConfig) -> ProbeResult<Self> {
        config.validate()?;
        Ok(Self {
            base_url: config.base_url.clone(),
            surfaces: config.surfaces.clone(),
            messages: config.messages.clone(),
            registry: config.build_registry()?,
            waits: config.waits,
            critical_waits: config.critical_waits,
        })
    }

    /// Locator for a name; unknown names resolve to an empty chain
    #[must_use]
    pub fn locator(&self, name: &str) -> Locator {
        self.registry
            .resolve(name)
            .cloned()
            .unwrap_or_else(|| Locator::new(name, Vec::new()))
    }

    /// Absolute URL for a path under the base URL
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl Default for SuiteContext {
    fn default() -> Self {
        let messages = Messages::default();
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            surfaces: Surfaces::default(),
            registry: pages::default_registry(&messages),
            messages,
            waits: WaitOptions::default(),
            critical_waits: WaitOptions::critical(),
        }
    }
}

/// Wait budget selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Ordinary element wait
    Normal,
    /// Navigation or post-submit wait
    Critical,
}

/// A live browser session
pub struct Session {
    driver: Box<dyn BrowserDriver>,
    context: Arc<SuiteContext>,
    journal: Vec<ExpectationResult>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.context.base_url)
            .field("journal", &self.journal.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap a driver
    #[must_use]
    pub fn new(driver: Box<dyn BrowserDriver>, context: Arc<SuiteContext>) -> Self {
        Self {
            driver,
            context,
            journal: Vec::new(),
        }
    }

    /// Shared context
    #[must_use]
    pub fn context(&self) -> &SuiteContext {
        &self.context
    }

    /// Wait options for a budget
    #[must_use]
    pub fn options(&self, budget: Budget) -> WaitOptions {
        match budget {
            Budget::Normal => self.context.waits,
            Budget::Critical => self.context.critical_waits,
        }
    }

    /// Clear cookies, local storage, session storage and the journal
    pub async fn reset(&mut self) -> ProbeResult<()> {
        self.driver.clear_cookies().await?;
        self.driver.clear_local_storage().await?;
        self.driver.clear_session_storage().await?;
        self.journal.clear();
        debug!("session reset");
        Ok(())
    }

    /// Navigate to a path under the base URL
    pub async fn goto(&mut self, path: &str) -> ProbeResult<()> {
        let url = self.context.url(path);
        debug!(%url, "navigate");
        self.driver.navigate(&url).await
    }

    /// Current page URL
    pub async fn current_url(&mut self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    /// Poll any probe against this session's driver
    pub async fn wait_for<P>(&mut self, probe: &P, budget: Budget) -> ProbeResult<Polled<P::Output>>
    where
        P: Probe + ?Sized,
    {
        let options = self.options(budget);
        poll(self.driver.as_mut(), probe, &options).await
    }

    /// Evaluate a probe exactly once
    pub async fn check_once<P>(&mut self, probe: &P) -> ProbeResult<Check<P::Output>>
    where
        P: Probe + ?Sized,
    {
        probe.check(self.driver.as_mut()).await
    }

    /// Wait for a registered locator to satisfy a condition and journal the pass
    pub async fn expect(
        &mut self,
        name: &str,
        condition: Condition,
        budget: Budget,
    ) -> ProbeResult<Resolved> {
        let locator = self.context.locator(name);
        self.expect_locator(&locator, condition, budget).await
    }

    /// Wait for an ad-hoc locator to satisfy a condition and journal the pass
    pub async fn expect_locator(
        &mut self,
        locator: &Locator,
        condition: Condition,
        budget: Budget,
    ) -> ProbeResult<Resolved> {
        let description = format!("{} {}", locator.name, condition.describe());
        let expected = condition.describe();
        let polled = self
            .wait_for(&ElementProbe::new(locator, condition), budget)
            .await?;
        let observed = format!(
            "{} element(s) via strategy {}",
            polled.value.elements.len(),
            polled.value.strategy + 1
        );
        self.record_pass(description, expected, observed, polled.elapsed);
        Ok(polled.value)
    }

    /// Wait for the URL to satisfy a condition and journal the pass
    pub async fn expect_url(
        &mut self,
        condition: UrlCondition,
        budget: Budget,
    ) -> ProbeResult<String> {
        let description = condition.describe();
        let polled = self
            .wait_for(&UrlProbe::new(condition), budget)
            .await?;
        self.record_pass(
            description.clone(),
            description,
            polled.value.clone(),
            polled.elapsed,
        );
        Ok(polled.value)
    }

    /// Whether a locator currently has a visible match, without waiting
    pub async fn is_present(&mut self, name: &str) -> ProbeResult<bool> {
        let locator = self.context.locator(name);
        let check = self
            .check_once(&ElementProbe::new(&locator, Condition::Visible))
            .await?;
        Ok(matches!(check, Check::Ready(_)))
    }

    async fn actionable(&mut self, name: &str, condition: Condition) -> ProbeResult<String> {
        let locator = self.context.locator(name);
        let polled = self
            .wait_for(
                &ElementProbe::new(&locator, condition).strict(true),
                Budget::Normal,
            )
            .await?;
        polled
            .value
            .first()
            .map(|e| e.id.clone())
            .ok_or_else(|| ProbeError::element_not_found(name, self.context.waits.timeout_ms, "empty match"))
    }

    /// Replace a field's value
    pub async fn fill(&mut self, name: &str, text: &str) -> ProbeResult<()> {
        let id = self.actionable(name, Condition::Visible).await?;
        trace!(locator = name, chars = text.chars().count(), "fill");
        self.driver.clear(&id).await?;
        if !text.is_empty() {
            self.driver.type_text(&id, text).await?;
        }
        Ok(())
    }

    /// Clear a field
    pub async fn clear(&mut self, name: &str) -> ProbeResult<()> {
        let id = self.actionable(name, Condition::Visible).await?;
        trace!(locator = name, "clear");
        self.driver.clear(&id).await
    }

    /// Click an element once it is visible and enabled
    pub async fn click(&mut self, name: &str) -> ProbeResult<()> {
        let id = self.actionable(name, Condition::Enabled).await?;
        trace!(locator = name, "click");
        self.driver.click(&id).await
    }

    /// Record a passing expectation
    pub fn record_pass(
        &mut self,
        description: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
        elapsed: Duration,
    ) {
        self.journal.push(ExpectationResult::pass(
            description,
            expected,
            observed,
            elapsed,
        ));
    }

    /// Passing expectations recorded since the last reset
    #[must_use]
    pub fn journal(&self) -> &[ExpectationResult] {
        &self.journal
    }

    /// Take the journal, leaving it empty
    pub fn take_journal(&mut self) -> Vec<ExpectationResult> {
        std::mem::take(&mut self.journal)
    }

    /// Close the underlying driver
    pub async fn close(mut self) -> ProbeResult<()> {
        self.driver.close().await
    }
}

/// Milliseconds since an instant, for log fields
pub(crate) fn millis_since(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
