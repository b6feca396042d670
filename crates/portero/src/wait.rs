//! Element Wait/Poll Engine
//!
//! Every interaction and verification in Portero goes through one primitive:
//! [`poll`] evaluates a [`Probe`] at a fixed interval until it reports ready or
//! the budget runs out. There are no fixed sleeps anywhere else.
//!
//! Time comes from `tokio::time`, so tests drive the engine on paused virtual
//! time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::driver::{BrowserDriver, ElementHandle};
use crate::locator::{Arity, Locator};
use crate::result::{ProbeError, ProbeResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for element waits (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Timeout for navigation and other critical waits (10 seconds)
pub const NAVIGATION_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// OPTIONS & CONDITIONS
// =============================================================================

/// Timeout and poll interval for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Total budget in milliseconds
    pub timeout_ms: u64,
    /// Interval between polls in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create options with a timeout and the default interval
    #[must_use]
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Options for navigation and other critical waits
    #[must_use]
    pub const fn critical() -> Self {
        Self::new(NAVIGATION_TIMEOUT_MS)
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Total budget
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval, never zero
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Predicate over the elements a locator resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// At least one matched element is visible
    Visible,
    /// At least one element matches, visible or not
    Attached,
    /// Nothing matches, or nothing matched is visible
    NotVisible,
    /// A visible matched element's text contains the string
    TextContains(String),
    /// At least n matched elements are visible
    CountAtLeast(usize),
    /// A visible matched element is enabled
    Enabled,
    /// A visible matched element is disabled
    Disabled,
}

impl Condition {
    /// Whether the condition can only hold when something matches
    #[must_use]
    pub const fn requires_presence(&self) -> bool {
        !matches!(self, Self::NotVisible)
    }

    /// Human-readable form used in errors and expectation results
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Visible => "visible".to_string(),
            Self::Attached => "attached".to_string(),
            Self::NotVisible => "not visible".to_string(),
            Self::TextContains(text) => format!("text contains {text:?}"),
            Self::CountAtLeast(n) => format!("at least {n} visible"),
            Self::Enabled => "enabled".to_string(),
            Self::Disabled => "disabled".to_string(),
        }
    }
}

/// Predicate over the current page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlCondition {
    /// URL contains the fragment
    Contains(String),
    /// URL does not contain the fragment
    NotContains(String),
    /// URL equals the string
    Equals(String),
    /// URL differs from the string
    NotEquals(String),
}

impl UrlCondition {
    /// Evaluate against a URL
    #[must_use]
    pub fn holds(&self, url: &str) -> bool {
        match self {
            Self::Contains(s) => url.contains(s.as_str()),
            Self::NotContains(s) => !url.contains(s.as_str()),
            Self::Equals(s) => url == s,
            Self::NotEquals(s) => url != s,
        }
    }

    /// Human-readable form used in errors and expectation results
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Contains(s) => format!("url contains {s:?}"),
            Self::NotContains(s) => format!("url does not contain {s:?}"),
            Self::Equals(s) => format!("url equals {s:?}"),
            Self::NotEquals(s) => format!("url differs from {s:?}"),
        }
    }
}

// =============================================================================
// PROBE & POLL
// =============================================================================

/// What a pending probe saw on its last evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// Summary of the observed state
    pub summary: String,
    /// Something matched the target
    pub resolved: bool,
    /// The target was found but disagreed with the expectation
    pub mismatch: bool,
}

impl Observation {
    /// Nothing matched
    #[must_use]
    pub fn unresolved(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            resolved: false,
            mismatch: false,
        }
    }

    /// Matched but not yet in the awaited state
    #[must_use]
    pub fn pending(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            resolved: true,
            mismatch: false,
        }
    }

    /// Matched and contradicting the expectation
    #[must_use]
    pub fn mismatch(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            resolved: true,
            mismatch: true,
        }
    }
}

/// Result of one probe evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Predicate holds
    Ready(T),
    /// Predicate does not hold yet
    Pending(Observation),
}

/// A predicate the engine can poll
#[async_trait]
pub trait Probe: Send + Sync {
    /// Value produced once the predicate holds
    type Output: Send;

    /// Evaluate once; driver errors abort the wait
    async fn check(&self, driver: &mut dyn BrowserDriver) -> ProbeResult<Check<Self::Output>>;

    /// Description of the awaited state
    fn describe(&self) -> String;

    /// Error to raise when the budget runs out
    fn on_expired(&self, last: &Observation, ever_resolved: bool, timeout_ms: u64) -> ProbeError {
        let _ = ever_resolved;
        ProbeError::timeout(self.describe(), timeout_ms, &last.summary)
    }
}

/// A satisfied wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    /// Value the probe produced
    pub value: T,
    /// Time from first evaluation to success
    pub elapsed: Duration,
    /// Number of evaluations
    pub attempts: u32,
}

/// Poll a probe until it is ready or the budget is spent.
///
/// The probe is evaluated immediately, then after every interval; the final
/// sleep is clipped to the remaining budget so expiry lands on the deadline.
pub async fn poll<P>(
    driver: &mut dyn BrowserDriver,
    probe: &P,
    options: &WaitOptions,
) -> ProbeResult<Polled<P::Output>>
where
    P: Probe + ?Sized,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0u32;
    let mut ever_resolved = false;

    loop {
        attempts += 1;
        match probe.check(&mut *driver).await? {
            Check::Ready(value) => {
                let elapsed = start.elapsed();
                trace!(
                    waiting_for = %probe.describe(),
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "wait satisfied"
                );
                return Ok(Polled {
                    value,
                    elapsed,
                    attempts,
                });
            }
            Check::Pending(observation) => {
                ever_resolved |= observation.resolved;
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    debug!(
                        waiting_for = %probe.describe(),
                        attempts,
                        last = %observation.summary,
                        "wait expired"
                    );
                    return Err(probe.on_expired(&observation, ever_resolved, options.timeout_ms));
                }
                sleep(options.poll_interval().min(timeout - elapsed)).await;
            }
        }
    }
}

// =============================================================================
// ELEMENT & URL PROBES
// =============================================================================

/// Elements a locator resolved to through one of its strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Index of the strategy that matched
    pub strategy: usize,
    /// Elements satisfying the condition
    pub elements: Vec<ElementHandle>,
}

impl Resolved {
    /// First satisfying element
    #[must_use]
    pub fn first(&self) -> Option<&ElementHandle> {
        self.elements.first()
    }
}

/// Probe for a locator under a condition
#[derive(Debug, Clone)]
pub struct ElementProbe<'a> {
    locator: &'a Locator,
    condition: Condition,
    strict: bool,
}

impl<'a> ElementProbe<'a> {
    /// Create a probe
    #[must_use]
    pub const fn new(locator: &'a Locator, condition: Condition) -> Self {
        Self {
            locator,
            condition,
            strict: false,
        }
    }

    /// Enforce the locator's arity (interaction targets)
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn evaluate(&self, strategy: usize, matched: Vec<ElementHandle>) -> Check<Resolved> {
        let via = self
            .locator
            .strategies
            .get(strategy)
            .map_or_else(String::new, ToString::to_string);

        let ready = |elements: Vec<ElementHandle>| {
            Check::Ready(Resolved {
                strategy,
                elements,
            })
        };

        if self.condition == Condition::Attached {
            return ready(matched);
        }
        let total = matched.len();
        let visible: Vec<ElementHandle> = matched.into_iter().filter(|e| e.visible).collect();

        match &self.condition {
            Condition::NotVisible => {
                if visible.is_empty() {
                    ready(Vec::new())
                } else {
                    Check::Pending(Observation::mismatch(format!(
                        "{} visible via `{via}`",
                        visible.len()
                    )))
                }
            }
            _ if visible.is_empty() => Check::Pending(Observation::pending(format!(
                "{total} element(s) via `{via}`, none visible"
            ))),
            _ if self.strict
                && self.locator.arity == Arity::ExactlyOne
                && visible.len() > 1 =>
            {
                Check::Pending(Observation::mismatch(format!(
                    "{} visible matches via `{via}`, expected exactly one",
                    visible.len()
                )))
            }
            Condition::Visible | Condition::Attached => ready(visible),
            Condition::TextContains(text) => {
                let texts: Vec<String> = visible.iter().map(|e| e.text.clone()).collect();
                let hits: Vec<ElementHandle> = visible
                    .into_iter()
                    .filter(|e| e.text.contains(text.as_str()))
                    .collect();
                if hits.is_empty() {
                    Check::Pending(Observation::mismatch(format!("text {texts:?}")))
                } else {
                    ready(hits)
                }
            }
            Condition::CountAtLeast(n) => {
                if visible.len() >= *n {
                    ready(visible)
                } else {
                    Check::Pending(Observation::mismatch(format!(
                        "{} visible via `{via}`",
                        visible.len()
                    )))
                }
            }
            Condition::Enabled | Condition::Disabled => {
                let want = self.condition == Condition::Enabled;
                let hits: Vec<ElementHandle> =
                    visible.into_iter().filter(|e| e.enabled == want).collect();
                if hits.is_empty() {
                    let state = if want { "disabled" } else { "enabled" };
                    Check::Pending(Observation::mismatch(format!("{state} via `{via}`")))
                } else {
                    ready(hits)
                }
            }
        }
    }
}

#[async_trait]
impl Probe for ElementProbe<'_> {
    type Output = Resolved;

    async fn check(&self, driver: &mut dyn BrowserDriver) -> ProbeResult<Check<Resolved>> {
        for (index, selector) in self.locator.strategies.iter().enumerate() {
            let matched = driver.query(selector).await?;
            if !matched.is_empty() {
                trace!(
                    locator = %self.locator.name,
                    strategy = index,
                    count = matched.len(),
                    "strategy matched"
                );
                return Ok(self.evaluate(index, matched));
            }
        }

        if self.condition == Condition::NotVisible {
            return Ok(Check::Ready(Resolved {
                strategy: 0,
                elements: Vec::new(),
            }));
        }
        Ok(Check::Pending(Observation::unresolved(format!(
            "no match across {} strateg{}",
            self.locator.strategies.len(),
            if self.locator.strategies.len() == 1 { "y" } else { "ies" }
        ))))
    }

    fn describe(&self) -> String {
        format!("{} {}", self.locator.name, self.condition.describe())
    }

    fn on_expired(&self, last: &Observation, ever_resolved: bool, timeout_ms: u64) -> ProbeError {
        if !ever_resolved && self.condition.requires_presence() {
            ProbeError::element_not_found(&self.locator.name, timeout_ms, &last.summary)
        } else if last.mismatch {
            ProbeError::assertion(self.describe(), &last.summary)
        } else {
            ProbeError::timeout(self.describe(), timeout_ms, &last.summary)
        }
    }
}

/// Probe for the current URL
#[derive(Debug, Clone)]
pub struct UrlProbe {
    condition: UrlCondition,
}

impl UrlProbe {
    /// Create a probe
    #[must_use]
    pub const fn new(condition: UrlCondition) -> Self {
        Self { condition }
    }
}

#[async_trait]
impl Probe for UrlProbe {
    type Output = String;

    async fn check(&self, driver: &mut dyn BrowserDriver) -> ProbeResult<Check<String>> {
        let url = driver.current_url().await?;
        if self.condition.holds(&url) {
            Ok(Check::Ready(url))
        } else {
            Ok(Check::Pending(Observation::mismatch(url)))
        }
    }

    fn describe(&self) -> String {
        self.condition.describe()
    }

    fn on_expired(&self, last: &Observation, _ever_resolved: bool, _timeout_ms: u64) -> ProbeError {
        ProbeError::assertion(self.describe(), &last.summary)
    }
}

/// Wait until a locator satisfies a condition
pub async fn await_condition(
    driver: &mut dyn BrowserDriver,
    locator: &Locator,
    condition: Condition,
    options: &WaitOptions,
) -> ProbeResult<Polled<Resolved>> {
    poll(driver, &ElementProbe::new(locator, condition), options).await
}

/// Wait until the URL satisfies a condition
pub async fn await_url(
    driver: &mut dyn BrowserDriver,
    condition: UrlCondition,
    options: &WaitOptions,
) -> ProbeResult<Polled<String>> {
    poll(driver, &UrlProbe::new(condition), options).await
}
