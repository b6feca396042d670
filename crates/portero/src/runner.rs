//! Scenario runner.
//!
//! Each scenario gets its own session from a [`SessionFactory`]. Every attempt
//! starts with a session reset and a fresh visit to the entry surface, is
//! bounded by the scenario timeout (and the run deadline, when set), and ends
//! fail-fast at the first unmet expectation. Failed attempts are retried; a
//! scenario that passes after a failure is reported flaky. A `DriverError`
//! aborts the whole run: scenarios still in flight are dropped and the report
//! holds what finished, the aborting scenario included.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth_flow::{AuthFlowDriver, AuthSessionState};
use crate::expectation::ExpectationResult;
use crate::fixture::{Credential, CredentialResolver};
use crate::result::{FailureKind, ProbeError, ProbeResult};
use crate::scenario::{Scenario, ScenarioKind};
use crate::session::{millis_since, Session, SuiteContext};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Retry, timeout and parallelism settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Re-executions after a failed attempt
    pub retries: u32,
    /// Upper bound for one attempt, in milliseconds
    pub scenario_timeout_ms: u64,
    /// Upper bound for the whole run, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_timeout_ms: Option<u64>,
    /// Scenarios in flight at once, each with its own session
    pub jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            scenario_timeout_ms: 60_000,
            run_timeout_ms: None,
            jobs: 1,
        }
    }
}

impl RunnerConfig {
    /// Attempts allowed per scenario
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

// =============================================================================
// SEAMS
// =============================================================================

/// Opens an isolated session (own cookies and storage) per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a session bound to the run context
    async fn open(&self, context: Arc<SuiteContext>) -> ProbeResult<Session>;

    /// Release shared resources once the run is over
    async fn shutdown(&self) -> ProbeResult<()> {
        Ok(())
    }
}

/// Progress callbacks; every method defaults to a no-op
pub trait RunObserver: Send + Sync {
    /// A scenario is about to run its first attempt
    fn scenario_started(&self, _scenario: &Scenario) {}

    /// An attempt failed and another one follows
    fn attempt_failed(&self, _scenario: &Scenario, _attempt: u32, _error: &ProbeError) {}

    /// A scenario has its final report
    fn scenario_finished(&self, _report: &ScenarioReport) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl RunObserver for SilentObserver {}

// =============================================================================
// REPORTS
// =============================================================================

/// Final status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Some attempt passed
    Passed,
    /// Every attempt failed; the last one on an expectation or setup
    Failed,
    /// Every attempt failed; the last one ran out of time
    Timeout,
}

impl ScenarioStatus {
    /// Label for summaries
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one scenario across its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario id
    pub id: String,
    /// Scenario title
    pub title: String,
    /// Positive or negative
    pub kind: ScenarioKind,
    /// Where the credential came from
    pub credential: String,
    /// Final status
    pub status: ScenarioStatus,
    /// Attempts made; zero when the scenario could not be prepared
    pub attempts: u32,
    /// Passed only after at least one failed attempt
    pub flaky: bool,
    /// Auth state at the end of the last attempt, unless it timed out
    pub terminal_state: Option<AuthSessionState>,
    /// Failure category of the last attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Error message of the last attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Expectations of the last attempt; a failed attempt ends with exactly one
    /// failing entry
    pub expectations: Vec<ExpectationResult>,
    /// Wall time across attempts, in milliseconds
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Whether the scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Terminal failing expectation, if any
    #[must_use]
    pub fn failing_expectation(&self) -> Option<&ExpectationResult> {
        self.expectations.iter().find(|e| !e.passed())
    }
}

/// Result of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run id
    pub run_id: Uuid,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Application under test
    pub base_url: String,
    /// Scenario reports, in the order the scenarios were given
    pub scenarios: Vec<ScenarioReport>,
    /// Wall time, in milliseconds
    pub duration_ms: u64,
    /// Why the run stopped early, when it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl RunReport {
    /// Scenarios run
    #[must_use]
    pub fn total(&self) -> usize {
        self.scenarios.len()
    }

    /// Scenarios that passed, flaky ones included
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    /// Scenarios that did not pass
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.total() - self.passed_count()
    }

    /// Scenarios that passed after a failed attempt
    #[must_use]
    pub fn flaky_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.flaky).count()
    }

    /// Whether the run completed and every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.aborted.is_none() && self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Whether a driver failure stopped the run early
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Scenarios that did not pass
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios.iter().filter(|s| !s.passed()).collect()
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}/{} passed, {} failed, {} flaky in {:.1}s",
            self.passed_count(),
            self.total(),
            self.failed_count(),
            self.flaky_count(),
            Duration::from_millis(self.duration_ms).as_secs_f64()
        );
        if let Some(cause) = &self.aborted {
            line.push_str(&format!(" (aborted: {cause})"));
        }
        line
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Runs scenarios against sessions from a factory
pub struct ScenarioRunner {
    factory: Arc<dyn SessionFactory>,
    context: Arc<SuiteContext>,
    resolver: Arc<CredentialResolver>,
    config: RunnerConfig,
    observer: Arc<dyn RunObserver>,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("base_url", &self.context.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

struct Attempt {
    state: Option<AuthSessionState>,
    error: Option<ProbeError>,
    expectations: Vec<ExpectationResult>,
}

impl Attempt {
    /// No attempt was made; one failing expectation names the step that broke
    fn setup(description: &str, error: ProbeError) -> Self {
        let expectations = vec![ExpectationResult::from_error(
            description,
            &error,
            Duration::ZERO,
        )];
        Self {
            state: None,
            error: Some(error),
            expectations,
        }
    }
}

impl ScenarioRunner {
    /// Create a runner with default settings and no observer
    #[must_use]
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        context: Arc<SuiteContext>,
        resolver: CredentialResolver,
    ) -> Self {
        Self {
            factory,
            context,
            resolver: Arc::new(resolver),
            config: RunnerConfig::default(),
            observer: Arc::new(SilentObserver),
        }
    }

    /// Replace the runner settings
    #[must_use]
    pub const fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a progress observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runner settings
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every scenario; reports come back in input order.
    ///
    /// A driver failure stops the run: the report then holds the scenarios
    /// that finished, ends with the one that hit the failure and carries the
    /// cause in [`RunReport::aborted`].
    pub async fn run(&self, scenarios: &[Scenario]) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = self
            .config
            .run_timeout_ms
            .map(|ms| start + Duration::from_millis(ms));
        let jobs = self.config.jobs.max(1);
        info!(%run_id, base_url = %self.context.base_url, scenarios = scenarios.len(), jobs, "run started");

        let mut pending = stream::iter(scenarios.iter().enumerate())
            .map(|(index, scenario)| async move {
                (index, self.run_scenario(scenario, deadline).await)
            })
            .buffer_unordered(jobs);

        let mut reports: Vec<(usize, ScenarioReport)> = Vec::with_capacity(scenarios.len());
        let mut aborted = None;
        while let Some((index, report)) = pending.next().await {
            let fatal = report.failure.is_some_and(FailureKind::aborts_run);
            if fatal {
                let cause = report
                    .error
                    .clone()
                    .unwrap_or_else(|| FailureKind::DriverError.to_string());
                warn!(%run_id, scenario = %report.id, error = %cause, "run aborted");
                aborted = Some(cause);
            }
            reports.push((index, report));
            if fatal {
                break;
            }
        }
        drop(pending);
        self.shutdown_factory().await;

        reports.sort_by_key(|(index, _)| *index);
        let report = RunReport {
            run_id,
            started_at,
            base_url: self.context.base_url.clone(),
            scenarios: reports.into_iter().map(|(_, r)| r).collect(),
            duration_ms: millis_since(start),
            aborted,
        };
        info!(%run_id, summary = %report.summary(), "run finished");
        report
    }

    async fn shutdown_factory(&self) {
        if let Err(e) = self.factory.shutdown().await {
            warn!(error = %e, "session factory shutdown failed");
        }
    }

    /// Run one scenario with retries in a session of its own.
    ///
    /// A driver failure ends the scenario without further retries; its
    /// report has `failure: Some(FailureKind::DriverError)`.
    pub async fn run_scenario(
        &self,
        scenario: &Scenario,
        run_deadline: Option<Instant>,
    ) -> ScenarioReport {
        let start = Instant::now();
        self.observer.scenario_started(scenario);

        let credential = match self.resolver.resolve(&scenario.credential) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(scenario = %scenario.id, error = %e, "scenario could not be prepared");
                return self.finish(scenario, Attempt::setup("prepare credential", e), 0, false, start);
            }
        };

        let mut session = match self.factory.open(Arc::clone(&self.context)).await {
            Ok(session) => session,
            Err(e) => {
                warn!(scenario = %scenario.id, error = %e, "session could not be opened");
                return self.finish(scenario, Attempt::setup("open session", e), 0, false, start);
            }
        };
        let max_attempts = self.config.max_attempts();
        let mut attempt_no = 0;
        let mut had_failure = false;

        let last = loop {
            attempt_no += 1;
            let mut attempt = self
                .attempt(&mut session, scenario, credential.as_ref(), run_deadline)
                .await;
            let Some(error) = attempt.error.take() else {
                break attempt;
            };
            let out_of_time = run_deadline.is_some_and(|d| Instant::now() >= d);
            if error.aborts_run() || attempt_no >= max_attempts || out_of_time {
                attempt.error = Some(error);
                break attempt;
            }
            warn!(scenario = %scenario.id, attempt = attempt_no, error = %error, "attempt failed, retrying");
            self.observer.attempt_failed(scenario, attempt_no, &error);
            had_failure = true;
        };

        if let Err(e) = session.close().await {
            warn!(scenario = %scenario.id, error = %e, "session close failed");
        }
        self.finish(scenario, last, attempt_no, had_failure, start)
    }

    async fn attempt(
        &self,
        session: &mut Session,
        scenario: &Scenario,
        credential: Option<&Credential>,
        run_deadline: Option<Instant>,
    ) -> Attempt {
        let start = Instant::now();
        let budget = Duration::from_millis(self.config.scenario_timeout_ms);
        let deadline = match run_deadline {
            Some(run) => (start + budget).min(run),
            None => start + budget,
        };

        let outcome =
            tokio::time::timeout_at(deadline, execute(session, scenario, credential)).await;
        let (state, result) = match outcome {
            Ok((state, result)) => (Some(state), result),
            Err(_) => {
                let budget_ms = deadline.saturating_duration_since(start).as_millis() as u64;
                (
                    None,
                    Err(ProbeError::timeout(
                        format!("scenario {}", scenario.id),
                        budget_ms,
                        "attempt still running",
                    )),
                )
            }
        };

        let mut expectations = session.take_journal();
        let error = result.err();
        if let Some(e) = &error {
            expectations.push(ExpectationResult::from_error(
                e.to_string(),
                e,
                start.elapsed(),
            ));
        }
        Attempt {
            state,
            error,
            expectations,
        }
    }

    fn finish(
        &self,
        scenario: &Scenario,
        attempt: Attempt,
        attempts: u32,
        had_failure: bool,
        start: Instant,
    ) -> ScenarioReport {
        let (status, failure, error) = match &attempt.error {
            None => (ScenarioStatus::Passed, None, None),
            Some(e) => {
                let kind = e.kind();
                let status = if kind == FailureKind::Timeout {
                    ScenarioStatus::Timeout
                } else {
                    ScenarioStatus::Failed
                };
                (status, Some(kind), Some(e.to_string()))
            }
        };
        let expectations = attempt.expectations;

        let report = ScenarioReport {
            id: scenario.id.clone(),
            title: scenario.title.clone(),
            kind: scenario.kind,
            credential: scenario.credential.label(),
            status,
            attempts,
            flaky: status == ScenarioStatus::Passed && had_failure,
            terminal_state: attempt.state,
            failure,
            error,
            expectations,
            duration_ms: millis_since(start),
        };
        match report.status {
            ScenarioStatus::Passed if report.flaky => {
                warn!(scenario = %report.id, attempts, "scenario passed after retry");
            }
            ScenarioStatus::Passed => {
                info!(scenario = %report.id, attempts, duration_ms = report.duration_ms, "scenario passed");
            }
            _ => {
                warn!(
                    scenario = %report.id,
                    status = %report.status,
                    failure = ?report.failure,
                    "scenario failed"
                );
            }
        }
        self.observer.scenario_finished(&report);
        report
    }
}

/// Reset the session, open the entry surface and run the steps
async fn execute(
    session: &mut Session,
    scenario: &Scenario,
    credential: Option<&Credential>,
) -> (AuthSessionState, ProbeResult<()>) {
    if let Err(e) = session.reset().await {
        return (AuthSessionState::AwaitingIdentifier, Err(e));
    }
    let mut flow = AuthFlowDriver::new(session);
    if let Err(e) = flow.open().await {
        return (flow.state(), Err(e));
    }
    match scenario.execute(&mut flow, credential).await {
        Ok(state) => (state, Ok(())),
        Err(e) => (flow.state(), Err(e)),
    }
}
