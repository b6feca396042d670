//! Progress reporting on stderr

use console::{style, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use portero::{ProbeError, RunObserver, Scenario, ScenarioReport, ScenarioStatus};

use crate::config::Verbosity;

/// Scenario progress: a bar while the run is in flight, one line per
/// finished scenario
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Output level
    pub verbosity: Verbosity,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, Verbosity::Normal)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, verbosity: Verbosity) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            verbosity,
        }
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }

        let pb = ProgressBar::new(total);
        if !self.term.is_term() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) if !pb.is_hidden() => pb.println(text),
            _ => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn prefix(&self, status: ScenarioStatus, flaky: bool) -> String {
        let (plain, styled) = match (status, flaky) {
            (ScenarioStatus::Passed, false) => ("PASS", style("✓").green().bold()),
            (ScenarioStatus::Passed, true) => ("FLAKY", style("~").yellow().bold()),
            (ScenarioStatus::Failed, _) => ("FAIL", style("✗").red().bold()),
            (ScenarioStatus::Timeout, _) => ("TIME", style("⏱").red().bold()),
        };
        if self.use_color {
            styled.to_string()
        } else {
            plain.to_string()
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        self.line(&format!("{prefix} {message}"));
    }
}

impl RunObserver for ProgressReporter {
    fn scenario_started(&self, scenario: &Scenario) {
        if self.verbosity.is_verbose() {
            self.line(&format!("  → {} {}", scenario.id, scenario.title));
        }
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(scenario.id.clone());
        }
    }

    fn attempt_failed(&self, scenario: &Scenario, attempt: u32, error: &ProbeError) {
        if self.verbosity.is_verbose() {
            self.warning(&format!(
                "{} attempt {attempt} failed: {error}",
                scenario.id
            ));
        }
    }

    fn scenario_finished(&self, report: &ScenarioReport) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
        // Failures print even in quiet mode
        if self.verbosity.is_quiet() && report.passed() {
            return;
        }
        let mut text = format!(
            "{} {} {}",
            self.prefix(report.status, report.flaky),
            report.id,
            report.title
        );
        if report.attempts > 1 {
            text.push_str(&format!(" ({} attempts)", report.attempts));
        }
        text.push_str(&format!(" {}ms", report.duration_ms));
        self.line(&text);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_quiet_skips_progress_bar() {
            let mut reporter = ProgressReporter::new(false, Verbosity::Quiet);
            reporter.start_progress(12, "sign-in");
            assert!(reporter.progress_bar.is_none());
        }

        #[test]
        fn test_plain_prefixes() {
            let reporter = ProgressReporter::new(false, Verbosity::Normal);
            assert_eq!(reporter.prefix(ScenarioStatus::Passed, false), "PASS");
            assert_eq!(reporter.prefix(ScenarioStatus::Passed, true), "FLAKY");
            assert_eq!(reporter.prefix(ScenarioStatus::Failed, false), "FAIL");
            assert_eq!(reporter.prefix(ScenarioStatus::Timeout, false), "TIME");
        }

        #[test]
        fn test_progress_counts_finished_scenarios() {
            let mut reporter = ProgressReporter::new(false, Verbosity::Normal);
            reporter.start_progress(3, "sign-in");
            let report = ScenarioReport {
                id: "TC-001".to_string(),
                title: "Valid sign-in".to_string(),
                kind: portero::ScenarioKind::Positive,
                credential: "valid-user".to_string(),
                status: ScenarioStatus::Passed,
                attempts: 1,
                flaky: false,
                terminal_state: None,
                failure: None,
                error: None,
                expectations: Vec::new(),
                duration_ms: 12,
            };
            reporter.scenario_finished(&report);
            reporter.scenario_finished(&report);
            assert_eq!(reporter.progress_bar.as_ref().unwrap().position(), 2);
            reporter.finish();
        }
    }
}
