//! Report sinks for finished runs.
//!
//! - [`ConsoleSink`]: per-scenario lines and a summary, to any writer
//! - [`JsonSink`]: the full [`RunReport`] as pretty JSON
//! - [`JunitSink`]: JUnit XML for CI

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::result::ProbeResult;
use crate::runner::{RunReport, ScenarioReport, ScenarioStatus};

/// Default JSON report file name
pub const JSON_REPORT_FILE: &str = "portero-report.json";

/// Default JUnit report file name
pub const JUNIT_REPORT_FILE: &str = "portero-junit.xml";

/// Destination for a finished run
pub trait ReportSink {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Emit the report
    fn emit(&mut self, report: &RunReport) -> ProbeResult<()>;
}

// =============================================================================
// CONSOLE
// =============================================================================

/// Plain-text summary
#[derive(Debug)]
pub struct ConsoleSink<W: Write> {
    out: W,
    verbose: bool,
}

impl ConsoleSink<std::io::Stdout> {
    /// Summary on stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Summary on any writer
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self {
            out,
            verbose: false,
        }
    }

    /// Also list every expectation of failed scenarios
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One line for a scenario: marker, id, title, attempts and failure kind
#[must_use]
pub fn scenario_line(report: &ScenarioReport) -> String {
    let marker = match report.status {
        ScenarioStatus::Passed if report.flaky => "FLAKY",
        ScenarioStatus::Passed => "PASS",
        ScenarioStatus::Failed => "FAIL",
        ScenarioStatus::Timeout => "TIME",
    };
    let mut line = format!("{marker:<5} {} {}", report.id, report.title);
    if report.attempts > 1 {
        line.push_str(&format!(" ({} attempts)", report.attempts));
    }
    if let Some(kind) = report.failure {
        line.push_str(&format!(" [{kind}]"));
    }
    line
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn emit(&mut self, report: &RunReport) -> ProbeResult<()> {
        writeln!(self.out, "Run {} against {}", report.run_id, report.base_url)?;
        for scenario in &report.scenarios {
            writeln!(self.out, "  {}", scenario_line(scenario))?;
            if scenario.passed() {
                continue;
            }
            if let Some(error) = &scenario.error {
                writeln!(self.out, "        {error}")?;
            }
            if self.verbose {
                for expectation in &scenario.expectations {
                    writeln!(
                        self.out,
                        "        - {:?} {}",
                        expectation.outcome, expectation.description
                    )?;
                }
            }
        }
        writeln!(self.out, "{}", report.summary())?;
        self.out.flush()?;
        Ok(())
    }
}

// =============================================================================
// FILES
// =============================================================================

/// Pretty JSON file
#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    /// Write to a file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write [`JSON_REPORT_FILE`] inside a directory
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(JSON_REPORT_FILE))
    }

    /// Target path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn emit(&mut self, report: &RunReport) -> ProbeResult<()> {
        ensure_parent(&self.path)?;
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "wrote JSON report");
        Ok(())
    }
}

/// JUnit XML file
#[derive(Debug, Clone)]
pub struct JunitSink {
    path: PathBuf,
    suite_name: String,
}

impl JunitSink {
    /// Write to a file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            suite_name: "portero".to_string(),
        }
    }

    /// Write [`JUNIT_REPORT_FILE`] inside a directory
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(JUNIT_REPORT_FILE))
    }

    /// Set the `testsuite` name
    #[must_use]
    pub fn with_suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Target path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JunitSink {
    fn name(&self) -> &'static str {
        "junit"
    }

    fn emit(&mut self, report: &RunReport) -> ProbeResult<()> {
        ensure_parent(&self.path)?;
        std::fs::write(&self.path, render_junit(report, &self.suite_name))?;
        debug!(path = %self.path.display(), "wrote JUnit report");
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> ProbeResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn seconds(ms: u64) -> f64 {
    Duration::from_millis(ms).as_secs_f64()
}

/// Render JUnit XML; timeouts count as errors, other failures as failures
#[must_use]
pub fn render_junit(report: &RunReport, suite_name: &str) -> String {
    let errors = report
        .scenarios
        .iter()
        .filter(|s| s.status == ScenarioStatus::Timeout)
        .count();
    let failures = report.failed_count() - errors;

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="{}" tests="{}" failures="{failures}" errors="{errors}" time="{:.3}" timestamp="{}">"#,
        escape_xml(suite_name),
        report.total(),
        seconds(report.duration_ms),
        report.started_at.to_rfc3339()
    ));
    xml.push('\n');

    for scenario in &report.scenarios {
        xml.push_str(&format!(
            r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
            escape_xml(&format!("{suite_name}.{:?}", scenario.kind).to_lowercase()),
            escape_xml(&format!("{} {}", scenario.id, scenario.title)),
            seconds(scenario.duration_ms)
        ));
        xml.push('\n');

        let message = scenario.error.as_deref().unwrap_or_default();
        match scenario.status {
            ScenarioStatus::Passed => {}
            ScenarioStatus::Failed => {
                let kind = scenario.failure.map(|k| k.as_str()).unwrap_or_default();
                xml.push_str(&format!(
                    r#"    <failure type="{kind}" message="{}">{}</failure>"#,
                    escape_xml(message),
                    escape_xml(message)
                ));
                xml.push('\n');
            }
            ScenarioStatus::Timeout => {
                xml.push_str(&format!(
                    r#"    <error type="Timeout" message="{}">{}</error>"#,
                    escape_xml(message),
                    escape_xml(message)
                ));
                xml.push('\n');
            }
        }
        if scenario.flaky || scenario.attempts > 1 {
            xml.push_str(&format!(
                "    <system-out>attempts: {}, flaky: {}</system-out>\n",
                scenario.attempts, scenario.flaky
            ));
        }

        xml.push_str("  </testcase>\n");
    }

    xml.push_str("</testsuite>\n");
    xml
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth_flow::AuthSessionState;
    use crate::expectation::ExpectationResult;
    use crate::result::{FailureKind, ProbeError};
    use crate::scenario::ScenarioKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn scenario(id: &str, status: ScenarioStatus, attempts: u32, flaky: bool) -> ScenarioReport {
        let (failure, error, expectations) = match status {
            ScenarioStatus::Passed => (
                None,
                None,
                vec![ExpectationResult::pass(
                    "auth state is authenticated",
                    "authenticated",
                    "authenticated",
                    Duration::ZERO,
                )],
            ),
            ScenarioStatus::Failed => {
                let err = ProbeError::assertion("state <authenticated>", "rejected & stuck");
                (
                    Some(FailureKind::AssertionFailed),
                    Some(err.to_string()),
                    vec![ExpectationResult::from_error(err.to_string(), &err, Duration::ZERO)],
                )
            }
            ScenarioStatus::Timeout => {
                let err = ProbeError::timeout("scenario T", 3_000, "attempt still running");
                (
                    Some(FailureKind::Timeout),
                    Some(err.to_string()),
                    vec![ExpectationResult::from_error(err.to_string(), &err, Duration::ZERO)],
                )
            }
        };
        ScenarioReport {
            id: id.to_string(),
            title: format!("scenario {id}"),
            kind: ScenarioKind::Negative,
            credential: "none".to_string(),
            status,
            attempts,
            flaky,
            terminal_state: Some(AuthSessionState::Rejected),
            failure,
            error,
            expectations,
            duration_ms: 1_500,
        }
    }

    fn report() -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            base_url: "http://localhost:3000".to_string(),
            scenarios: vec![
                scenario("TC-001", ScenarioStatus::Passed, 1, false),
                scenario("TC-002", ScenarioStatus::Passed, 2, true),
                scenario("TC-003", ScenarioStatus::Failed, 3, false),
                scenario("TC-004", ScenarioStatus::Timeout, 1, false),
            ],
            duration_ms: 6_000,
            aborted: None,
        }
    }

    mod console_tests {
        use super::*;

        #[test]
        fn test_console_summary() {
            let mut sink = ConsoleSink::new(Vec::new()).verbose(true);
            sink.emit(&report()).unwrap();
            let text = String::from_utf8(sink.into_inner()).unwrap();
            assert!(text.contains("PASS  TC-001"));
            assert!(text.contains("FLAKY TC-002 scenario TC-002 (2 attempts)"));
            assert!(text.contains("FAIL  TC-003 scenario TC-003 (3 attempts) [AssertionFailed]"));
            assert!(text.contains("TIME  TC-004 scenario TC-004 [Timeout]"));
            assert!(text.contains("- Fail"));
            assert!(text.contains("2/4 passed, 2 failed, 1 flaky in 6.0s"));
        }

        #[test]
        fn test_console_names_abort_cause() {
            let mut aborted = report();
            aborted.aborted = Some("Driver error: browser closed".to_string());
            let mut sink = ConsoleSink::new(Vec::new());
            sink.emit(&aborted).unwrap();
            let text = String::from_utf8(sink.into_inner()).unwrap();
            assert!(text.contains("TC-004"));
            assert!(text.contains("(aborted: Driver error: browser closed)"));
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_json_sink_round_trips() {
            let dir = tempfile::tempdir().unwrap();
            let mut sink = JsonSink::in_dir(&dir.path().join("reports"));
            let original = report();
            sink.emit(&original).unwrap();
            let content = std::fs::read_to_string(sink.path()).unwrap();
            let parsed: RunReport = serde_json::from_str(&content).unwrap();
            assert_eq!(parsed.run_id, original.run_id);
            assert_eq!(parsed.scenarios, original.scenarios);
            assert!(content.contains("\"terminal_state\": \"rejected\""));
            assert!(content.contains("\"failure\": \"assertion_failed\""));
        }

        #[test]
        fn test_junit_counts_and_escaping() {
            let xml = render_junit(&report(), "sign-in");
            assert!(xml.contains(r#"tests="4" failures="1" errors="1""#));
            assert!(xml.contains(r#"<failure type="AssertionFailed""#));
            assert!(xml.contains(r#"<error type="Timeout""#));
            assert!(xml.contains("&lt;authenticated&gt;"));
            assert!(xml.contains("rejected &amp; stuck"));
            assert!(xml.contains("<system-out>attempts: 2, flaky: true</system-out>"));
            assert!(xml.contains(r#"classname="sign-in.negative""#));
            assert_eq!(xml.matches("<testcase ").count(), 4);
        }

        #[test]
        fn test_junit_sink_writes_file() {
            let dir = tempfile::tempdir().unwrap();
            let mut sink = JunitSink::in_dir(dir.path()).with_suite_name("portero-ci");
            sink.emit(&report()).unwrap();
            let xml = std::fs::read_to_string(dir.path().join(JUNIT_REPORT_FILE)).unwrap();
            assert!(xml.starts_with("<?xml"));
            assert!(xml.contains(r#"<testsuite name="portero-ci""#));
        }
    }
}
