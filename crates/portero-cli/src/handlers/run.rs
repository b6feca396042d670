//! Run command handler

use std::path::Path;
use std::sync::Arc;

use portero::{
    AppBehavior, ConsoleSink, Credential, CredentialResolver, FixtureStore, JsonSink, JunitSink,
    MockSessionFactory, ReportSink, RunReport, ScenarioRunner, SessionFactory, SuiteConfig,
    SuiteContext,
};
use tracing::{debug, info};

use crate::commands::{DriverArg, RunArgs};
use crate::config::{self, ColorChoice, Verbosity};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;

/// Credential given on the command line; a missing half comes from the
/// environment pair
#[must_use]
pub fn override_credential(
    identifier: Option<&str>,
    secret: Option<&str>,
    environment: &Credential,
) -> Option<Credential> {
    if identifier.is_none() && secret.is_none() {
        return None;
    }
    Some(Credential::new(
        identifier.unwrap_or(&environment.identifier),
        secret.unwrap_or(&environment.secret),
    ))
}

/// Fixtures from the configured file (or the built-in set), the environment
/// pair and the command-line override
pub fn build_resolver(args: &RunArgs, config: &SuiteConfig) -> CliResult<CredentialResolver> {
    let fixtures = match &config.fixtures {
        Some(path) => {
            debug!(path = %path.display(), "loading fixtures");
            FixtureStore::load(path)?
        }
        None => FixtureStore::builtin(),
    };
    let environment = Credential::from_env();
    let cli = override_credential(
        args.identifier.as_deref(),
        args.secret.as_deref(),
        &environment,
    );
    Ok(CredentialResolver::new(fixtures, environment).with_override(cli))
}

#[cfg(feature = "browser")]
async fn chromium(config: &SuiteConfig) -> CliResult<Arc<dyn SessionFactory>> {
    let factory = portero::ChromiumSessionFactory::launch(config.browser.clone()).await?;
    Ok(Arc::new(factory))
}

#[cfg(not(feature = "browser"))]
async fn chromium(_config: &SuiteConfig) -> CliResult<Arc<dyn SessionFactory>> {
    Err(CliError::config(
        "built without the browser feature; use --driver mock or rebuild with --features browser",
    ))
}

async fn session_factory(
    driver: DriverArg,
    config: &SuiteConfig,
) -> CliResult<Arc<dyn SessionFactory>> {
    match driver {
        DriverArg::Chromium => chromium(config).await,
        DriverArg::Mock => Ok(Arc::new(MockSessionFactory::with_behavior(AppBehavior {
            messages: config.messages.clone(),
            ..AppBehavior::default()
        }))),
    }
}

fn emit_reports(
    report: &RunReport,
    report_dir: Option<&Path>,
    verbosity: Verbosity,
    progress: &ProgressReporter,
) -> CliResult<()> {
    let mut sinks: Vec<Box<dyn ReportSink>> =
        vec![Box::new(ConsoleSink::stdout().verbose(verbosity.is_verbose()))];
    if let Some(dir) = report_dir {
        sinks.push(Box::new(JsonSink::in_dir(dir)));
        sinks.push(Box::new(JunitSink::in_dir(dir)));
    }
    for sink in &mut sinks {
        sink.emit(report)?;
        debug!(sink = sink.name(), "report emitted");
    }
    if let Some(dir) = report_dir {
        progress.info(&format!("reports written to {}", dir.display()));
    }
    Ok(())
}

/// Execute the run command.
///
/// Reports are emitted even when the run aborts; the result is then
/// `Err(RunAborted)`, or `Err(ScenariosFailed)` when scenarios failed.
pub async fn execute_run(
    args: &RunArgs,
    verbosity: Verbosity,
    color: ColorChoice,
) -> CliResult<RunReport> {
    let config = config::run_config(args)?;
    let scenarios = config::scenarios(&args.suite, &config)?;
    let resolver = build_resolver(args, &config)?;
    let context = Arc::new(SuiteContext::from_config(&config)?);
    info!(
        base_url = %config.base_url,
        driver = ?args.driver,
        scenarios = scenarios.len(),
        "starting run"
    );
    let factory = session_factory(args.driver, &config).await?;

    let mut progress = ProgressReporter::new(color.should_color(), verbosity);
    progress.start_progress(scenarios.len() as u64, "sign-in");
    let progress = Arc::new(progress);

    let runner = ScenarioRunner::new(factory, context, resolver)
        .with_config(config.runner)
        .with_observer(Arc::clone(&progress) as Arc<dyn portero::RunObserver>);
    let report = runner.run(&scenarios).await;
    progress.finish();

    emit_reports(&report, args.report_dir.as_deref(), verbosity, &progress)?;
    if let Some(cause) = &report.aborted {
        return Err(CliError::RunAborted {
            message: cause.clone(),
        });
    }
    if report.all_passed() {
        Ok(report)
    } else {
        Err(CliError::ScenariosFailed {
            failed: report.failed_count(),
            total: report.total(),
        })
    }
}
