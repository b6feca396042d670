//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Portero: verify a two-phase sign-in flow in a real or simulated browser
#[derive(Parser, Debug)]
#[command(name = "portero")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sign-in suite
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Options shared by every subcommand that builds a configuration
#[derive(Args, Debug, Clone, Default)]
pub struct SuiteArgs {
    /// Configuration file (defaults to ./portero.yaml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the application under test
    #[arg(long, env = "PORTERO_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Scenario file replacing the built-in suite
    #[arg(long, value_name = "FILE")]
    pub scenarios: Option<PathBuf>,

    /// Only scenarios whose id, title or tag matches
    #[arg(long, value_name = "PATTERN")]
    pub filter: Option<String>,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Suite selection and configuration
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Identifier for the valid-user and environment credentials
    #[arg(long, value_name = "IDENTIFIER")]
    pub identifier: Option<String>,

    /// Secret for the valid-user and environment credentials
    #[arg(long, value_name = "SECRET")]
    pub secret: Option<String>,

    /// Fixture file (JSON or YAML) with tagged credentials
    #[arg(long, value_name = "FILE")]
    pub fixtures: Option<PathBuf>,

    /// Scenarios in flight at once
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Re-executions after a failed attempt
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Upper bound for one scenario attempt, in milliseconds
    #[arg(long, value_name = "MS")]
    pub scenario_timeout: Option<u64>,

    /// Browser implementation
    #[arg(long, value_enum, default_value = "chromium")]
    pub driver: DriverArg,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Directory for JSON and JUnit reports
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Suite selection and configuration
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Also print every step
    #[arg(long)]
    pub steps: bool,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Suite selection and configuration
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Browser implementation
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverArg {
    /// Chromium over the DevTools protocol
    Chromium,
    /// In-process simulated application
    Mock,
}

/// Configuration output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML
    #[default]
    Yaml,
    /// JSON
    Json,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_run_defaults() {
            let cli = Cli::parse_from(["portero", "run"]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.driver, DriverArg::Chromium);
            assert!(args.jobs.is_none());
            assert!(args.retries.is_none());
            assert!(!args.headed);
        }

        #[test]
        fn test_run_flags() {
            let cli = Cli::parse_from([
                "portero",
                "run",
                "--base-url",
                "https://staging.example.com",
                "--identifier",
                "qa@example.com",
                "--secret",
                "s3cret",
                "--jobs",
                "4",
                "--retries",
                "0",
                "--driver",
                "mock",
                "--filter",
                "TC-00",
                "--report-dir",
                "out",
            ]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(
                args.suite.base_url.as_deref(),
                Some("https://staging.example.com")
            );
            assert_eq!(args.identifier.as_deref(), Some("qa@example.com"));
            assert_eq!(args.jobs, Some(4));
            assert_eq!(args.retries, Some(0));
            assert_eq!(args.driver, DriverArg::Mock);
            assert_eq!(args.suite.filter.as_deref(), Some("TC-00"));
            assert_eq!(args.report_dir, Some(PathBuf::from("out")));
        }

        #[test]
        fn test_global_flags() {
            let cli = Cli::parse_from(["portero", "-vv", "--color", "never", "list"]);
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.color, ColorArg::Never));
            let cli = Cli::parse_from(["portero", "list", "--quiet"]);
            assert!(cli.quiet);
        }

        #[test]
        fn test_config_format() {
            let cli = Cli::parse_from(["portero", "config", "--format", "json"]);
            let Commands::Config(args) = cli.command else {
                panic!("expected config");
            };
            assert_eq!(args.format, ConfigFormat::Json);
        }

        #[test]
        fn test_unknown_driver_rejected() {
            assert!(Cli::try_parse_from(["portero", "run", "--driver", "firefox"]).is_err());
        }
    }
}
