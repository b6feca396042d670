//! CLI configuration
//!
//! Precedence, lowest first: built-in defaults, the configuration file,
//! environment variables (through clap `env`), command-line flags.

use std::path::{Path, PathBuf};

use portero::{catalog, scenario, Scenario, SuiteConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::{RunArgs, SuiteArgs};
use crate::error::{CliError, CliResult};

/// Configuration file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "portero.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// From the `-q` flag and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Configuration file to read: the explicit one, else `./portero.yaml` if it
/// exists
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.is_file().then_some(default)
    })
}

/// Load the configuration file (or defaults) and apply suite-level flags
pub fn suite_config(args: &SuiteArgs) -> CliResult<SuiteConfig> {
    let mut config = match config_path(args.config.as_deref()) {
        Some(path) => {
            if !path.is_file() {
                return Err(CliError::config(format!(
                    "configuration file {} does not exist",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "loading configuration");
            SuiteConfig::load(&path)?
        }
        None => SuiteConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url.clone_from(base_url);
    }
    config.validate()?;
    Ok(config)
}

/// [`suite_config`] plus the run command's overrides
pub fn run_config(args: &RunArgs) -> CliResult<SuiteConfig> {
    let mut config = suite_config(&args.suite)?;
    if let Some(jobs) = args.jobs {
        config.runner.jobs = jobs;
    }
    if let Some(retries) = args.retries {
        config.runner.retries = retries;
    }
    if let Some(timeout) = args.scenario_timeout {
        if timeout == 0 {
            return Err(CliError::invalid_argument(
                "--scenario-timeout must be positive",
            ));
        }
        config.runner.scenario_timeout_ms = timeout;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(fixtures) = &args.fixtures {
        config.fixtures = Some(fixtures.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Scenarios to run: the scenario file or the built-in suite, then filtered
pub fn scenarios(args: &SuiteArgs, config: &SuiteConfig) -> CliResult<Vec<Scenario>> {
    let all = match &args.scenarios {
        Some(path) => scenario::load_scenarios(path)?,
        None => catalog::sign_in_suite(&config.messages),
    };
    let selected = catalog::filter(all, args.filter.as_deref());
    if selected.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no scenario matches {:?}",
            args.filter.as_deref().unwrap_or_default()
        )));
    }
    Ok(selected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::DriverArg;

    fn run_args(suite: SuiteArgs) -> RunArgs {
        RunArgs {
            suite,
            identifier: None,
            secret: None,
            fixtures: None,
            jobs: None,
            retries: None,
            scenario_timeout: None,
            driver: DriverArg::Mock,
            headed: false,
            report_dir: None,
        }
    }

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Debug);
            assert!(Verbosity::Debug.is_verbose());
            assert!(!Verbosity::Normal.is_quiet());
        }

        #[test]
        fn test_color_choice() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod precedence_tests {
        use super::*;

        #[test]
        fn test_file_then_flags() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("suite.yaml");
            std::fs::write(
                &path,
                "base_url: https://file.example.com\nrunner:\n  retries: 1\n  jobs: 2\n",
            )
            .unwrap();

            let suite = SuiteArgs {
                config: Some(path),
                ..SuiteArgs::default()
            };
            let config = run_config(&run_args(suite.clone())).unwrap();
            assert_eq!(config.base_url, "https://file.example.com");
            assert_eq!(config.runner.retries, 1);
            assert_eq!(config.runner.jobs, 2);

            let mut args = run_args(SuiteArgs {
                base_url: Some("https://flag.example.com".to_string()),
                ..suite
            });
            args.retries = Some(0);
            args.headed = true;
            let config = run_config(&args).unwrap();
            assert_eq!(config.base_url, "https://flag.example.com");
            assert_eq!(config.runner.retries, 0);
            assert_eq!(config.runner.jobs, 2);
            assert!(!config.browser.headless);
        }

        #[test]
        fn test_missing_explicit_file() {
            let suite = SuiteArgs {
                config: Some(PathBuf::from("/nonexistent/portero.yaml")),
                ..SuiteArgs::default()
            };
            let err = suite_config(&suite).unwrap_err();
            assert!(err.to_string().contains("does not exist"));
        }

        #[test]
        fn test_invalid_overrides() {
            let mut args = run_args(SuiteArgs::default());
            args.jobs = Some(0);
            assert!(run_config(&args).is_err());

            let mut args = run_args(SuiteArgs::default());
            args.scenario_timeout = Some(0);
            assert!(run_config(&args).is_err());

            let args = run_args(SuiteArgs {
                base_url: Some("localhost:3000".to_string()),
                ..SuiteArgs::default()
            });
            assert!(run_config(&args).is_err());
        }
    }

    mod scenario_selection_tests {
        use super::*;

        #[test]
        fn test_builtin_and_filter() {
            let config = SuiteConfig::default();
            let all = scenarios(&SuiteArgs::default(), &config).unwrap();
            assert_eq!(all.len(), 12);
            let args = SuiteArgs {
                filter: Some("TC-009".to_string()),
                ..SuiteArgs::default()
            };
            let one = scenarios(&args, &config).unwrap();
            assert_eq!(one.len(), 1);
            let args = SuiteArgs {
                filter: Some("nothing-matches".to_string()),
                ..SuiteArgs::default()
            };
            assert!(scenarios(&args, &config).is_err());
        }
    }
}
