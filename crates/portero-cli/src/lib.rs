//! Portero CLI library
//!
//! Argument parsing, configuration layering, progress output and the command
//! handlers behind the `portero` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
pub mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ConfigFormat, DriverArg, ListArgs, RunArgs, SuiteArgs,
};
pub use config::{ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
