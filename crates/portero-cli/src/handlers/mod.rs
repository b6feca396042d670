//! Command handlers
//!
//! Each handler builds its configuration from the parsed arguments, does the
//! work and writes to stdout. Rendering helpers are pure so they can be tested
//! without a terminal.

pub mod config;
pub mod list;
pub mod run;

pub use config::{execute_config, render_config};
pub use list::{execute_list, render_list};
pub use run::{build_resolver, execute_run, override_credential};
