//! Structured log output

use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;

/// Default filter directive for a verbosity level
#[must_use]
pub const fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info,portero=debug",
        Verbosity::Debug => "debug,portero=trace",
    }
}

/// Install the global subscriber on stderr; `RUST_LOG` wins over `-v`
pub fn init(verbosity: Verbosity, use_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_target(verbosity == Verbosity::Debug)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::Debug,
        ] {
            let directive = default_directive(verbosity);
            assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
        }
    }
}
