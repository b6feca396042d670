//! Portero CLI: verify a two-phase sign-in flow
//!
//! ## Usage
//!
//! ```bash
//! portero run                              # Full suite in Chromium
//! portero run --driver mock --jobs 4       # Against the simulated app
//! portero run --filter smoke --retries 0   # Tagged subset, no retries
//! portero list --steps                     # Show scenarios
//! portero config --format json             # Effective configuration
//! ```

use std::process::ExitCode;

use clap::Parser;
use portero_cli::{handlers, logging, Cli, CliError, CliResult, ColorChoice, Commands, Verbosity};

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing so `.env` can feed `PORTERO_BASE_URL` too
    let _ = portero::fixture::load_dotenv();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ScenariosFailed { failed, total }) => {
            println!("{failed} of {total} scenario(s) failed");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color = ColorChoice::from(cli.color);
    logging::init(verbosity, color.should_color());

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&args, verbosity, color)
            .await
            .map(|_| ()),
        Commands::List(args) => handlers::execute_list(&args),
        Commands::Config(args) => handlers::execute_config(&args),
    }
}
