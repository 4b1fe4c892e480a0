use anyhow::Result;
use tracing_subscriber::EnvFilter;

use super::{
    args::{Arguments, Command},
    commands::{CommandResult, check::check, init::init, keys::keys},
};

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "TRANSLENS_LOG";

/// Dispatch to the command handler.
///
/// Returns error, warning and parse-error counts for the reporter and the exit code.
pub fn run(Arguments { command }: Arguments) -> Result<CommandResult> {
    match command {
        Some(Command::Check(cmd)) => check(cmd),
        Some(Command::Keys(cmd)) => keys(cmd),
        Some(Command::Init) => init(),
        None => {
            anyhow::bail!("No command provided. Use --help to see available commands.")
        }
    }
}

/// Install the stderr `tracing` subscriber.
///
/// `TRANSLENS_LOG` wins; otherwise `-v` enables debug output.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "translens=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
