use clap::Parser;
use claude_env::cli::Cli;
use claude_env::{commands, ui, Error};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr so command output stays clean
    let default_filter = if cli.verbose {
        "claude_env=debug"
    } else {
        "claude_env=warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match commands::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(format!("{err:#}"));
            if let Some(hint) = err.downcast_ref::<Error>().and_then(Error::hint) {
                ui::hint(hint);
            }
            ExitCode::FAILURE
        }
    }
}
