//! mf3270 CLI entry point.

mod args;
mod config;
mod run;

use clap::Parser;
use mf3270_core::ApiError;
use tracing::error;

use crate::args::Cli;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            match e.downcast_ref::<ApiError>() {
                Some(api) => match serde_json::to_string_pretty(api) {
                    Ok(json) => eprintln!("{}", json),
                    Err(_) => eprintln!("Error: {}", api),
                },
                None => error!("{:#}", e),
            }
            std::process::exit(1);
        }
    }
}
