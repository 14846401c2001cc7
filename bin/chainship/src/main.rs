//! chainship publishes a compiled smart contract to a configured network and records where it lives.

mod cli;
mod deploy;
mod summary;

use std::process::ExitCode;

use clap::Parser;

use chainship_deploy::NetworkRegistry;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger. Stdout is reserved for the deployment record.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Deploy(args) => deploy::run(args).await,
        Command::Networks { networks_config } => {
            NetworkRegistry::load(networks_config.as_deref()).map(|registry| {
                eprintln!("{}", summary::networks_table(&registry));
                ExitCode::SUCCESS
            })
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", error_line(&e));
            ExitCode::FAILURE
        }
    }
}

/// The single stderr line for an error that stopped the command before a deployment ran.
fn error_line(error: &anyhow::Error) -> String {
    format!("Error: {:#}", error)
}
