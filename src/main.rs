//! Browse a OneLake account from the command line, without mounting anything.
use std::path::PathBuf;

use clap::Parser;
use secrecy::SecretString;
use tracing::error;

mod app_config;
mod commands;
mod trc;

use crate::app_config::Config;
use crate::commands::Command;
use crate::trc::Trc;

#[derive(Parser)]
#[command(
    version,
    about = "Read-only access to OneLake workspaces, items and files."
)]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to a onelake-fs config TOML."
    )]
    config_path: Option<PathBuf>,

    #[arg(
        long,
        env = "ONELAKE_ACCESS_TOKEN",
        hide_env_values = true,
        help = "Bearer token for the OneLake DFS endpoint."
    )]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    // Errors use eprintln since tracing isn't initialized yet.
    let config = Config::load_or_default(args.config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    if let Err(error_messages) = config.validate() {
        eprintln!("Configuration is invalid.");
        for msg in &error_messages {
            eprintln!(" - {msg}");
        }
        std::process::exit(1);
    }

    if let Err(e) = Trc::default().init() {
        eprintln!(
            "Failed to initialize logging. Without logging, we can't provide any useful error \
             messages, so we have to exit: {e}"
        );
        std::process::exit(1);
    }

    if let Err(e) = commands::run(config, args.token.map(SecretString::from), args.command) {
        error!("{e}");
        std::process::exit(1);
    }
}
