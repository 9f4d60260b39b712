//! CLI for the batch upload client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hrs_core::config;
use hrs_core::session::SessionStore;
use std::path::PathBuf;

use commands::{
    run_analyze, run_login, run_logout, run_register, run_submit, run_upload, run_whoami,
};

/// Top-level CLI for the hotel-review sentiment batch client.
#[derive(Debug, Parser)]
#[command(name = "hrs")]
#[command(about = "Upload review batches to the sentiment API and follow their progress", long_about = None)]
pub struct Cli {
    /// Override the configured API base URL (e.g. http://127.0.0.1:5000/api).
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a CSV, TXT or JSON file of reviews for batch analysis.
    Upload {
        /// Path to the file.
        path: PathBuf,
        /// Only print the final result.
        #[arg(long)]
        quiet: bool,
    },

    /// Log in and keep the session for later commands.
    Login {
        username: String,
        /// Password (default: HRS_PASSWORD, then prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// End the current session.
    Logout,

    /// Create a regular account (does not log in).
    Register {
        username: String,
        /// Password (default: HRS_PASSWORD, then prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// Submit one review and print its sentiment and aspects.
    Submit {
        /// Review text.
        text: String,
    },

    /// Analyze the sentiment of a text without storing it.
    Analyze {
        text: String,
    },

    /// Show the logged-in user.
    Whoami,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        if let Some(url) = cli.base_url {
            cfg.base_url = url;
        }
        tracing::debug!("loaded config: {:?}", cfg);
        let store = SessionStore::open_default()?;

        match cli.command {
            CliCommand::Upload { path, quiet } => run_upload(&cfg, &store, &path, quiet).await?,
            CliCommand::Login { username, password } => {
                run_login(&cfg, &store, &username, password).await?
            }
            CliCommand::Logout => run_logout(&cfg, &store).await?,
            CliCommand::Register { username, password } => {
                run_register(&cfg, &username, password).await?
            }
            CliCommand::Submit { text } => run_submit(&cfg, &store, &text).await?,
            CliCommand::Analyze { text } => run_analyze(&cfg, &store, &text).await?,
            CliCommand::Whoami => run_whoami(&cfg, &store).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
