//! CLI module for folio-migrate.
//!
//! Subcommands:
//! - `migrate`: Copy source tables into Firestore collections
//! - `remap`: Rewrite stale owner identifiers
//! - `audit`: Check that a profile's records are reachable
//! - `check-username`: Check whether a username is free

mod audit;
mod check_username;
mod migrate;
mod remap;

use clap::{Parser, Subcommand};
use serde::Serialize;

/// folio-migrate - Supabase to Firestore migration tooling
#[derive(Parser)]
#[command(name = "folio-migrate")]
#[command(about = "Migrate a portfolio platform from Supabase to Firestore")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Copy every configured table into its target collection
    Migrate {
        /// Read and transform without writing
        #[arg(long)]
        dry_run: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace old owner identifiers using the configured mapping
    Remap {
        /// Count stale references without writing
        #[arg(long)]
        dry_run: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Audit the records reachable from a username
    Audit {
        /// Public username (exact, case-sensitive)
        username: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a username is free to use
    CheckUsername {
        username: String,

        /// Owner identifier of the profile being saved
        #[arg(long)]
        owner: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Migrate { dry_run, json } => self.run_migrate(dry_run, json).await,
            Command::Remap { dry_run, json } => self.run_remap(dry_run, json).await,
            Command::Audit { ref username, json } => self.run_audit(username, json).await,
            Command::CheckUsername {
                ref username,
                ref owner,
                json,
            } => self.run_check_username(username, owner.as_deref(), json).await,
        }
    }
}

/// Writes a report to stdout, either rendered or as pretty JSON.
fn print_report<T: Serialize + std::fmt::Display>(report: &T, json: bool) -> color_eyre::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
