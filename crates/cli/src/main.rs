//! sitekit: command-line front end for the site API.
//!
//! The session (tokens and cached profile) persists in a JSON file between
//! invocations, so `login` once and the other commands run authenticated.
//!
//! ## Subcommands
//!
//! - `login`, `logout`, `whoami`: session lifecycle
//! - `forgot-password`, `reset-password`: password recovery
//! - `reports`, `report`, `categories`: read-only report access

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sitekit")]
#[command(about = "Session-aware client for the site API")]
#[command(version)]
struct Cli {
    /// Session file (default: <data dir>/sitekit/session.json)
    #[arg(long, global = true, value_name = "PATH")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// End the session (always clears local state)
    Logout,

    /// Show the current session and refresh the cached profile
    Whoami,

    /// Request a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Set a new password using the emailed token
    ResetPassword {
        #[arg(long)]
        token: String,

        #[arg(long)]
        password: String,
    },

    /// List reports, newest first
    Reports {
        /// Category slug or name
        #[arg(long)]
        category: Option<String>,

        /// Free-text search over title, summary and tags
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Raw query string such as "?category=x&q=y" (flags win over it)
        #[arg(long, value_name = "QUERY_STRING")]
        filter: Option<String>,
    },

    /// Show one report
    Report {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List report categories
    Categories,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    sitekit_observability::init();
    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
