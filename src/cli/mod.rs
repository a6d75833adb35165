//! CLI entry point for loginflow.

pub mod login;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// loginflow CLI
#[derive(Parser, Debug)]
#[command(name = "loginflow", version, about = "Log in to an account server through your browser")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in through the browser and obtain an app password
    Login(LoginArgs),
}

/// Arguments for `loginflow login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Server base URL (falls back to LOGINFLOW_SERVER_URL / config file)
    pub server: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Only print the link, do not launch a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Print the app password on success
    #[arg(long)]
    pub show_password: bool,
}
