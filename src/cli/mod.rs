//! CLI module - Command-line interface for Backstage
//!
//! Admin accounts are provisioned and managed here; the HTTP API has no
//! endpoints for it.

mod commands;

use clap::{ArgAction, Parser, Subcommand, builder::BoolishValueParser};

pub const ADMIN_PASSWORD_ENV: &str = "BACKSTAGE_ADMIN_PASSWORD";

/// Backstage - admin authentication service
#[derive(Parser)]
#[command(name = "backstage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Create an admin account unless the username is taken
    CreateAdmin {
        #[arg(long)]
        username: String,
        /// Read from the environment when omitted
        #[arg(long, env = ADMIN_PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// admin, editor or contributor
        #[arg(long, default_value = "admin")]
        role: String,
    },

    /// Enable or disable an admin account
    SetActive {
        username: String,
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        active: bool,
    },

    /// Change an admin's role
    SetRole { username: String, role: String },

    /// Print a password hash using the configured parameters
    HashPassword {
        #[arg(long, env = ADMIN_PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,
    },

    /// Print a random value suitable for `token.secret`
    GenerateSecret,

    /// Create a default config file with a fresh token secret
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
