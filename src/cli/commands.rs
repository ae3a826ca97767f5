//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - import: load a YAML fixture into the database
//! - resolve: find the handler for a resource identity from a context
//! - tabs: list navigation tabs for a context
//! - check-url: test a URL against a handler's launch path
//! - history: list a user's messages

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use lti_resolver::domain::{ContextRef, Placement};
use lti_resolver::history::Permission;
use std::path::PathBuf;

/// lti-resolver - find installed LTI message handlers across accounts and courses
#[derive(Parser, Debug)]
#[command(name = "lti-resolver")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path (overrides storage.database_path)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Exactly one of --account / --course
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ContextArgs {
    /// Account id to resolve from
    #[arg(long)]
    pub account: Option<i64>,

    /// Course id to resolve from
    #[arg(long)]
    pub course: Option<i64>,
}

impl ContextArgs {
    pub fn context(&self) -> Result<ContextRef> {
        match (self.account, self.course) {
            (Some(id), None) => Ok(ContextRef::Account(id)),
            (None, Some(id)) => Ok(ContextRef::Course(id)),
            (Some(_), Some(_)) => eyre::bail!("--account and --course are mutually exclusive"),
            (None, None) => eyre::bail!("one of --account or --course is required"),
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a YAML fixture of accounts, tools and messages into the database
    Import {
        /// Fixture file
        path: PathBuf,
    },

    /// Find the message handler for a resource identity
    Resolve {
        #[arg(long)]
        vendor: String,

        #[arg(long)]
        product: String,

        #[arg(long = "resource-type")]
        resource_type: String,

        /// Message type to match instead of the configured launch type
        #[arg(long = "message-type")]
        message_type: Option<String>,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// List navigation tabs contributed by handlers bound at a context
    Tabs {
        #[command(flatten)]
        context: ContextArgs,

        /// Placement to include (repeatable)
        #[arg(short, long = "placement", required = true)]
        placements: Vec<Placement>,

        /// Extra launch argument as key=value (repeatable)
        #[arg(long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },

    /// Check whether a URL belongs to a handler's launch path
    CheckUrl {
        /// Message handler id
        #[arg(long)]
        handler: i64,

        url: String,
    },

    /// List a user's message history
    History {
        /// User whose messages to list
        #[arg(long)]
        user: i64,

        /// Domain root account of the request
        #[arg(long = "domain-root-account")]
        domain_root_account: i64,

        /// Requesting user
        #[arg(long, default_value_t = 0)]
        requester: i64,

        /// Requester holds read_messages on site admin
        #[arg(long)]
        site_admin: bool,

        /// Permission the requester holds on the domain root account (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<Permission>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        page: Option<String>,

        #[arg(long = "per-page")]
        per_page: Option<String>,
    },
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {}", raw))
}
