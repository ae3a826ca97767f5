//! CLI module for lti-resolver - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
