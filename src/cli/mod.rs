//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{CreateCommand, EnvironmentsCommand, ListCommand, ValidateCommand};
use std::ffi::OsString;

/// Builds CI pipelines through the construction chain
#[derive(Debug, Parser, Clone)]
#[command(name = "pipeline-chain")]
#[command(author = "Pipeline Chain Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Builds CI pipeline graphs through an ordered chain of steps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the SQLite database (defaults to the local data directory)
    #[arg(long, global = true)]
    pub db: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the full chain and persist the pipeline
    Create(CreateCommand),

    /// Run the validation steps only
    Validate(ValidateCommand),

    /// List persisted pipelines of a project
    List(ListCommand),

    /// List environments of a project
    Environments(EnvironmentsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
