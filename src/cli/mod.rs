//! CLI module for the semantic cache
//!
//! Subcommands:
//! - `serve`: HTTP API in front of the configured backend
//! - `resolve`: one-shot lookup against the configured stack

pub mod resolve;
pub mod serve;

use clap::{Parser, Subcommand};

/// PMP Semantic Cache - serve equivalent generation requests from cache
#[derive(Parser)]
#[command(name = "pmp-semantic-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Resolve a single prompt and write the artifact to disk
    Resolve(resolve::ResolveArgs),
}
