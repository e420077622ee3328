//! CLI argument parsing for inhibitor.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Inhibitor: hold power-state inhibit locks backed by named pipes.
///
/// A lock is a FIFO in `{run_dir}/ConsoleKit/inhibit/`. It is held for as
/// long as its client keeps the write end open, and released when the client
/// closes it or exits.
#[derive(Parser, Debug)]
#[command(name = "inhibitor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run-time directory root (overrides the config file).
    #[arg(long, global = true, value_name = "DIR")]
    pub run_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for inhibitor.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding an inhibit lock.
    ///
    /// The lock is taken before the command starts and released once it
    /// exits. A command that fails or cannot be started fails `hold`.
    Hold(HoldArgs),

    /// List inhibitor nodes.
    ///
    /// Shows each lock holder with its age and whether a monitoring end is
    /// still attached.
    List(ListArgs),

    /// Remove an inhibitor node.
    ///
    /// Stale nodes (no monitoring end) are removed directly; live ones
    /// require --force.
    Clear(ClearArgs),
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// Who is taking the lock (also the node's file name).
    #[arg(long)]
    pub who: String,

    /// Colon-separated inhibit types, e.g. "shutdown:idle".
    #[arg(long)]
    pub what: String,

    /// Why the lock is taken.
    #[arg(long)]
    pub why: String,

    /// Command to run while the lock is held.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Lock holder whose node should be removed.
    pub who: String,

    /// Remove the node even if a monitoring end is attached.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
