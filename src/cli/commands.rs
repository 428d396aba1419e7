//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: screen the undecided queue of a review (default when omitted)
//! - duplicates: resolve the review's suspected duplicate clusters
//! - protocol: print the screening criteria that would be used

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Refscreen - AI-assisted title/abstract screening for systematic reviews
#[derive(Parser, Debug)]
#[command(name = "refscreen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Screen every undecided article in the review
    Run {
        /// Review to screen, overriding the configured one
        #[arg(short, long)]
        review_id: Option<String>,

        /// Classify but skip writing decisions back
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve the review's suspected duplicate clusters
    Duplicates {
        /// Review to resolve, overriding the configured one
        #[arg(short, long)]
        review_id: Option<String>,
    },

    /// Print the screening criteria that would be used
    Protocol,
}
