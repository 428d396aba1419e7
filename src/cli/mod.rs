//! CLI module for refscreen - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running a screening
//! pass and inspecting the active criteria.

pub mod commands;

pub use commands::Cli;
