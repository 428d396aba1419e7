//! The duplicate-resolution run: fetch unresolved cluster members, compare
//! each against its cluster anchor, write resolutions back.

pub mod runner;

pub use runner::DedupRun;
