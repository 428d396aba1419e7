//! The screening run: fetch one snapshot of the undecided queue, classify
//! and update each article in order, accumulate the run summary.

pub mod runner;
pub mod stop;

pub use runner::ScreeningRun;
pub use stop::StopFlag;
