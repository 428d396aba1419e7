//! Refscreen - AI-assisted title/abstract screening for systematic reviews.
//!
//! Fetches the undecided queue of a literature review, classifies each
//! article against fixed PICO criteria with an AI judgment service, and
//! writes the decisions back to the platform. A second workflow resolves
//! the platform's suspected-duplicate clusters by pairwise abstract
//! comparison.

pub mod classifier;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod platform;
pub mod retry;
pub mod screening;

pub use error::{Result, ScreenError};
