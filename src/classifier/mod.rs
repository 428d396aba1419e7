//! AI judgment service boundary.
//!
//! One call per article: the adapter sends the article text plus the fixed
//! protocol and parses a structured include/exclude/maybe decision. Any
//! response that does not map cleanly to one of the three categories is a
//! classifier error, never a silent default.

use async_trait::async_trait;

use crate::domain::{Article, Decision, DuplicateVerdict, Protocol};
use crate::error::Result;

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;

/// Classifies one article against the screening protocol.
///
/// Repeated calls with identical input should converge on the same
/// categorical verdict with high probability; strict reproducibility is not
/// guaranteed by the underlying model and callers must not assume it.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, article: &Article, protocol: &Protocol) -> Result<Decision>;
}

/// Judges whether two suspected-duplicate articles describe the same study.
///
/// Callers only submit pairs where both abstracts are present; the judge
/// compares methodology, population, results, and conclusions, not wording.
#[async_trait]
pub trait DuplicateJudge: Send + Sync {
    async fn same_study(&self, left: &Article, right: &Article) -> Result<DuplicateVerdict>;
}
