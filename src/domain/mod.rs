//! Core data model: articles, decisions, the screening protocol, duplicate
//! clusters, and the per-run summaries.

pub mod article;
pub mod decision;
pub mod dedup;
pub mod protocol;
pub mod summary;

pub use article::{Article, ArticleStatus};
pub use decision::{Confidence, Decision, Verdict};
pub use dedup::{
    DedupSummary, DuplicateCandidate, DuplicateResolution, DuplicateVerdict, PairOutcome,
};
pub use protocol::Protocol;
pub use summary::{ArticleOutcome, FailureRecord, RunSummary};
