//! Duplicate-resolution data model.
//!
//! The platform's automatic deduplication leaves clusters of suspected
//! duplicates unresolved; each non-anchor member of a cluster gets an
//! explicit duplicate/distinct resolution written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::article::Article;
use super::summary::FailureRecord;

/// One unresolved article together with the cluster it was grouped into.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCandidate {
    pub cluster_id: u64,
    pub article: Article,
}

/// Resolution written back to the platform for one cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateResolution {
    Duplicate,
    Distinct,
}

impl DuplicateResolution {
    /// The platform's numeric action code for this resolution.
    pub fn action_code(&self) -> u8 {
        match self {
            DuplicateResolution::Duplicate => 1,
            DuplicateResolution::Distinct => 2,
        }
    }
}

impl std::fmt::Display for DuplicateResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DuplicateResolution::Duplicate => "duplicate",
            DuplicateResolution::Distinct => "distinct",
        };
        write!(f, "{}", s)
    }
}

/// The judge's answer for one pair of abstracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,

    /// Brief explanation of the call
    pub reason: Option<String>,
}

impl DuplicateVerdict {
    pub fn resolution(&self) -> DuplicateResolution {
        if self.is_duplicate {
            DuplicateResolution::Duplicate
        } else {
            DuplicateResolution::Distinct
        }
    }
}

/// Terminal outcome for one compared cluster member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    Duplicate,
    Distinct,
    /// Retries exhausted; the member stays unresolved on the platform.
    Failed(String),
}

/// Accumulated counts for one duplicate-resolution run.
#[derive(Debug, Clone)]
pub struct DedupSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Clusters with at least two members (singletons are skipped).
    pub clusters: usize,

    pub compared: usize,
    pub duplicates: usize,
    pub distinct: usize,
    pub failed: usize,

    pub failures: Vec<FailureRecord>,

    pub stopped_early: bool,
}

impl DedupSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            clusters: 0,
            compared: 0,
            duplicates: 0,
            distinct: 0,
            failed: 0,
            failures: Vec::new(),
            stopped_early: false,
        }
    }

    /// Record the outcome for one compared cluster member.
    pub fn record(&mut self, article_id: u64, title: &str, outcome: PairOutcome) {
        self.compared += 1;
        match outcome {
            PairOutcome::Duplicate => self.duplicates += 1,
            PairOutcome::Distinct => self.distinct += 1,
            PairOutcome::Failed(error) => {
                self.failed += 1;
                self.failures.push(FailureRecord {
                    article_id,
                    title: title.to_string(),
                    error,
                });
            }
        }
    }

    pub fn mark_stopped(&mut self) {
        self.stopped_early = true;
    }

    pub fn finalize(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Counts must partition the compared total exactly.
    pub fn is_consistent(&self) -> bool {
        self.duplicates + self.distinct + self.failed == self.compared
            && self.failures.len() == self.failed
    }
}

impl Default for DedupSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DedupSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "compared {} across {} clusters (duplicates {}, distinct {}, failed {})",
            self.compared, self.clusters, self.duplicates, self.distinct, self.failed
        )?;
        if self.stopped_early {
            write!(f, " [stopped early]")?;
        }
        Ok(())
    }
}
