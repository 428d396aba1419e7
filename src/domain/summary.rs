//! Per-run outcome accounting.
//!
//! The run summary lives only in memory for the duration of a run: counts,
//! the failure list, and timestamps. There is no durable run history.

use chrono::{DateTime, Utc};

/// Terminal outcome for one snapshot entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Included,
    Excluded,
    Maybe,
    /// Retries exhausted; the article stays undecided on the platform and
    /// will surface again in a future run's snapshot.
    Failed(String),
}

/// One failed article with its last error, so it can be re-queued manually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub article_id: u64,
    pub title: String,
    pub error: String,
}

/// Accumulated counts for one screening run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub processed: usize,
    pub included: usize,
    pub excluded: usize,
    pub maybe: usize,
    pub failed: usize,

    pub failures: Vec<FailureRecord>,

    /// Set when a stop signal or a fatal mid-run error cut the snapshot short.
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            included: 0,
            excluded: 0,
            maybe: 0,
            failed: 0,
            failures: Vec::new(),
            stopped_early: false,
        }
    }

    /// Record the outcome for one article. Called exactly once per
    /// processed snapshot entry.
    pub fn record(&mut self, article_id: u64, title: &str, outcome: ArticleOutcome) {
        self.processed += 1;
        match outcome {
            ArticleOutcome::Included => self.included += 1,
            ArticleOutcome::Excluded => self.excluded += 1,
            ArticleOutcome::Maybe => self.maybe += 1,
            ArticleOutcome::Failed(error) => {
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

    /// Counts must partition the processed total exactly.
    pub fn is_consistent(&self) -> bool {
        self.included + self.excluded + self.maybe + self.failed == self.processed
            && self.failures.len() == self.failed
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed {} (included {}, excluded {}, maybe {}, failed {})",
            self.processed, self.included, self.excluded, self.maybe, self.failed
        )?;
        if self.stopped_early {
            write!(f, " [stopped early]")?;
        }
        Ok(())
    }
}
