//! The screening decision loop.
//!
//! Sequential by design: one article is fully classified and updated before
//! the next begins, which bounds the request rate and keeps the summary
//! race-free without synchronization. The snapshot is fetched once at run
//! start and never re-fetched mid-run; articles added concurrently by
//! another actor surface in a future run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::domain::{Article, ArticleOutcome, Protocol, RunSummary};
use crate::error::Result;
use crate::platform::PlatformClient;
use crate::retry::{Pacer, RetryPolicy, with_retry};
use crate::screening::StopFlag;

/// One full fetch-classify-update pass over a review's undecided queue.
pub struct ScreeningRun {
    platform: Arc<dyn PlatformClient>,
    classifier: Arc<dyn Classifier>,
    protocol: Protocol,
    review_id: String,
    policy: RetryPolicy,
    pacing: Duration,
    stop: StopFlag,
}

impl ScreeningRun {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        classifier: Arc<dyn Classifier>,
        protocol: Protocol,
        review_id: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            classifier,
            protocol,
            review_id: review_id.into(),
            policy: RetryPolicy::default(),
            pacing: Duration::ZERO,
            stop: StopFlag::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Minimum delay between articles.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Execute the run. Errors before the first article (snapshot fetch,
    /// invalid session, unknown review) are fatal; everything after is
    /// caught at the article boundary and the run always completes with a
    /// summary. Only an auth failure stops the loop mid-run; a missing or
    /// rejected article is recorded and the next one proceeds.
    pub async fn run(self) -> Result<RunSummary> {
        let mut summary = RunSummary::new();

        let snapshot = with_retry(&self.policy, "fetch undecided queue", || {
            self.platform.list_undecided(&self.review_id)
        })
        .await?;

        info!(review_id = %self.review_id, articles = snapshot.len(), "starting screening run");

        if snapshot.is_empty() {
            summary.finalize();
            return Ok(summary);
        }

        let mut pacer = Pacer::new(self.pacing);

        // Strict snapshot order; each article processed exactly once.
        for article in &snapshot {
            if self.stop.is_raised() {
                info!(processed = summary.processed, "stop requested, finalizing early");
                summary.mark_stopped();
                break;
            }

            pacer.pace().await;

            match self.process(article).await {
                Ok(outcome) => summary.record(article.id, &article.title, outcome),
                Err(fatal) => {
                    // A fatal error mid-run (expired session) would fail
                    // every remaining call identically.
                    warn!(article_id = article.id, error = %fatal, "fatal error mid-run, stopping");
                    summary.record(article.id, &article.title, ArticleOutcome::Failed(fatal.to_string()));
                    summary.mark_stopped();
                    break;
                }
            }
        }

        summary.finalize();
        info!(%summary, "screening run finished");
        Ok(summary)
    }

    /// Classify and update one article. `Err` is reserved for fatal errors;
    /// exhausted retries come back as `Ok(Failed)` so the loop can continue.
    async fn process(&self, article: &Article) -> Result<ArticleOutcome> {
        let decision = match with_retry(&self.policy, "classify article", || {
            self.classifier.classify(article, &self.protocol)
        })
        .await
        {
            Ok(decision) => decision,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(article_id = article.id, error = %err, "classification failed, article stays undecided");
                return Ok(ArticleOutcome::Failed(err.to_string()));
            }
        };

        info!(
            article_id = article.id,
            verdict = %decision.verdict,
            rationale = decision.rationale.as_deref().unwrap_or("-"),
            "decision reached"
        );

        match with_retry(&self.policy, "update article status", || {
            self.platform.update_status(article.id, &decision)
        })
        .await
        {
            Ok(()) => Ok(match decision.verdict {
                crate::domain::Verdict::Include => ArticleOutcome::Included,
                crate::domain::Verdict::Exclude => ArticleOutcome::Excluded,
                crate::domain::Verdict::Maybe => ArticleOutcome::Maybe,
            }),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(article_id = article.id, error = %err, "status update failed, article stays undecided");
                Ok(ArticleOutcome::Failed(err.to_string()))
            }
        }
    }
}
