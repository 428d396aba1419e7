//! Read-only wrapper for rehearsal runs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::{Article, Decision};
use crate::error::Result;
use crate::platform::PlatformClient;

/// Delegates reads to the real platform but swallows writes, so a run can
/// be rehearsed against live data without touching any article.
pub struct DryRunPlatform {
    inner: Arc<dyn PlatformClient>,
}

impl DryRunPlatform {
    pub fn new(inner: Arc<dyn PlatformClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl PlatformClient for DryRunPlatform {
    async fn list_undecided(&self, review_id: &str) -> Result<Vec<Article>> {
        self.inner.list_undecided(review_id).await
    }

    async fn update_status(&self, article_id: u64, decision: &Decision) -> Result<()> {
        info!(
            article_id,
            verdict = %decision.verdict,
            "dry run, decision not written back"
        );
        Ok(())
    }
}
