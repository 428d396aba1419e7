//! Literature-review platform boundary.
//!
//! The platform owns the articles; this system only lists the undecided
//! queue and writes decisions back. Session establishment (browser login
//! and header capture) is an external collaborator; clients here receive an
//! already-valid [`Session`].

use async_trait::async_trait;

use crate::domain::{Article, Decision, DuplicateCandidate, DuplicateResolution};
use crate::error::Result;

pub mod dry_run;
pub mod rayyan;
pub mod session;

pub use dry_run::DryRunPlatform;
pub use rayyan::RayyanClient;
pub use session::Session;

/// Authenticated access to the review platform. No local caching: every
/// call reflects live platform state.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// List all currently undecided articles for a review.
    async fn list_undecided(&self, review_id: &str) -> Result<Vec<Article>>;

    /// Record a decision for one article. The effect is visible to
    /// subsequent `list_undecided` calls.
    async fn update_status(&self, article_id: u64, decision: &Decision) -> Result<()>;
}

/// Access to the platform's unresolved duplicate clusters. Separate from
/// [`PlatformClient`] so screening code and its mocks never see it.
#[async_trait]
pub trait DuplicateStore: Send + Sync {
    /// List all articles awaiting a duplicate resolution, each tagged with
    /// its cluster.
    async fn list_unresolved(&self, review_id: &str) -> Result<Vec<DuplicateCandidate>>;

    /// Record a duplicate/distinct resolution for one cluster member.
    async fn resolve_duplicate(
        &self,
        article_id: u64,
        resolution: DuplicateResolution,
    ) -> Result<()>;
}
