//! The duplicate-resolution loop.
//!
//! Mirrors the screening run: one snapshot of unresolved cluster members,
//! then sequential pairwise comparison with pacing and bounded retry. The
//! first member of each cluster is the anchor; every other member is
//! compared against it and resolved individually. The anchor itself never
//! receives a resolution, and singleton clusters have nothing to compare.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::classifier::DuplicateJudge;
use crate::domain::{
    Article, DedupSummary, DuplicateCandidate, DuplicateResolution, DuplicateVerdict, PairOutcome,
};
use crate::error::Result;
use crate::platform::DuplicateStore;
use crate::retry::{Pacer, RetryPolicy, with_retry};
use crate::screening::StopFlag;

/// One full fetch-compare-resolve pass over a review's duplicate clusters.
pub struct DedupRun {
    store: Arc<dyn DuplicateStore>,
    judge: Arc<dyn DuplicateJudge>,
    review_id: String,
    policy: RetryPolicy,
    pacing: Duration,
    stop: StopFlag,
}

impl DedupRun {
    pub fn new(
        store: Arc<dyn DuplicateStore>,
        judge: Arc<dyn DuplicateJudge>,
        review_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            judge,
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

    /// Minimum delay between comparisons.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Execute the run. A failed snapshot fetch is fatal; per-pair errors
    /// are recorded and the run continues, auth failures excepted.
    pub async fn run(self) -> Result<DedupSummary> {
        let mut summary = DedupSummary::new();

        let candidates = with_retry(&self.policy, "fetch unresolved duplicates", || {
            self.store.list_unresolved(&self.review_id)
        })
        .await?;

        let clusters = group_into_clusters(candidates);
        summary.clusters = clusters.iter().filter(|(_, m)| m.len() >= 2).count();

        info!(
            review_id = %self.review_id,
            articles = clusters.iter().map(|(_, m)| m.len()).sum::<usize>(),
            clusters = summary.clusters,
            "starting duplicate resolution"
        );

        let mut pacer = Pacer::new(self.pacing);

        'clusters: for (cluster_id, members) in &clusters {
            if members.len() < 2 {
                continue;
            }

            let anchor = &members[0];
            for other in &members[1..] {
                if self.stop.is_raised() {
                    info!(compared = summary.compared, "stop requested, finalizing early");
                    summary.mark_stopped();
                    break 'clusters;
                }

                pacer.pace().await;

                match self.process(*cluster_id, anchor, other).await {
                    Ok(outcome) => summary.record(other.id, &other.title, outcome),
                    Err(fatal) => {
                        warn!(article_id = other.id, error = %fatal, "fatal error mid-run, stopping");
                        summary.record(
                            other.id,
                            &other.title,
                            PairOutcome::Failed(fatal.to_string()),
                        );
                        summary.mark_stopped();
                        break 'clusters;
                    }
                }
            }
        }

        summary.finalize();
        info!(%summary, "duplicate resolution finished");
        Ok(summary)
    }

    /// Compare one cluster member against the anchor and resolve it. `Err`
    /// is reserved for fatal errors; exhausted retries come back as
    /// `Ok(Failed)`.
    async fn process(
        &self,
        cluster_id: u64,
        anchor: &Article,
        other: &Article,
    ) -> Result<PairOutcome> {
        // Without both abstracts there is nothing to compare; keep the
        // member in the review rather than guess.
        let verdict = if !anchor.has_abstract() || !other.has_abstract() {
            DuplicateVerdict {
                is_duplicate: false,
                reason: Some("one or both abstracts missing".to_string()),
            }
        } else {
            match with_retry(&self.policy, "compare abstracts", || {
                self.judge.same_study(anchor, other)
            })
            .await
            {
                Ok(verdict) => verdict,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(article_id = other.id, error = %err, "comparison failed, member stays unresolved");
                    return Ok(PairOutcome::Failed(err.to_string()));
                }
            }
        };

        let resolution = verdict.resolution();
        info!(
            cluster_id,
            anchor_id = anchor.id,
            article_id = other.id,
            %resolution,
            reason = verdict.reason.as_deref().unwrap_or("-"),
            "duplicate verdict reached"
        );

        match with_retry(&self.policy, "resolve duplicate", || {
            self.store.resolve_duplicate(other.id, resolution)
        })
        .await
        {
            Ok(()) => Ok(match resolution {
                DuplicateResolution::Duplicate => PairOutcome::Duplicate,
                DuplicateResolution::Distinct => PairOutcome::Distinct,
            }),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(article_id = other.id, error = %err, "resolution failed, member stays unresolved");
                Ok(PairOutcome::Failed(err.to_string()))
            }
        }
    }
}

/// Group candidates by cluster id, preserving platform order both across
/// clusters and within each cluster.
fn group_into_clusters(candidates: Vec<DuplicateCandidate>) -> Vec<(u64, Vec<Article>)> {
    let mut clusters: Vec<(u64, Vec<Article>)> = Vec::new();
    for candidate in candidates {
        match clusters.iter_mut().find(|(id, _)| *id == candidate.cluster_id) {
            Some((_, members)) => members.push(candidate.article),
            None => clusters.push((candidate.cluster_id, vec![candidate.article])),
        }
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScreenError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StaticStore {
        candidates: Vec<DuplicateCandidate>,
        resolutions: Mutex<Vec<(u64, DuplicateResolution)>>,
    }

    impl StaticStore {
        fn new(candidates: Vec<DuplicateCandidate>) -> Self {
            Self {
                candidates,
                resolutions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DuplicateStore for StaticStore {
        async fn list_unresolved(&self, _review_id: &str) -> Result<Vec<DuplicateCandidate>> {
            Ok(self.candidates.clone())
        }

        async fn resolve_duplicate(
            &self,
            article_id: u64,
            resolution: DuplicateResolution,
        ) -> Result<()> {
            self.resolutions.lock().unwrap().push((article_id, resolution));
            Ok(())
        }
    }

    enum JudgeScript {
        Same,
        Different,
        Fail,
    }

    struct ScriptedJudge {
        scripts: HashMap<u64, JudgeScript>,
        calls: Mutex<HashMap<u64, u32>>,
    }

    impl ScriptedJudge {
        fn new(scripts: HashMap<u64, JudgeScript>) -> Self {
            Self {
                scripts,
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn calls_for(&self, article_id: u64) -> u32 {
            self.calls.lock().unwrap().get(&article_id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl DuplicateJudge for ScriptedJudge {
        async fn same_study(&self, _left: &Article, right: &Article) -> Result<DuplicateVerdict> {
            *self.calls.lock().unwrap().entry(right.id).or_insert(0) += 1;
            match self.scripts.get(&right.id) {
                Some(JudgeScript::Same) => Ok(DuplicateVerdict {
                    is_duplicate: true,
                    reason: Some("same trial".into()),
                }),
                Some(JudgeScript::Different) => Ok(DuplicateVerdict {
                    is_duplicate: false,
                    reason: Some("different cohorts".into()),
                }),
                Some(JudgeScript::Fail) => {
                    Err(ScreenError::Classifier("garbled response".into()))
                }
                None => panic!("unscripted article {}", right.id),
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            multiplier: 1.0,
        }
    }

    fn candidate(cluster_id: u64, article_id: u64, abstract_text: &str) -> DuplicateCandidate {
        DuplicateCandidate {
            cluster_id,
            article: Article::new(article_id, format!("Article {}", article_id), abstract_text),
        }
    }

    fn run_for(store: Arc<StaticStore>, judge: Arc<ScriptedJudge>) -> DedupRun {
        DedupRun::new(store, judge, "review-1").with_policy(fast_policy())
    }

    #[tokio::test]
    async fn test_cluster_members_resolved_against_anchor() {
        let store = Arc::new(StaticStore::new(vec![
            candidate(100, 1, "The anchor study"),
            candidate(100, 2, "The anchor study, republished"),
            candidate(100, 3, "A different study entirely"),
        ]));
        let judge = Arc::new(ScriptedJudge::new(HashMap::from([
            (2, JudgeScript::Same),
            (3, JudgeScript::Different),
        ])));

        let summary = run_for(store.clone(), judge.clone()).run().await.unwrap();

        assert_eq!(summary.clusters, 1);
        assert_eq!(summary.compared, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.distinct, 1);
        assert!(summary.is_consistent());

        // The anchor is never resolved or judged
        assert_eq!(judge.calls_for(1), 0);
        assert_eq!(
            *store.resolutions.lock().unwrap(),
            vec![
                (2, DuplicateResolution::Duplicate),
                (3, DuplicateResolution::Distinct),
            ]
        );
    }

    #[tokio::test]
    async fn test_singleton_clusters_are_skipped() {
        let store = Arc::new(StaticStore::new(vec![
            candidate(100, 1, "alone in its cluster"),
            candidate(200, 2, "also alone"),
        ]));
        let judge = Arc::new(ScriptedJudge::new(HashMap::new()));

        let summary = run_for(store.clone(), judge).run().await.unwrap();

        assert_eq!(summary.clusters, 0);
        assert_eq!(summary.compared, 0);
        assert!(store.resolutions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_abstract_resolves_distinct_without_judging() {
        let store = Arc::new(StaticStore::new(vec![
            candidate(100, 1, "anchor abstract"),
            candidate(100, 2, ""),
        ]));
        let judge = Arc::new(ScriptedJudge::new(HashMap::new()));

        let summary = run_for(store.clone(), judge.clone()).run().await.unwrap();

        assert_eq!(judge.calls_for(2), 0);
        assert_eq!(summary.distinct, 1);
        assert_eq!(
            *store.resolutions.lock().unwrap(),
            vec![(2, DuplicateResolution::Distinct)]
        );
    }

    #[tokio::test]
    async fn test_judge_failure_is_bounded_and_run_continues() {
        let store = Arc::new(StaticStore::new(vec![
            candidate(100, 1, "anchor"),
            candidate(100, 2, "never parses"),
            candidate(200, 3, "anchor two"),
            candidate(200, 4, "fine"),
        ]));
        let judge = Arc::new(ScriptedJudge::new(HashMap::from([
            (2, JudgeScript::Fail),
            (4, JudgeScript::Same),
        ])));

        let summary = run_for(store.clone(), judge.clone()).run().await.unwrap();

        assert_eq!(judge.calls_for(2), 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.failures[0].article_id, 2);
        assert_eq!(
            *store.resolutions.lock().unwrap(),
            vec![(4, DuplicateResolution::Duplicate)]
        );
    }

    #[tokio::test]
    async fn test_stop_flag_halts_between_pairs() {
        let store = Arc::new(StaticStore::new(vec![
            candidate(100, 1, "anchor"),
            candidate(100, 2, "member"),
        ]));
        let judge = Arc::new(ScriptedJudge::new(HashMap::from([(2, JudgeScript::Same)])));
        let stop = StopFlag::new();
        stop.raise();

        let summary = run_for(store.clone(), judge)
            .with_stop_flag(stop)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.compared, 0);
        assert!(summary.stopped_early);
        assert!(store.resolutions.lock().unwrap().is_empty());
    }

    #[test]
    fn test_grouping_preserves_order() {
        let clusters = group_into_clusters(vec![
            candidate(200, 1, "a"),
            candidate(100, 2, "b"),
            candidate(200, 3, "c"),
        ]);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].0, 200);
        assert_eq!(
            clusters[0].1.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(clusters[1].0, 100);
    }
}
