//! Rayyan REST client implementation of the platform boundary.
//!
//! Wire shapes follow the platform's own web client: the results endpoint
//! is queried with the non-standard `SEARCH` HTTP method, and decisions are
//! POSTed to the customize endpoint as a "plan" object. Reasoned exclusions
//! use the platform's `__EXR__<reason>` label convention.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::domain::{Article, Decision, DuplicateCandidate, DuplicateResolution, Verdict};
use crate::error::{Result, ScreenError};
use crate::platform::{DuplicateStore, PlatformClient, Session};

const DEFAULT_BASE_URL: &str = "https://rayyan.ai/api/v1";

/// Fallback retry-after when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Rayyan API client, scoped to one review. Holds the session handle; used
/// by exactly one caller at a time.
pub struct RayyanClient {
    client: Client,
    base_url: String,
    session: Session,
    review_id: String,
    batch_size: usize,
    search_method: Method,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    data: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    abstracts: Vec<RawAbstract>,
    #[serde(default)]
    dedup_results: Option<RawDedupResults>,
}

#[derive(Debug, Deserialize)]
struct RawAbstract {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDedupResults {
    #[serde(default)]
    cluster_id: Option<u64>,
}

impl RayyanClient {
    /// Create a client with an already-valid session, scoped to `review_id`.
    pub fn new(
        session: Session,
        review_id: impl Into<String>,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScreenError::Config(format!("failed to create HTTP client: {}", e)))?;

        // SEARCH is not in reqwest's standard method set
        let search_method = Method::from_bytes(b"SEARCH")
            .map_err(|e| ScreenError::Config(format!("invalid HTTP method: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            session,
            review_id: review_id.into(),
            batch_size,
            search_method,
        })
    }

    /// Point the client at a different base URL (tests, self-hosted).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn results_url(&self, review_id: &str) -> String {
        format!("{}/reviews/{}/results", self.base_url, review_id)
    }

    fn customize_url(&self) -> String {
        format!("{}/reviews/{}/customize", self.base_url, self.review_id)
    }

    fn duplicates_url(&self, article_id: u64) -> String {
        format!(
            "{}/reviews/{}/duplicates/{}",
            self.base_url, self.review_id, article_id
        )
    }

    fn fetch_body(&self, start: usize) -> Value {
        json!({
            "start": start,
            "length": self.batch_size,
            "order": { "0": { "dir": "asc" } },
            "return_filtered_total": "false",
            "extra": { "mode": "undecided" }
        })
    }

    fn dedup_body(&self, start: usize) -> Value {
        json!({
            "start": start,
            "length": self.batch_size,
            "return_filtered_total": "false",
            "extra": { "dedup_result": 0 }
        })
    }

    /// Map a decision onto the platform's plan payload.
    fn plan_for(decision: &Decision) -> Value {
        match decision.verdict {
            Verdict::Include => json!({ "included": 1 }),
            Verdict::Exclude => match decision.rationale.as_deref() {
                Some(reason) if !reason.trim().is_empty() => {
                    let mut plan = serde_json::Map::new();
                    plan.insert(format!("__EXR__{}", reason.trim()), json!(1));
                    Value::Object(plan)
                }
                _ => json!({ "included": -1 }),
            },
            Verdict::Maybe => json!({ "included": 0 }),
        }
    }

    fn map_status(status: StatusCode, retry_after: Option<Duration>, context: &str) -> ScreenError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ScreenError::Auth(format!("platform rejected the session ({})", status))
            }
            StatusCode::NOT_FOUND => ScreenError::NotFound(context.to_string()),
            StatusCode::TOO_MANY_REQUESTS => ScreenError::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            },
            s if s.is_client_error() => {
                ScreenError::Rejected(format!("platform rejected {} ({})", context, s))
            }
            _ => ScreenError::Transient(format!("platform returned {} for {}", status, context)),
        }
    }

    async fn check(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        Err(Self::map_status(status, retry_after, context))
    }

    async fn fetch_raw_page(&self, review_id: &str, body: Value) -> Result<Vec<RawArticle>> {
        let request = self
            .client
            .request(self.search_method.clone(), self.results_url(review_id))
            .json(&body);
        let response = self.session.apply(request).send().await?;

        let context = format!("review {}", review_id);
        let response = Self::check(response, &context).await?;
        let body: ResultsResponse = response
            .json()
            .await
            .map_err(|e| ScreenError::Transient(format!("malformed results payload: {}", e)))?;

        Ok(body.data)
    }
}

fn article_from_raw(raw: RawArticle) -> Article {
    let abstract_text = raw
        .abstracts
        .into_iter()
        .find_map(|a| a.content)
        .unwrap_or_default();
    Article::new(raw.id, raw.title.unwrap_or_default(), abstract_text)
}

/// Articles the platform never clustered carry no cluster id and are
/// dropped from the dedup snapshot.
fn candidate_from_raw(raw: RawArticle) -> Option<DuplicateCandidate> {
    let cluster_id = raw.dedup_results.as_ref()?.cluster_id?;
    Some(DuplicateCandidate {
        cluster_id,
        article: article_from_raw(raw),
    })
}

#[async_trait]
impl PlatformClient for RayyanClient {
    async fn list_undecided(&self, review_id: &str) -> Result<Vec<Article>> {
        let mut snapshot = Vec::new();
        let mut start = 0;
        loop {
            let page = self.fetch_raw_page(review_id, self.fetch_body(start)).await?;
            let count = page.len();
            debug!(review_id, start, count, "fetched results page");
            snapshot.extend(page.into_iter().map(article_from_raw));
            if count < self.batch_size {
                break;
            }
            start += count;
        }
        info!(review_id, total = snapshot.len(), "undecided snapshot complete");
        Ok(snapshot)
    }

    async fn update_status(&self, article_id: u64, decision: &Decision) -> Result<()> {
        let payload = json!({
            "article_id": article_id,
            "plan": Self::plan_for(decision),
        });

        let request = self.client.post(self.customize_url()).json(&payload);
        let response = self.session.apply(request).send().await?;

        let context = format!("article {}", article_id);
        Self::check(response, &context).await?;
        debug!(article_id, verdict = %decision.verdict, "decision recorded");
        Ok(())
    }
}

#[async_trait]
impl DuplicateStore for RayyanClient {
    async fn list_unresolved(&self, review_id: &str) -> Result<Vec<DuplicateCandidate>> {
        let mut candidates = Vec::new();
        let mut start = 0;
        loop {
            let page = self.fetch_raw_page(review_id, self.dedup_body(start)).await?;
            let count = page.len();
            debug!(review_id, start, count, "fetched duplicates page");
            candidates.extend(page.into_iter().filter_map(candidate_from_raw));
            if count < self.batch_size {
                break;
            }
            start += count;
        }
        info!(
            review_id,
            total = candidates.len(),
            "unresolved duplicates snapshot complete"
        );
        Ok(candidates)
    }

    async fn resolve_duplicate(
        &self,
        article_id: u64,
        resolution: DuplicateResolution,
    ) -> Result<()> {
        let payload = json!({
            "duplicate_action": resolution.action_code(),
            "isDeletedArticle": false,
        });

        let request = self.client.patch(self.duplicates_url(article_id)).json(&payload);
        let response = self.session.apply(request).send().await?;

        let context = format!("article {}", article_id);
        Self::check(response, &context).await?;
        debug!(article_id, %resolution, "duplicate resolution recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> RayyanClient {
        RayyanClient::new(
            Session::bearer("test-token"),
            "12345",
            Duration::from_secs(5),
            50,
        )
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let client = test_client().with_base_url("http://localhost:9999/api/v1");
        assert_eq!(
            client.results_url("12345"),
            "http://localhost:9999/api/v1/reviews/12345/results"
        );
        assert_eq!(
            client.customize_url(),
            "http://localhost:9999/api/v1/reviews/12345/customize"
        );
    }

    #[test]
    fn test_fetch_body_shape() {
        let client = test_client();
        let body = client.fetch_body(100);
        assert_eq!(body["start"], 100);
        assert_eq!(body["length"], 50);
        assert_eq!(body["extra"]["mode"], "undecided");
    }

    #[test]
    fn test_dedup_body_shape() {
        let client = test_client();
        let body = client.dedup_body(0);
        assert_eq!(body["start"], 0);
        assert_eq!(body["extra"]["dedup_result"], 0);
        assert!(body["extra"]["mode"].is_null());
    }

    #[test]
    fn test_duplicates_url() {
        let client = test_client().with_base_url("http://localhost:9999/api/v1");
        assert_eq!(
            client.duplicates_url(77),
            "http://localhost:9999/api/v1/reviews/12345/duplicates/77"
        );
    }

    #[test]
    fn test_plan_include() {
        let plan = RayyanClient::plan_for(&Decision::include());
        assert_eq!(plan, json!({ "included": 1 }));
    }

    #[test]
    fn test_plan_exclude_with_reason() {
        let plan = RayyanClient::plan_for(&Decision::exclude("Not RCT"));
        assert_eq!(plan, json!({ "__EXR__Not RCT": 1 }));
    }

    #[test]
    fn test_plan_exclude_without_reason() {
        let mut decision = Decision::exclude("  ");
        let plan = RayyanClient::plan_for(&decision);
        assert_eq!(plan, json!({ "included": -1 }));

        decision.rationale = None;
        let plan = RayyanClient::plan_for(&decision);
        assert_eq!(plan, json!({ "included": -1 }));
    }

    #[test]
    fn test_plan_maybe() {
        let plan = RayyanClient::plan_for(&Decision::maybe("unclear population"));
        assert_eq!(plan, json!({ "included": 0 }));
    }

    #[test]
    fn test_map_status_auth() {
        let err = RayyanClient::map_status(StatusCode::UNAUTHORIZED, None, "review 1");
        assert!(matches!(err, ScreenError::Auth(_)));
        let err = RayyanClient::map_status(StatusCode::FORBIDDEN, None, "review 1");
        assert!(matches!(err, ScreenError::Auth(_)));
    }

    #[test]
    fn test_map_status_not_found() {
        let err = RayyanClient::map_status(StatusCode::NOT_FOUND, None, "review 999");
        match err {
            ScreenError::NotFound(ctx) => assert_eq!(ctx, "review 999"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_map_status_rate_limited_honors_header() {
        let err = RayyanClient::map_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(17)),
            "review 1",
        );
        match err {
            ScreenError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(17));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_map_status_rate_limited_default() {
        let err = RayyanClient::map_status(StatusCode::TOO_MANY_REQUESTS, None, "review 1");
        match err {
            ScreenError::RateLimited { retry_after } => {
                assert_eq!(retry_after, DEFAULT_RETRY_AFTER);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_map_status_server_error_is_transient() {
        let err = RayyanClient::map_status(StatusCode::BAD_GATEWAY, None, "review 1");
        assert!(matches!(err, ScreenError::Transient(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_status_client_error_is_not_retried() {
        let err = RayyanClient::map_status(StatusCode::BAD_REQUEST, None, "article 7");
        assert!(matches!(err, ScreenError::Rejected(_)));
        assert!(!err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_article_not_found_is_not_run_fatal() {
        // Article-level 404s are per-article failures; only an unknown
        // review at snapshot fetch aborts the run
        let err = RayyanClient::map_status(StatusCode::NOT_FOUND, None, "article 7");
        assert!(matches!(err, ScreenError::NotFound(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_article_from_raw() {
        let raw: RawArticle = serde_json::from_value(json!({
            "id": 7,
            "title": "TAVR vs SAVR in low-risk patients",
            "abstracts": [ { "content": "Background..." }, { "content": "Second" } ]
        }))
        .unwrap();

        let article = article_from_raw(raw);
        assert_eq!(article.id, 7);
        assert_eq!(article.abstract_text, "Background...");
    }

    #[test]
    fn test_article_from_raw_missing_fields() {
        let raw: RawArticle = serde_json::from_value(json!({ "id": 8 })).unwrap();
        let article = article_from_raw(raw);
        assert_eq!(article.id, 8);
        assert!(article.title.is_empty());
        assert!(!article.has_abstract());
    }

    #[test]
    fn test_results_response_without_data() {
        let body: ResultsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.data.is_empty());
    }

    #[test]
    fn test_candidate_from_raw() {
        let raw: RawArticle = serde_json::from_value(json!({
            "id": 11,
            "title": "Suspected duplicate",
            "abstracts": [ { "content": "Background..." } ],
            "dedup_results": { "cluster_id": 904 }
        }))
        .unwrap();

        let candidate = candidate_from_raw(raw).unwrap();
        assert_eq!(candidate.cluster_id, 904);
        assert_eq!(candidate.article.id, 11);
        assert!(candidate.article.has_abstract());
    }

    #[test]
    fn test_unclustered_article_is_dropped() {
        let raw: RawArticle = serde_json::from_value(json!({ "id": 12 })).unwrap();
        assert!(candidate_from_raw(raw).is_none());

        let raw: RawArticle =
            serde_json::from_value(json!({ "id": 13, "dedup_results": {} })).unwrap();
        assert!(candidate_from_raw(raw).is_none());
    }

    #[test]
    fn test_resolution_payload_codes() {
        assert_eq!(DuplicateResolution::Duplicate.action_code(), 1);
        assert_eq!(DuplicateResolution::Distinct.action_code(), 2);
    }
}
