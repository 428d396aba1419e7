//! Gemini API client implementation of the classifier boundary.
//!
//! Calls the generateContent REST endpoint and parses the model's JSON
//! decision strictly: code fences and surrounding prose are stripped, but a
//! decision that is not exactly include/exclude/maybe is rejected as a
//! classifier error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::classifier::prompt::{build_duplicate_prompt, build_screening_prompt};
use crate::classifier::{Classifier, DuplicateJudge};
use crate::domain::{Article, Confidence, Decision, DuplicateVerdict, Protocol, Verdict};
use crate::error::{Result, ScreenError};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Fallback retry-after for a 429 without a usable header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Gemini API client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

/// Raw decision shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct RawDecision {
    decision: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
}

/// Raw duplicate-verdict shape. `is_duplicate` has no default: a response
/// that omits it is rejected rather than silently treated as distinct.
#[derive(Debug, Deserialize)]
struct RawDuplicateVerdict {
    is_duplicate: bool,
    #[serde(default)]
    reason: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScreenError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Point the client at a different base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(prompt: &str) -> Value {
        json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ]
        })
    }

    fn map_status(status: StatusCode, retry_after: Option<Duration>) -> ScreenError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ScreenError::Auth(format!("classifier rejected the API key ({})", status))
            }
            StatusCode::TOO_MANY_REQUESTS => ScreenError::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            },
            s if s.is_server_error() => {
                ScreenError::Transient(format!("classifier returned {}", s))
            }
            // Other 4xx are deterministic; retrying the identical request
            // just burns the budget
            s if s.is_client_error() => {
                ScreenError::Rejected(format!("classifier rejected the request ({})", s))
            }
            s => ScreenError::Transient(format!("classifier returned {}", s)),
        }
    }

    async fn send(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.request_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(Self::map_status(status, retry_after));
        }

        response
            .json()
            .await
            .map_err(|e| ScreenError::Transient(format!("malformed classifier payload: {}", e)))
    }

    /// Pull the generated text out of the response body.
    fn response_text(body: &Value) -> Result<String> {
        let parts = body["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| ScreenError::Classifier("response has no content parts".to_string()))?;

        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(ScreenError::Classifier("response text is empty".to_string()));
        }
        Ok(text)
    }
}

/// Parse the model's text into a decision, strictly.
pub(crate) fn parse_decision(text: &str) -> Result<Decision> {
    let json_str = extract_json(text);

    let raw: RawDecision = serde_json::from_str(&json_str).map_err(|e| {
        ScreenError::Classifier(format!(
            "unparseable decision ({}): {}",
            e,
            truncate(text, 120)
        ))
    })?;

    let verdict = match raw.decision.trim().to_lowercase().as_str() {
        "include" => Verdict::Include,
        "exclude" => Verdict::Exclude,
        "maybe" => Verdict::Maybe,
        other => {
            return Err(ScreenError::Classifier(format!(
                "decision category {:?} is not include/exclude/maybe",
                other
            )));
        }
    };

    // Confidence is informational only; an odd value degrades to low
    // instead of rejecting an otherwise valid decision.
    let confidence = match raw.confidence.as_deref().map(|c| c.trim().to_lowercase()) {
        Some(c) if c == "high" => Confidence::High,
        Some(c) if c == "medium" => Confidence::Medium,
        Some(c) if c == "low" => Confidence::Low,
        Some(other) => {
            warn!(confidence = %other, "unrecognized confidence, treating as low");
            Confidence::Low
        }
        None => Confidence::Low,
    };

    let rationale = raw.reason.filter(|r| !r.trim().is_empty());

    Ok(Decision {
        verdict,
        rationale,
        confidence,
    })
}

/// Parse the model's text into a duplicate verdict, strictly.
pub(crate) fn parse_duplicate_verdict(text: &str) -> Result<DuplicateVerdict> {
    let json_str = extract_json(text);

    let raw: RawDuplicateVerdict = serde_json::from_str(&json_str).map_err(|e| {
        ScreenError::Classifier(format!(
            "unparseable duplicate verdict ({}): {}",
            e,
            truncate(text, 120)
        ))
    })?;

    Ok(DuplicateVerdict {
        is_duplicate: raw.is_duplicate,
        reason: raw.reason.filter(|r| !r.trim().is_empty()),
    })
}

/// Extract a JSON object from text that may be fenced or wrapped in prose.
fn extract_json(text: &str) -> String {
    let trimmed = text.trim();

    // Fenced block first
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let content_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        if let Some(end) = content.find("```") {
            return extract_braced(content[..end].trim()).unwrap_or_else(|| content[..end].trim().to_string());
        }
    }

    extract_braced(trimmed).unwrap_or_else(|| trimmed.to_string())
}

/// First balanced {...} span in the text, if any.
fn extract_braced(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        text.to_string()
    } else {
        let mut end = max_len;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

#[async_trait]
impl Classifier for GeminiClient {
    async fn classify(&self, article: &Article, protocol: &Protocol) -> Result<Decision> {
        let prompt = build_screening_prompt(article, protocol);
        let body = Self::build_request(&prompt);

        debug!(article_id = article.id, model = %self.model, "classifying article");
        let response = self.send(body).await?;
        let text = Self::response_text(&response)?;
        parse_decision(&text)
    }
}

#[async_trait]
impl DuplicateJudge for GeminiClient {
    async fn same_study(&self, left: &Article, right: &Article) -> Result<DuplicateVerdict> {
        let prompt = build_duplicate_prompt(left, right);
        let body = Self::build_request(&prompt);

        debug!(
            left_id = left.id,
            right_id = right.id,
            model = %self.model,
            "comparing suspected duplicates"
        );
        let response = self.send(body).await?;
        let text = Self::response_text(&response)?;
        parse_duplicate_verdict(&text)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never include the API key
        f.debug_struct("GeminiClient").field("model", &self.model).finish()
    }
}
