//! Screening decisions produced by the classifier.

use serde::{Deserialize, Serialize};

use super::article::ArticleStatus;

/// Categorical screening verdict.
///
/// The classifier adapter guarantees that every decision maps to exactly one
/// of these; anything else is rejected at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Include,
    Exclude,
    Maybe,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Include => "include",
            Verdict::Exclude => "exclude",
            Verdict::Maybe => "maybe",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Verdict> for ArticleStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Include => ArticleStatus::Include,
            Verdict::Exclude => ArticleStatus::Exclude,
            Verdict::Maybe => ArticleStatus::Maybe,
        }
    }
}

/// Self-reported confidence of the classifier.
///
/// Non-determinism of the underlying model is an accepted limitation; the
/// confidence level is informational, not a correctness signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

/// One screening decision for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,

    /// Free-text rationale; required for exclusions, optional otherwise
    pub rationale: Option<String>,

    pub confidence: Confidence,
}

impl Decision {
    pub fn include() -> Self {
        Self {
            verdict: Verdict::Include,
            rationale: None,
            confidence: Confidence::default(),
        }
    }

    pub fn exclude(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Exclude,
            rationale: Some(reason.into()),
            confidence: Confidence::default(),
        }
    }

    pub fn maybe(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Maybe,
            rationale: Some(reason.into()),
            confidence: Confidence::default(),
        }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}
