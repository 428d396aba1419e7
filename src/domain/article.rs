//! Article records as seen on the review platform.

use serde::{Deserialize, Serialize};

/// Decision state of an article on the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// No decision recorded yet
    #[default]
    Undecided,
    /// Included in the review
    Include,
    /// Excluded from the review
    Exclude,
    /// Flagged for manual follow-up
    Maybe,
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArticleStatus::Undecided => "undecided",
            ArticleStatus::Include => "include",
            ArticleStatus::Exclude => "exclude",
            ArticleStatus::Maybe => "maybe",
        };
        write!(f, "{}", s)
    }
}

/// One article in the review queue.
///
/// Owned by the platform; this is a read snapshot. The only mutation this
/// system ever performs is an explicit status update through the platform
/// client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Platform-assigned identifier
    pub id: u64,

    /// Title, possibly empty for malformed imports
    #[serde(default)]
    pub title: String,

    /// First abstract text, empty when the import carried none
    #[serde(default)]
    pub abstract_text: String,

    /// Current decision status
    #[serde(default)]
    pub status: ArticleStatus,
}

impl Article {
    /// Create an undecided article.
    pub fn new(id: u64, title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            abstract_text: abstract_text.into(),
            status: ArticleStatus::Undecided,
        }
    }

    /// Whether there is any abstract text to screen on.
    ///
    /// Articles without an abstract are still classified; the protocol
    /// instructs the model to answer maybe when the text is insufficient.
    pub fn has_abstract(&self) -> bool {
        !self.abstract_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_article_is_undecided() {
        let article = Article::new(42, "TAVR vs SAVR", "An RCT of...");
        assert_eq!(article.status, ArticleStatus::Undecided);
        assert_eq!(article.id, 42);
    }

    #[test]
    fn test_has_abstract() {
        assert!(Article::new(1, "t", "some text").has_abstract());
        assert!(!Article::new(2, "t", "").has_abstract());
        assert!(!Article::new(3, "t", "   ").has_abstract());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ArticleStatus::Undecided.to_string(), "undecided");
        assert_eq!(ArticleStatus::Include.to_string(), "include");
        assert_eq!(ArticleStatus::Exclude.to_string(), "exclude");
        assert_eq!(ArticleStatus::Maybe.to_string(), "maybe");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ArticleStatus::Include).unwrap();
        assert_eq!(json, "\"include\"");

        let status: ArticleStatus = serde_json::from_str("\"maybe\"").unwrap();
        assert_eq!(status, ArticleStatus::Maybe);
    }

    #[test]
    fn test_article_deserialization_defaults() {
        let article: Article = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(article.id, 7);
        assert!(article.title.is_empty());
        assert_eq!(article.status, ArticleStatus::Undecided);
    }
}
