//! Screening prompt construction.

use crate::domain::{Article, Protocol};

/// Build the screening prompt for one article.
///
/// The model is asked for a bare JSON object so the adapter can parse it
/// strictly. Articles with no abstract are still sent; the instructions
/// steer the model to a low-confidence maybe rather than a guess.
pub fn build_screening_prompt(article: &Article, protocol: &Protocol) -> String {
    let abstract_text = if article.has_abstract() {
        article.abstract_text.as_str()
    } else {
        "(no abstract available)"
    };

    format!(
        r#"You are an expert assistant conducting a systematic review screening.
Based on the provided inclusion and exclusion criteria, analyze the following article's title and abstract.

Screening criteria:
{criteria}

---
Article title: {title}
Article abstract: {abstract_text}
---

Decide whether this article should be "include", "exclude", or "maybe".
- Use "exclude" with a concise reason of a few words (e.g., "Not RCT", "Wrong Population", "Review Article").
- Use "maybe" when the title and abstract do not carry enough information to decide, including when the abstract is missing. Never guess.
- Report your confidence as "high", "medium", or "low".

Respond with ONLY a valid JSON object in this exact format, no markdown and no extra text:
{{"decision": "include" | "exclude" | "maybe", "reason": "short reason or null", "confidence": "high" | "medium" | "low"}}"#,
        criteria = protocol.text(),
        title = article.title,
        abstract_text = abstract_text,
    )
}

/// Build the pairwise duplicate-comparison prompt.
pub fn build_duplicate_prompt(left: &Article, right: &Article) -> String {
    format!(
        r#"You are an expert academic researcher. Your task is to determine if the two abstracts below describe the exact same study.
Focus on the core methodology, population, results, and conclusions. Ignore minor formatting or wording differences.

Abstract 1:
---
{left}
---

Abstract 2:
---
{right}
---

Respond with ONLY a valid JSON object in this exact format, no markdown and no extra text:
{{"is_duplicate": true | false, "reason": "brief explanation"}}"#,
        left = left.abstract_text,
        right = right.abstract_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_article_and_criteria() {
        let article = Article::new(1, "TAVR vs SAVR", "An RCT comparing...");
        let protocol = Protocol::new("Include only RCTs.").unwrap();

        let prompt = build_screening_prompt(&article, &protocol);
        assert!(prompt.contains("TAVR vs SAVR"));
        assert!(prompt.contains("An RCT comparing..."));
        assert!(prompt.contains("Include only RCTs."));
        assert!(prompt.contains("\"decision\""));
    }

    #[test]
    fn test_prompt_marks_missing_abstract() {
        let article = Article::new(2, "Title only", "");
        let protocol = Protocol::default();

        let prompt = build_screening_prompt(&article, &protocol);
        assert!(prompt.contains("(no abstract available)"));
    }

    #[test]
    fn test_duplicate_prompt_carries_both_abstracts() {
        let left = Article::new(1, "A", "First abstract text");
        let right = Article::new(2, "B", "Second abstract text");

        let prompt = build_duplicate_prompt(&left, &right);
        assert!(prompt.contains("First abstract text"));
        assert!(prompt.contains("Second abstract text"));
        assert!(prompt.contains("\"is_duplicate\""));
    }
}
