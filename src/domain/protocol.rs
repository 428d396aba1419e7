//! The screening protocol: fixed PICO inclusion/exclusion criteria.
//!
//! The protocol is externally authored and immutable for the lifetime of a
//! run. A built-in default is provided; operators normally point
//! `protocol-path` at their own criteria file.

use crate::error::{Result, ScreenError};
use std::path::Path;

/// Default criteria for the aortic valve replacement review the tool was
/// first built for. Kept as a working example of the expected shape.
const DEFAULT_CRITERIA: &str = r#"Screening for a systematic review and meta-analysis on aortic valve replacement.

PICO framework:
- Population: adult patients with severe aortic stenosis at LOW SURGICAL RISK (e.g., STS score < 4%).
- Intervention: Transcatheter Aortic Valve Replacement (TAVR or TAVI).
- Comparator: Surgical Aortic Valve Replacement (SAVR); the study MUST compare TAVR directly against SAVR.
- Outcomes: long-term (>= 1 year) clinical outcomes such as mortality, stroke, reintervention, or MACCE.

Inclusion criteria:
1. Study design must be a Randomized Controlled Trial (RCT).
2. The cohort must be explicitly low-risk.
3. Direct TAVR vs SAVR comparison.

Exclusion criteria:
1. Non-RCTs: observational studies, cohort studies, registries, case series, case reports, editorials, letters, systematic reviews, meta-analyses.
2. Intermediate- or high-risk populations, pediatric studies, conditions other than aortic stenosis.
3. No TAVR vs SAVR comparison (single-arm studies, TAVR vs medical therapy, device-vs-device comparisons).
4. Procedural, imaging, or economic analyses without clinical outcomes.
5. Animal studies.
"#;

/// Immutable inclusion/exclusion criteria for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    text: String,
}

impl Protocol {
    /// Create a protocol from criteria text. Empty criteria are rejected;
    /// classifying against nothing would silently include everything.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ScreenError::Config("protocol criteria are empty".to_string()));
        }
        Ok(Self { text })
    }

    /// Load criteria from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path)?;
        Self::new(text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            text: DEFAULT_CRITERIA.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_protocol_mentions_pico() {
        let protocol = Protocol::default();
        assert!(protocol.text().contains("Population"));
        assert!(protocol.text().contains("Intervention"));
        assert!(protocol.text().contains("Exclusion criteria"));
    }

    #[test]
    fn test_empty_protocol_rejected() {
        assert!(Protocol::new("").is_err());
        assert!(Protocol::new("   \n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Include only RCTs on topic X.").unwrap();

        let protocol = Protocol::from_file(file.path()).unwrap();
        assert!(protocol.text().contains("RCTs"));
    }

    #[test]
    fn test_from_missing_file() {
        let result = Protocol::from_file("/nonexistent/criteria.txt");
        assert!(matches!(result, Err(ScreenError::Io(_))));
    }
}
