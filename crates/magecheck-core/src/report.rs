//! Risk report assembly

use serde::{Deserialize, Serialize};

/// Outcome of one analysis run
///
/// Optional fields stay optional all the way to presentation: a missing
/// `unexpected_requests` means the check was not performed, an empty one
/// means nothing unexpected was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Request view, present only when one was asked for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_requests: Option<Vec<String>>,
    /// Requests matching an indicator
    pub matched_indicators: Vec<String>,
    /// Requests outside the expectation set, present only when one was configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unexpected_requests: Option<Vec<String>>,
}

/// Presentation-level view of the expectation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectationOutcome<'a> {
    /// No expectation set was configured
    NotPerformed,
    /// Every request matched the expectation set
    AllExpected,
    /// Requests outside the expectation set
    Unexpected(&'a [String]),
}

/// Combine analysis results without altering them
pub fn assemble(
    projected: Option<Vec<String>>,
    matched_indicators: Vec<String>,
    unexpected_requests: Option<Vec<String>>,
) -> Report {
    Report {
        filtered_requests: projected,
        matched_indicators,
        unexpected_requests,
    }
}

impl Report {
    /// True if anything needs the analyst's attention
    pub fn has_findings(&self) -> bool {
        !self.matched_indicators.is_empty()
            || self
                .unexpected_requests
                .as_ref()
                .map(|u| !u.is_empty())
                .unwrap_or(false)
    }

    /// State of the expectation check
    pub fn expectation_outcome(&self) -> ExpectationOutcome<'_> {
        match &self.unexpected_requests {
            None => ExpectationOutcome::NotPerformed,
            Some(urls) if urls.is_empty() => ExpectationOutcome::AllExpected,
            Some(urls) => ExpectationOutcome::Unexpected(urls),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_is_passthrough() {
        let report = assemble(
            Some(vec!["https://a.com".into()]),
            vec!["https://evil.com/x".into(), "https://evil.com/x".into()],
            None,
        );

        assert_eq!(report.filtered_requests, Some(vec!["https://a.com".to_string()]));
        assert_eq!(report.matched_indicators.len(), 2);
        assert_eq!(report.unexpected_requests, None);
    }

    #[test]
    fn test_absent_fields_omitted_from_json() {
        let report = assemble(None, vec![], None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({ "matchedIndicators": [] }));

        let report = assemble(Some(vec![]), vec![], Some(vec![]));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "filteredRequests": [],
                "matchedIndicators": [],
                "unexpectedRequests": []
            })
        );
    }

    #[test]
    fn test_expectation_outcome() {
        assert_eq!(
            assemble(None, vec![], None).expectation_outcome(),
            ExpectationOutcome::NotPerformed
        );
        assert_eq!(
            assemble(None, vec![], Some(vec![])).expectation_outcome(),
            ExpectationOutcome::AllExpected
        );

        let report = assemble(None, vec![], Some(vec!["https://x.io".into()]));
        assert!(matches!(report.expectation_outcome(), ExpectationOutcome::Unexpected(u) if u.len() == 1));
    }

    #[test]
    fn test_has_findings() {
        assert!(!assemble(Some(vec!["https://a.com".into()]), vec![], None).has_findings());
        assert!(!assemble(None, vec![], Some(vec![])).has_findings());
        assert!(assemble(None, vec!["https://evil.com".into()], None).has_findings());
        assert!(assemble(None, vec![], Some(vec!["https://x.io".into()])).has_findings());
    }
}
