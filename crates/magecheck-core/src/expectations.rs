//! Expectation classification
//!
//! The inverse of indicator matching: with an allowlist of expected
//! destinations, every request matching none of them is reported. Without
//! an allowlist no check is performed, which is not the same as finding
//! nothing.

use crate::log::TrafficLog;
use crate::patterns::PatternSet;

/// Request URLs outside the expectation set, in log order, duplicates
/// preserved. `None` when no expectation set was configured.
pub fn classify_unexpected(
    log: &TrafficLog,
    expectations: Option<&PatternSet>,
) -> Option<Vec<String>> {
    let expectations = expectations?;

    let unexpected: Vec<String> = log
        .urls()
        .filter(|url| !expectations.matches(url))
        .map(str::to_string)
        .collect();

    tracing::debug!(
        set = expectations.name(),
        unexpected = unexpected.len(),
        "Expectation check complete"
    );

    Some(unexpected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::RequestEntry;
    use crate::patterns::MatchOptions;

    fn log(urls: &[&str]) -> TrafficLog {
        urls.iter().copied().map(RequestEntry::new).collect()
    }

    fn expected(fragments: &str) -> PatternSet {
        PatternSet::from_text("expectations", fragments, MatchOptions::default()).unwrap()
    }

    #[test]
    fn test_absent_set_is_not_empty_result() {
        let log = log(&["https://evil.com/b"]);
        assert_eq!(classify_unexpected(&log, None), None);
    }

    #[test]
    fn test_inverse_logic() {
        let log = log(&["https://trusted.com/a", "https://evil.com/b"]);
        let set = expected("trusted.com");

        assert_eq!(
            classify_unexpected(&log, Some(&set)),
            Some(vec!["https://evil.com/b".to_string()])
        );
    }

    #[test]
    fn test_all_expected_gives_empty_list() {
        let log = log(&["https://trusted.com/a", "https://cdn.trusted.com/b"]);
        assert_eq!(classify_unexpected(&log, Some(&expected("trusted.com"))), Some(Vec::new()));
    }

    #[test]
    fn test_duplicates_preserved() {
        let log = log(&["https://x.io/1", "https://trusted.com/", "https://x.io/1"]);
        assert_eq!(
            classify_unexpected(&log, Some(&expected("trusted.com"))).unwrap(),
            vec!["https://x.io/1", "https://x.io/1"]
        );
    }
}
