//! Indicator classification
//!
//! Flags every request whose raw URL contains a known-bad fragment. The
//! result keeps log order and repeats: a skimmer beacon fired three times
//! shows up three times.

use crate::log::TrafficLog;
use crate::patterns::PatternSet;

/// Request URLs matching any indicator, in log order, duplicates preserved
pub fn classify_indicators(log: &TrafficLog, indicators: &PatternSet) -> Vec<String> {
    let matched: Vec<String> = log
        .urls()
        .filter(|url| indicators.matches(url))
        .map(str::to_string)
        .collect();

    for url in &matched {
        tracing::debug!(set = indicators.name(), url = %url, "Indicator match");
    }

    matched
}
