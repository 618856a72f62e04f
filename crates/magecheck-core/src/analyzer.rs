//! Analysis pipeline
//!
//! Runs projection and both classifiers over one immutable log and merges
//! their results into a [`Report`].

use crate::expectations::classify_unexpected;
use crate::indicators::classify_indicators;
use crate::log::TrafficLog;
use crate::patterns::{MatchOptions, PatternSet};
use crate::projector::{project, ViewConfig};
use crate::report::{assemble, Report};
use crate::Result;
use std::path::Path;

/// Analyzer holding the pattern sets for one run
#[derive(Debug)]
pub struct Analyzer {
    indicators: PatternSet,
    expectations: Option<PatternSet>,
}

impl Analyzer {
    /// Create analyzer from compiled sets
    pub fn new(indicators: PatternSet, expectations: Option<PatternSet>) -> Self {
        Self {
            indicators,
            expectations,
        }
    }

    /// Load both pattern files. The indicator file must exist; a missing
    /// expectation file (or none configured) disables that check.
    pub fn from_files(
        indicators: &Path,
        expectations: Option<&Path>,
        options: MatchOptions,
    ) -> Result<Self> {
        let indicators = PatternSet::load("indicators", indicators, options)?;
        let expectations = match expectations {
            Some(path) => PatternSet::load_optional("expectations", path, options)?,
            None => None,
        };

        tracing::info!(
            indicators = indicators.len(),
            expectations = ?expectations.as_ref().map(PatternSet::len),
            "Pattern sets loaded"
        );

        Ok(Self::new(indicators, expectations))
    }

    /// Analyze a log. `view` is `Some` only when a request listing was asked for.
    pub fn analyze(&self, log: &TrafficLog, view: Option<&ViewConfig>) -> Report {
        let start = std::time::Instant::now();

        let projected = view.map(|cfg| project(log, cfg));
        let matched = classify_indicators(log, &self.indicators);
        let unexpected = classify_unexpected(log, self.expectations.as_ref());

        tracing::info!(
            entries = log.len(),
            projected = ?projected.as_ref().map(Vec::len),
            matched = matched.len(),
            unexpected = ?unexpected.as_ref().map(Vec::len),
            time_us = start.elapsed().as_micros() as u64,
            "Analysis complete"
        );

        assemble(projected, matched, unexpected)
    }

    /// Indicator set
    pub fn indicators(&self) -> &PatternSet {
        &self.indicators
    }

    /// Expectation set, if configured
    pub fn expectations(&self) -> Option<&PatternSet> {
        self.expectations.as_ref()
    }
}
