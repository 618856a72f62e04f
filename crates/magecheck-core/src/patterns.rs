//! Pattern set compilation
//!
//! A pattern list is a plain text file with one fragment per line. The
//! fragments are compiled once into a single matcher that answers "does
//! this URL contain any of them", either as one regex alternation or as an
//! Aho-Corasick automaton over literals.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::{MagecheckError, Result};

/// How fragments are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSyntax {
    /// Regular expression fragments joined into one alternation
    #[default]
    Regex,
    /// Literal substrings
    Literal,
}

/// Compilation options shared by every pattern set in a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Fragment syntax
    pub syntax: PatternSyntax,
    /// Ignore case when matching. Literal sets fold ASCII only.
    pub case_insensitive: bool,
}

/// Multi-fragment matcher
pub trait Matcher: Send + Sync + fmt::Debug {
    /// True if any fragment occurs anywhere in `text`
    fn matches_any(&self, text: &str) -> bool;
}

/// Single compiled alternation `(?:f1)|(?:f2)|...`
#[derive(Debug)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    fn build(set: &str, fragments: &[String], case_insensitive: bool) -> Result<Self> {
        // Compile individually first so the error names the offending line
        for fragment in fragments {
            let regex = Regex::new(fragment).map_err(|e| MagecheckError::InvalidPattern {
                set: set.to_string(),
                reason: format!("{:?}: {}", fragment, e),
            })?;
            // A fragment matching "" occurs in every URL
            if regex.is_match("") {
                return Err(MagecheckError::InvalidPattern {
                    set: set.to_string(),
                    reason: format!("{:?} matches the empty string", fragment),
                });
            }
        }

        let alternation = fragments
            .iter()
            .map(|f| format!("(?:{})", f))
            .collect::<Vec<_>>()
            .join("|");

        let regex = RegexBuilder::new(&alternation)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| MagecheckError::InvalidPattern {
                set: set.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { regex })
    }
}

impl Matcher for RegexMatcher {
    #[inline]
    fn matches_any(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Aho-Corasick automaton over literal fragments
#[derive(Debug)]
pub struct LiteralMatcher {
    automaton: AhoCorasick,
}

impl LiteralMatcher {
    fn build(set: &str, fragments: &[String], case_insensitive: bool) -> Result<Self> {
        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .ascii_case_insensitive(case_insensitive)
            .build(fragments)
            .map_err(|e| MagecheckError::InvalidPattern {
                set: set.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { automaton })
    }
}

impl Matcher for LiteralMatcher {
    #[inline]
    fn matches_any(&self, text: &str) -> bool {
        self.automaton.is_match(text)
    }
}

/// Compiled, non-empty pattern set
#[derive(Debug)]
pub struct PatternSet {
    name: String,
    fragments: Vec<String>,
    matcher: Box<dyn Matcher>,
}

impl PatternSet {
    /// Compile fragments. Fails on an empty list, an empty fragment or a
    /// regex fragment that matches the empty string, any of which would
    /// match every URL.
    pub fn compile(
        name: impl Into<String>,
        fragments: Vec<String>,
        options: MatchOptions,
    ) -> Result<Self> {
        let name = name.into();

        if fragments.is_empty() {
            return Err(MagecheckError::EmptyPatternSet(name));
        }
        if let Some(pos) = fragments.iter().position(|f| f.is_empty()) {
            return Err(MagecheckError::InvalidPattern {
                set: name,
                reason: format!("fragment {} is empty", pos + 1),
            });
        }

        let matcher: Box<dyn Matcher> = match options.syntax {
            PatternSyntax::Regex => {
                Box::new(RegexMatcher::build(&name, &fragments, options.case_insensitive)?)
            }
            PatternSyntax::Literal => {
                Box::new(LiteralMatcher::build(&name, &fragments, options.case_insensitive)?)
            }
        };

        tracing::debug!(
            set = %name,
            fragments = fragments.len(),
            syntax = ?options.syntax,
            case_insensitive = options.case_insensitive,
            "Compiled pattern set"
        );

        Ok(Self {
            name,
            fragments,
            matcher,
        })
    }

    /// Compile from pattern-file text
    pub fn from_text(name: impl Into<String>, text: &str, options: MatchOptions) -> Result<Self> {
        Self::compile(name, parse_fragments(text), options)
    }

    /// Load a pattern file that must exist
    pub fn load(name: impl Into<String>, path: &Path, options: MatchOptions) -> Result<Self> {
        match Self::load_optional(name, path, options)? {
            Some(set) => Ok(set),
            None => Err(MagecheckError::PatternsNotFound(path.to_path_buf())),
        }
    }

    /// Load a pattern file whose absence is normal; a missing file yields `None`
    pub fn load_optional(
        name: impl Into<String>,
        path: &Path,
        options: MatchOptions,
    ) -> Result<Option<Self>> {
        let name = name.into();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(set = %name, path = %path.display(), "Pattern file not present");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_text(name, &text, options).map(Some)
    }

    /// Test a URL against the set
    #[inline]
    pub fn matches(&self, url: &str) -> bool {
        self.matcher.matches_any(url)
    }

    /// Set name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fragments in file order
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Number of fragments
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Always false for a compiled set
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Split pattern-file text into fragments. Lines are trimmed; blank lines
/// and `#` comments are skipped.
pub fn parse_fragments(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
