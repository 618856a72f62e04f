//! magecheck core - traffic log analysis for web skimmer audits
//!
//! Takes the network traffic recorded during one page load and answers two
//! questions for the analyst: which requests hit a known skimmer indicator,
//! and which requests went somewhere outside the expected destinations.
//! It also renders a filtered, deduplicated view of the requests.
//!
//! # Pipeline
//!
//! ```text
//!   HAR file / browser capture
//!              │
//!              ▼
//!        ┌───────────┐
//!        │TrafficLog │  immutable, one page load
//!        └─────┬─────┘
//!     ┌────────┼──────────────┐
//!     ▼        ▼              ▼
//! ┌────────┐ ┌──────────┐ ┌────────────┐
//! │Project │ │Indicators│ │Expectations│
//! └───┬────┘ └────┬─────┘ └─────┬──────┘
//!     └───────────┼─────────────┘
//!                 ▼
//!             ┌──────┐
//!             │Report│
//!             └──────┘
//! ```
//!
//! The three analyses are independent pure functions over the same log.

#![warn(missing_docs)]

pub mod analyzer;
pub mod error;
pub mod expectations;
pub mod har;
pub mod indicators;
pub mod log;
pub mod patterns;
pub mod projector;
pub mod report;
pub mod source;

pub use analyzer::Analyzer;
pub use error::{MagecheckError, Result};
pub use expectations::classify_unexpected;
pub use har::Har;
pub use indicators::classify_indicators;
pub use log::{RequestEntry, TrafficLog};
pub use patterns::{MatchOptions, Matcher, PatternSet, PatternSyntax};
pub use projector::{project, UrlShape, ViewConfig};
pub use report::{assemble, ExpectationOutcome, Report};
pub use source::TrafficSource;
