//! Where a traffic log comes from and what its saved copy is called

use std::path::{Path, PathBuf};
use url::Url;

/// Origin of the traffic log under analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficSource {
    /// Page to load in a browser and record
    Capture(Url),
    /// Previously saved HAR file
    File(PathBuf),
}

impl TrafficSource {
    /// Classify a user-supplied target: `http(s)` URLs are captured, anything else is a path
    pub fn parse(target: &str) -> Self {
        let lower = target.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            if let Ok(url) = Url::parse(target) {
                return Self::Capture(url);
            }
        }
        Self::File(PathBuf::from(target))
    }

    /// Name the saved log is keyed by
    pub fn log_name(&self) -> String {
        let raw = match self {
            Self::Capture(url) => url_log_name(url),
            Self::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let name = sanitize(&raw);
        if name.is_empty() {
            "capture".to_string()
        } else {
            name
        }
    }

    /// Path of the log file, for file sources
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Capture(_) => None,
        }
    }
}

impl std::fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capture(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// Last non-empty path segment, falling back to the host
fn url_log_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
