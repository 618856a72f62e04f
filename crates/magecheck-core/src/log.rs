//! Normalized traffic log
//!
//! The analysis engine never sees the on-disk format. Whatever produced the
//! capture is reduced to an ordered list of [`RequestEntry`] values, one per
//! completed exchange, and frozen into a [`TrafficLog`].

use url::Url;

/// A single request/response exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEntry {
    /// Request URL exactly as recorded
    pub request_url: String,
    /// Response headers in wire order, empty when no response arrived
    pub response_headers: Vec<(String, String)>,
}

impl RequestEntry {
    /// Create entry without response headers
    pub fn new(request_url: impl Into<String>) -> Self {
        Self {
            request_url: request_url.into(),
            response_headers: Vec::new(),
        }
    }

    /// Append a response header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers.push((name.into(), value.into()));
        self
    }

    /// Values of every `content-type` header (name compared case-insensitively)
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.response_headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    /// Structural decomposition of the URL, `None` when it does not parse
    pub fn parsed_url(&self) -> Option<Url> {
        Url::parse(&self.request_url).ok()
    }
}

/// Ordered, immutable record of one page load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficLog {
    entries: Vec<RequestEntry>,
}

impl TrafficLog {
    /// Freeze entries into a log
    pub fn new(entries: Vec<RequestEntry>) -> Self {
        Self { entries }
    }

    /// Entries in capture order
    pub fn entries(&self) -> &[RequestEntry] {
        &self.entries
    }

    /// Raw request URLs in capture order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.request_url.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RequestEntry> for TrafficLog {
    fn from_iter<I: IntoIterator<Item = RequestEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types_case_insensitive_name() {
        let entry = RequestEntry::new("https://a.com/logo.png")
            .with_header("Cache-Control", "max-age=60")
            .with_header("Content-Type", "image/png")
            .with_header("content-type", "image/webp");

        let types: Vec<_> = entry.content_types().collect();
        assert_eq!(types, vec!["image/png", "image/webp"]);
    }

    #[test]
    fn test_parsed_url() {
        assert!(RequestEntry::new("https://a.com/x").parsed_url().is_some());
        assert!(RequestEntry::new("not a url").parsed_url().is_none());
    }

    #[test]
    fn test_log_preserves_order() {
        let log: TrafficLog = ["https://b.com", "https://a.com", "https://b.com"]
            .into_iter()
            .map(RequestEntry::new)
            .collect();

        assert_eq!(log.len(), 3);
        let urls: Vec<_> = log.urls().collect();
        assert_eq!(urls, vec!["https://b.com", "https://a.com", "https://b.com"]);
    }
}
