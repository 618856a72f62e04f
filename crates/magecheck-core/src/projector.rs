//! Request projection
//!
//! Produces the request list shown to the analyst: entries are filtered by
//! response content type, their URLs reshaped, then deduplicated and sorted.

use crate::log::{RequestEntry, TrafficLog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

/// How much of each URL is kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlShape {
    /// URL exactly as recorded
    #[default]
    Full,
    /// Origin and path, query and fragment dropped
    NoParams,
    /// Origin only (scheme, host, non-default port)
    DomainOnly,
}

/// Projection settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewConfig {
    /// Content-type substrings; `None` lets every entry through
    pub content_type_filter: Option<Vec<String>>,
    /// URL rendering
    pub url_shape: UrlShape,
}

impl ViewConfig {
    /// Unfiltered view with the given shape
    pub fn new(url_shape: UrlShape) -> Self {
        Self {
            content_type_filter: None,
            url_shape,
        }
    }

    /// Restrict to entries whose content type contains any of `terms`.
    /// Terms are trimmed and blank ones dropped; an empty list leaves the
    /// view unfiltered.
    pub fn with_content_types<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(Into::into)
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty())
            .collect();
        self.content_type_filter = if terms.is_empty() { None } else { Some(terms) };
        self
    }
}

/// Filter, shape, deduplicate and sort the requests in `log`
pub fn project(log: &TrafficLog, cfg: &ViewConfig) -> Vec<String> {
    let filter = ContentTypeFilter::new(cfg.content_type_filter.as_deref());

    let shaped: BTreeSet<String> = log
        .entries()
        .iter()
        .filter(|entry| filter.accepts(entry))
        .filter_map(|entry| shape_url(&entry.request_url, cfg.url_shape))
        .collect();

    shaped.into_iter().collect()
}

// Terms are lowercased once up front
struct ContentTypeFilter {
    terms: Option<Vec<String>>,
}

impl ContentTypeFilter {
    fn new(terms: Option<&[String]>) -> Self {
        Self {
            terms: terms.map(|t| t.iter().map(|s| s.to_lowercase()).collect()),
        }
    }

    fn accepts(&self, entry: &RequestEntry) -> bool {
        let Some(terms) = &self.terms else {
            return true;
        };

        entry.content_types().any(|value| {
            let value = value.to_lowercase();
            terms.iter().any(|term| value.contains(term.as_str()))
        })
    }
}

/// Render one URL in the requested shape. `None` when the URL cannot be
/// decomposed far enough for that shape.
pub fn shape_url(raw: &str, shape: UrlShape) -> Option<String> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(url = raw, error = %e, "Unparseable URL left out of request view");
            return None;
        }
    };

    match shape {
        UrlShape::Full => Some(raw.to_string()),
        UrlShape::NoParams => origin(&url).map(|o| format!("{}{}", o, url.path())),
        UrlShape::DomainOnly => origin(&url),
    }
}

// data:, about: and similar schemes have no network origin
fn origin(url: &Url) -> Option<String> {
    let origin = url.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        tracing::debug!(url = %url, "URL has no network origin");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn png(url: &str) -> RequestEntry {
        RequestEntry::new(url).with_header("content-type", "image/png")
    }

    fn html(url: &str) -> RequestEntry {
        RequestEntry::new(url).with_header("Content-Type", "text/html; charset=utf-8")
    }

    #[test]
    fn test_shape_transforms() {
        let url = "https://a.com/x/y?z=1";
        assert_eq!(shape_url(url, UrlShape::Full).unwrap(), "https://a.com/x/y?z=1");
        assert_eq!(shape_url(url, UrlShape::NoParams).unwrap(), "https://a.com/x/y");
        assert_eq!(shape_url(url, UrlShape::DomainOnly).unwrap(), "https://a.com");
    }

    #[test]
    fn test_shape_keeps_explicit_port() {
        let url = "http://shop.example:8080/pay?card=1#top";
        assert_eq!(
            shape_url(url, UrlShape::NoParams).unwrap(),
            "http://shop.example:8080/pay"
        );
        assert_eq!(
            shape_url(url, UrlShape::DomainOnly).unwrap(),
            "http://shop.example:8080"
        );
        assert_eq!(
            shape_url("https://shop.example:443/", UrlShape::DomainOnly).unwrap(),
            "https://shop.example"
        );
    }

    #[test]
    fn test_opaque_origin() {
        let data = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(shape_url(data, UrlShape::Full).unwrap(), data);
        assert!(shape_url(data, UrlShape::NoParams).is_none());
        assert!(shape_url(data, UrlShape::DomainOnly).is_none());
    }

    #[test]
    fn test_content_type_filter() {
        let log = TrafficLog::new(vec![
            png("https://a.com/logo.png"),
            html("https://a.com/"),
            RequestEntry::new("https://a.com/failed"),
        ]);
        let cfg = ViewConfig::new(UrlShape::Full).with_content_types(["png"]);

        assert_eq!(project(&log, &cfg), vec!["https://a.com/logo.png"]);
    }

    #[test]
    fn test_blank_filter_terms_dropped() {
        let log = TrafficLog::new(vec![png("https://a.com/logo.png"), html("https://a.com/p.html")]);

        let cfg = ViewConfig::new(UrlShape::Full).with_content_types(["png", "", "  "]);
        assert_eq!(cfg.content_type_filter, Some(vec!["png".to_string()]));
        assert_eq!(project(&log, &cfg), vec!["https://a.com/logo.png"]);

        let cfg = ViewConfig::new(UrlShape::Full).with_content_types([" ", ""]);
        assert_eq!(cfg.content_type_filter, None);
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let log = TrafficLog::new(vec![
            RequestEntry::new("https://a.com/app.js")
                .with_header("CONTENT-TYPE", "Application/JavaScript"),
            html("https://a.com/"),
        ]);
        let cfg = ViewConfig::new(UrlShape::Full).with_content_types(["JAVASCRIPT", "xml"]);

        assert_eq!(project(&log, &cfg), vec!["https://a.com/app.js"]);
    }

    #[test]
    fn test_unfiltered_view_keeps_headerless_entries() {
        let log = TrafficLog::new(vec![
            RequestEntry::new("https://b.com/x"),
            png("https://a.com/logo.png"),
        ]);

        assert_eq!(
            project(&log, &ViewConfig::default()),
            vec!["https://a.com/logo.png", "https://b.com/x"]
        );
        assert_eq!(
            ViewConfig::new(UrlShape::Full).with_content_types(Vec::<String>::new()),
            ViewConfig::default()
        );
    }

    #[test]
    fn test_dedupe_after_shaping() {
        let log = TrafficLog::new(vec![
            RequestEntry::new("https://cdn.com/a.js?v=1"),
            RequestEntry::new("https://cdn.com/a.js?v=2"),
            RequestEntry::new("https://cdn.com/b.js"),
            RequestEntry::new("https://api.com/track"),
        ]);

        assert_eq!(
            project(&log, &ViewConfig::new(UrlShape::NoParams)),
            vec!["https://api.com/track", "https://cdn.com/a.js", "https://cdn.com/b.js"]
        );
        assert_eq!(
            project(&log, &ViewConfig::new(UrlShape::DomainOnly)),
            vec!["https://api.com", "https://cdn.com"]
        );
    }

    #[test]
    fn test_unparseable_url_excluded() {
        let log = TrafficLog::new(vec![
            RequestEntry::new("::not a url::"),
            RequestEntry::new("https://a.com/"),
        ]);

        assert_eq!(project(&log, &ViewConfig::default()), vec!["https://a.com/"]);
    }

    fn entry_strategy() -> impl Strategy<Value = RequestEntry> {
        let url = prop_oneof![
            "https://[a-c]\\.com/[a-c]{0,2}(\\?q=[0-9])?",
            "http://[a-c]\\.org:80[0-9]{2}/[a-c]{1,2}",
            "[a-z ]{1,6}",
        ];
        let content_type = prop_oneof![
            Just(None),
            Just(Some("image/png")),
            Just(Some("text/HTML")),
            Just(Some("application/javascript")),
        ];
        (url, content_type).prop_map(|(url, ct)| match ct {
            Some(ct) => RequestEntry::new(url).with_header("content-type", ct),
            None => RequestEntry::new(url),
        })
    }

    fn view_strategy() -> impl Strategy<Value = ViewConfig> {
        let shape = prop_oneof![
            Just(UrlShape::Full),
            Just(UrlShape::NoParams),
            Just(UrlShape::DomainOnly),
        ];
        let terms = prop::option::of(prop::collection::vec(
            prop_oneof![Just("png"), Just("html"), Just("SCRIPT")],
            1..3,
        ));
        (shape, terms).prop_map(|(shape, terms)| ViewConfig {
            content_type_filter: terms.map(|t| t.into_iter().map(String::from).collect()),
            url_shape: shape,
        })
    }

    proptest! {
        #[test]
        fn prop_projection_is_deterministic(
            entries in prop::collection::vec(entry_strategy(), 0..20),
            cfg in view_strategy(),
        ) {
            let log = TrafficLog::new(entries);
            prop_assert_eq!(project(&log, &cfg), project(&log, &cfg));
        }

        #[test]
        fn prop_projection_sorted_and_unique(
            entries in prop::collection::vec(entry_strategy(), 0..20),
            cfg in view_strategy(),
        ) {
            let log = TrafficLog::new(entries);
            let out = project(&log, &cfg);
            for pair in out.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
