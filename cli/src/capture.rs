//! Browser capture
//!
//! Loads the target page in headless Chromium, records the DevTools network
//! events of that one page load and turns them into a HAR document. Built
//! only with the `capture` feature; without it URL targets are rejected and
//! a saved HAR has to be supplied instead.

#![cfg_attr(not(feature = "capture"), allow(dead_code))]

use magecheck_core::har::{Har, HarContent, HarEntry, HarHeader, HarRequest, HarResponse};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Quiet period after navigation for late requests (beacons, lazy scripts)
    pub settle: Duration,
    /// Upper bound on the whole page load
    pub timeout: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(2000),
            timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(feature = "capture")]
pub async fn capture(url: &Url, settings: &CaptureSettings) -> anyhow::Result<Har> {
    browser::run(url, settings).await
}

#[cfg(not(feature = "capture"))]
pub async fn capture(url: &Url, _settings: &CaptureSettings) -> anyhow::Result<Har> {
    anyhow::bail!(
        "capturing {} needs a browser: rebuild with `--features capture` or pass a saved .har file",
        url
    )
}

/// Response fields carried by the protocol events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedResponse {
    pub status: i64,
    pub status_text: String,
    pub protocol: String,
    pub mime_type: String,
    pub headers: Vec<HarHeader>,
}

/// Accumulates network events into HAR entries, one per request id and
/// redirect hop, in the order requests were sent
#[derive(Debug, Default)]
pub struct Recorder {
    entries: Vec<HarEntry>,
    by_id: HashMap<String, usize>,
}

impl Recorder {
    pub fn request(
        &mut self,
        id: &str,
        method: &str,
        url: &str,
        headers: Vec<HarHeader>,
        redirect: Option<RecordedResponse>,
    ) {
        // A redirect reuses the request id; the old hop gets the 3xx response
        if let Some(redirect) = redirect {
            self.response(id, redirect);
        }

        self.by_id.insert(id.to_string(), self.entries.len());
        self.entries.push(HarEntry {
            started_date_time: now(),
            time: 0.0,
            request: HarRequest {
                method: method.to_string(),
                url: url.to_string(),
                http_version: String::new(),
                headers,
                extra: Map::new(),
            },
            response: HarResponse::default(),
            extra: Map::new(),
        });
    }

    pub fn response(&mut self, id: &str, response: RecordedResponse) {
        if let Some(entry) = self.entry_mut(id) {
            entry.response = HarResponse {
                status: response.status,
                status_text: response.status_text,
                http_version: response.protocol,
                headers: response.headers,
                content: HarContent {
                    size: 0,
                    mime_type: response.mime_type,
                    extra: Map::new(),
                },
                extra: Map::new(),
            };
        } else {
            tracing::debug!(request_id = id, "Response for unknown request");
        }
    }

    pub fn failed(&mut self, id: &str, error_text: &str) {
        if let Some(entry) = self.entry_mut(id) {
            entry
                .response
                .extra
                .insert("_error".to_string(), Value::from(error_text));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn finish(self) -> Har {
        Har::new(self.entries)
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut HarEntry> {
        let idx = *self.by_id.get(id)?;
        self.entries.get_mut(idx)
    }
}

/// DevTools header objects join repeated headers with newlines
pub fn split_headers(value: &Value) -> Vec<HarHeader> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };

    map.iter()
        .flat_map(|(name, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text.split('\n')
                .map(|v| HarHeader::new(name.clone(), v))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(feature = "capture")]
fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(not(feature = "capture"))]
fn now() -> String {
    String::new()
}

#[cfg(feature = "capture")]
mod browser {
    use super::{split_headers, CaptureSettings, RecordedResponse, Recorder};
    use anyhow::{anyhow, Context, Result};
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::network::{
        EventLoadingFailed, EventRequestWillBeSent, EventResponseReceived, Response,
    };
    use futures::StreamExt;
    use magecheck_core::Har;
    use url::Url;

    pub(super) async fn run(url: &Url, settings: &CaptureSettings) -> Result<Har> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(|e| anyhow!("invalid browser configuration: {}", e))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = record(&browser, url, settings).await;

        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        handler_task.abort();

        result
    }

    async fn record(browser: &Browser, url: &Url, settings: &CaptureSettings) -> Result<Har> {
        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let mut failures = page.event_listener::<EventLoadingFailed>().await?;

        let mut recorder = Recorder::default();
        let mut navigated = false;

        let navigation = page.goto(url.as_str());
        tokio::pin!(navigation);
        let deadline = tokio::time::sleep(settings.timeout);
        tokio::pin!(deadline);

        tracing::info!(url = %url, "Capturing page load");

        loop {
            tokio::select! {
                Some(event) = requests.next() => {
                    recorder.request(
                        event.request_id.inner(),
                        &event.request.method,
                        &event.request.url,
                        split_headers(event.request.headers.inner()),
                        event.redirect_response.as_ref().map(convert),
                    );
                }
                Some(event) = responses.next() => {
                    recorder.response(event.request_id.inner(), convert(&event.response));
                }
                Some(event) = failures.next() => {
                    recorder.failed(event.request_id.inner(), &event.error_text);
                }
                result = &mut navigation, if !navigated => {
                    navigated = true;
                    result.with_context(|| format!("failed to load {}", url))?;
                    deadline
                        .as_mut()
                        .reset(tokio::time::Instant::now() + settings.settle);
                }
                _ = &mut deadline => {
                    if !navigated {
                        tracing::warn!(url = %url, "Page load timed out, keeping partial capture");
                    }
                    break;
                }
            }
        }

        tracing::info!(requests = recorder.len(), "Capture finished");
        Ok(recorder.finish())
    }

    fn convert(response: &Response) -> RecordedResponse {
        RecordedResponse {
            status: response.status,
            status_text: response.status_text.clone(),
            protocol: response.protocol.clone().unwrap_or_default(),
            mime_type: response.mime_type.clone(),
            headers: split_headers(response.headers.inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(content_type: &str) -> RecordedResponse {
        RecordedResponse {
            status: 200,
            status_text: "OK".into(),
            protocol: "h2".into(),
            mime_type: content_type.into(),
            headers: vec![HarHeader::new("content-type", content_type)],
        }
    }

    #[test]
    fn test_split_headers() {
        let headers = split_headers(&serde_json::json!({
            "content-type": "text/html",
            "set-cookie": "a=1\nb=2",
            "content-length": 12
        }));

        assert_eq!(headers.len(), 4);
        assert!(headers.contains(&HarHeader::new("set-cookie", "b=2")));
        assert!(headers.contains(&HarHeader::new("content-length", "12")));
        assert!(split_headers(&Value::Null).is_empty());
    }

    #[test]
    fn test_recorder_orders_entries_and_attaches_responses() {
        let mut recorder = Recorder::default();
        recorder.request("1", "GET", "https://shop.example/", vec![], None);
        recorder.request("2", "GET", "https://evil-cdn.example/skim.js", vec![], None);
        recorder.response("2", ok("application/javascript"));
        recorder.response("1", ok("text/html"));
        recorder.response("99", ok("text/plain"));

        let log = recorder.finish().to_traffic_log();
        let urls: Vec<_> = log.urls().collect();
        assert_eq!(urls, vec!["https://shop.example/", "https://evil-cdn.example/skim.js"]);
        assert_eq!(log.entries()[0].content_types().collect::<Vec<_>>(), vec!["text/html"]);
    }

    #[test]
    fn test_redirect_hops_become_separate_entries() {
        let mut recorder = Recorder::default();
        recorder.request("7", "GET", "http://shop.example/", vec![], None);

        let mut moved = ok("text/html");
        moved.status = 301;
        recorder.request("7", "GET", "https://shop.example/", vec![], Some(moved));
        recorder.response("7", ok("text/html"));

        let har = recorder.finish();
        assert_eq!(har.log.entries.len(), 2);
        assert_eq!(har.log.entries[0].response.status, 301);
        assert_eq!(har.log.entries[1].response.status, 200);
    }

    #[test]
    fn test_failed_load_keeps_empty_headers() {
        let mut recorder = Recorder::default();
        recorder.request("3", "GET", "https://blocked.example/x.js", vec![], None);
        recorder.failed("3", "net::ERR_BLOCKED_BY_CLIENT");

        let har = recorder.finish();
        let response = &har.log.entries[0].response;
        assert!(response.headers.is_empty());
        assert_eq!(
            response.extra.get("_error"),
            Some(&Value::from("net::ERR_BLOCKED_BY_CLIENT"))
        );
    }
}
