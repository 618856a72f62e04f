//! HTTP Archive (HAR 1.2) reader and writer
//!
//! Only the fields the analyzer reads are modelled. Everything else is kept
//! in the `extra` maps so a loaded archive can be written back unchanged.

use crate::log::{RequestEntry, TrafficLog};
use crate::{MagecheckError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// HAR document root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Har {
    /// Archive body
    pub log: HarLog,
}

/// The `log` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarLog {
    /// Format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Producing application
    #[serde(default)]
    pub creator: HarCreator,
    /// Page records, passed through untouched; `None` when the field was absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Value>>,
    /// Exchanges in capture order
    pub entries: Vec<HarEntry>,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_version() -> String {
    "1.2".to_string()
}

/// The `creator` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarCreator {
    /// Application name
    #[serde(default)]
    pub name: String,
    /// Application version
    #[serde(default)]
    pub version: String,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for HarCreator {
    fn default() -> Self {
        Self {
            name: "magecheck".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Map::new(),
        }
    }
}

/// One request/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarEntry {
    /// ISO 8601 start time
    #[serde(default)]
    pub started_date_time: String,
    /// Total elapsed milliseconds
    #[serde(default)]
    pub time: f64,
    /// Outgoing request
    pub request: HarRequest,
    /// Response, defaulted for failed loads
    #[serde(default)]
    pub response: HarResponse,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `request` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    /// HTTP method
    #[serde(default)]
    pub method: String,
    /// Absolute request URL
    pub url: String,
    /// Protocol version
    #[serde(default)]
    pub http_version: String,
    /// Request headers
    #[serde(default)]
    pub headers: Vec<HarHeader>,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `response` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
    /// Status code, 0 when nothing was received
    #[serde(default)]
    pub status: i64,
    /// Status text
    #[serde(default)]
    pub status_text: String,
    /// Protocol version
    #[serde(default)]
    pub http_version: String,
    /// Response headers
    #[serde(default)]
    pub headers: Vec<HarHeader>,
    /// Body description
    #[serde(default)]
    pub content: HarContent,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `content` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    /// Body size in bytes
    #[serde(default)]
    pub size: i64,
    /// Declared MIME type
    #[serde(default)]
    pub mime_type: String,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Header name/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarHeader {
    /// Header name
    pub name: String,
    /// Header value
    pub value: String,
}

impl HarHeader {
    /// Create header
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Har {
    /// Create archive from entries
    pub fn new(entries: Vec<HarEntry>) -> Self {
        Self {
            log: HarLog {
                version: default_version(),
                creator: HarCreator::default(),
                pages: Some(Vec::new()),
                entries,
                extra: Map::new(),
            },
        }
    }

    /// Parse archive text
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| MagecheckError::InvalidLog(e.to_string()))
    }

    /// Load archive from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MagecheckError::SourceNotFound(path.to_path_buf()));
        }

        let text = fs::read_to_string(path)?;
        let har = Self::from_json(&text)?;

        tracing::debug!(
            path = %path.display(),
            entries = har.log.entries.len(),
            "Loaded traffic log"
        );

        Ok(har)
    }

    /// Serialize with 4-space indentation
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| MagecheckError::InvalidLog(e.to_string()))
    }

    /// Write archive as `<dir>/<name>.har`, returning the written path
    pub fn save(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.har", name));
        fs::write(&path, self.to_json()?)?;

        tracing::info!(path = %path.display(), "Saved traffic log");
        Ok(path)
    }

    /// Reduce to the normalized log the analyzer consumes
    pub fn to_traffic_log(&self) -> TrafficLog {
        self.log
            .entries
            .iter()
            .map(|entry| RequestEntry {
                request_url: entry.request.url.clone(),
                response_headers: entry
                    .response
                    .headers
                    .iter()
                    .map(|h| (h.name.clone(), h.value.clone()))
                    .collect(),
            })
            .collect()
    }
}
