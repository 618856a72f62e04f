//! CLI Configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Indicator list read when nothing else is configured
pub const DEFAULT_INDICATORS: &str = "url-patterns.txt";
/// Expectation list read when nothing else is configured
pub const DEFAULT_EXPECTATIONS: &str = "expected-urls.txt";
/// Directory captured logs are written to
pub const DEFAULT_HAR_DIR: &str = "har_files";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub indicators_path: Option<PathBuf>,
    pub expectations_path: Option<PathBuf>,
    pub har_dir: Option<PathBuf>,
    pub default_format: Option<String>,
    pub case_insensitive: Option<bool>,
    pub literal: Option<bool>,
    pub settle_ms: Option<u64>,
}

impl Config {
    pub const KEYS: &'static [&'static str] = &[
        "indicators_path",
        "expectations_path",
        "har_dir",
        "default_format",
        "case_insensitive",
        "literal",
        "settle_ms",
    ];

    pub fn load(profile: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::config_path(profile)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))
    }

    pub fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().context("Cannot find home directory")?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".magecheck").join(filename))
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "indicators_path" => self.indicators_path = Some(value.into()),
            "expectations_path" => self.expectations_path = Some(value.into()),
            "har_dir" => self.har_dir = Some(value.into()),
            "default_format" => self.default_format = Some(value.to_string()),
            "case_insensitive" => self.case_insensitive = Some(parse_bool(key, value)?),
            "literal" => self.literal = Some(parse_bool(key, value)?),
            "settle_ms" => {
                self.settle_ms = Some(
                    value
                        .parse()
                        .with_context(|| format!("{} must be a number of milliseconds", key))?,
                )
            }
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "indicators_path" => self.indicators_path.as_ref().map(|p| p.display().to_string()),
            "expectations_path" => self.expectations_path.as_ref().map(|p| p.display().to_string()),
            "har_dir" => self.har_dir.as_ref().map(|p| p.display().to_string()),
            "default_format" => self.default_format.clone(),
            "case_insensitive" => self.case_insensitive.map(|b| b.to_string()),
            "literal" => self.literal.map(|b| b.to_string()),
            "settle_ms" => self.settle_ms.map(|ms| ms.to_string()),
            _ => bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("{} must be true or false, got {:?}", key, value),
    }
}
