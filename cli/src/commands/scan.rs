//! Scan command

use crate::capture::{self, CaptureSettings};
use crate::config::{Config, DEFAULT_EXPECTATIONS, DEFAULT_HAR_DIR, DEFAULT_INDICATORS};
use crate::output::{OutputFormat, ReportDocument};
use crate::ScanArgs;
use anyhow::{Context, Result};
use clap::ValueEnum;
use magecheck_core::{
    Analyzer, Har, MatchOptions, PatternSyntax, TrafficSource, UrlShape, ViewConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShapeArg {
    /// Full URL
    Full,
    /// Drop query string
    NoParams,
    /// Origin only
    DomainOnly,
}

impl From<ShapeArg> for UrlShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Full => UrlShape::Full,
            ShapeArg::NoParams => UrlShape::NoParams,
            ShapeArg::DomainOnly => UrlShape::DomainOnly,
        }
    }
}

/// Scan options after merging flags, environment and config file
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub indicators: PathBuf,
    pub expectations: Option<PathBuf>,
    pub options: MatchOptions,
    pub har_dir: PathBuf,
    pub save_log: bool,
    pub view: Option<ViewConfig>,
    pub capture: CaptureSettings,
    pub output: Option<PathBuf>,
}

impl ScanSettings {
    pub fn resolve(args: &ScanArgs, config: &Config) -> Self {
        let indicators = args
            .indicators
            .clone()
            .or_else(|| config.indicators_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INDICATORS));

        let expectations = if args.no_expectations {
            None
        } else {
            Some(
                args.expectations
                    .clone()
                    .or_else(|| config.expectations_path.clone())
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPECTATIONS)),
            )
        };

        let literal = args.literal || config.literal.unwrap_or(false);
        let options = MatchOptions {
            syntax: if literal {
                PatternSyntax::Literal
            } else {
                PatternSyntax::Regex
            },
            case_insensitive: args.case_insensitive || config.case_insensitive.unwrap_or(false),
        };

        let wants_view = args.list || !args.content_types.is_empty() || args.shape.is_some();
        let view = wants_view.then(|| {
            ViewConfig::new(args.shape.map(UrlShape::from).unwrap_or_default())
                .with_content_types(args.content_types.iter().cloned())
        });

        let mut capture = CaptureSettings::default();
        if let Some(ms) = args.settle_ms.or(config.settle_ms) {
            capture.settle = Duration::from_millis(ms);
        }

        Self {
            indicators,
            expectations,
            options,
            har_dir: args
                .har_dir
                .clone()
                .or_else(|| config.har_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HAR_DIR)),
            save_log: !args.no_save,
            view,
            capture,
            output: args.output.clone(),
        }
    }
}

/// Run a scan; returns true when the report has findings
pub async fn handle(args: ScanArgs, config: &Config, format: OutputFormat) -> Result<bool> {
    let settings = ScanSettings::resolve(&args, config);

    // Pattern problems abort before any browser is started
    let analyzer = Analyzer::from_files(
        &settings.indicators,
        settings.expectations.as_deref(),
        settings.options,
    )?;

    let source = TrafficSource::parse(&args.target);
    tracing::info!(source = %source, "Acquiring traffic log");
    let (har, saved_log) = acquire(&source, &settings).await?;

    let report = analyzer.analyze(&har.to_traffic_log(), settings.view.as_ref());
    let doc = ReportDocument::new(&args.target, saved_log.as_deref(), &report);

    match &settings.output {
        Some(path) => {
            write_report(path, &doc)?;
            println!("Report written to {}", path.display());
        }
        None => format.print(&doc)?,
    }

    Ok(report.has_findings())
}

async fn acquire(
    source: &TrafficSource,
    settings: &ScanSettings,
) -> Result<(Har, Option<PathBuf>)> {
    let har = match source {
        TrafficSource::File(path) => Har::load(path)?,
        TrafficSource::Capture(url) => capture::capture(url, &settings.capture).await?,
    };

    let saved = if settings.save_log {
        Some(save_log(&har, source, &settings.har_dir)?)
    } else {
        None
    };
    Ok((har, saved))
}

// Logs are keyed by source name under `har_dir`
fn save_log(har: &Har, source: &TrafficSource, har_dir: &Path) -> Result<PathBuf> {
    let name = source.log_name();

    if let Some(input) = source.path() {
        let dest = har_dir.join(format!("{}.har", name));
        if is_same_file(input, &dest) {
            tracing::debug!(path = %dest.display(), "Traffic log already in place");
            return Ok(dest);
        }
    }

    Ok(har.save(har_dir, &name)?)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn write_report(path: &Path, doc: &ReportDocument<'_>) -> Result<()> {
    let json = OutputFormat::Json.render(doc)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json).with_context(|| format!("cannot write report to {}", path.display()))
}
