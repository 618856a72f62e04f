//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use magecheck_core::{ExpectationOutcome, Report};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Table,
    Json,
    Yaml,
}

/// Report plus run context, as written to JSON/YAML
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument<'a> {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_log: Option<String>,
    #[serde(flatten)]
    pub report: &'a Report,
}

impl<'a> ReportDocument<'a> {
    pub fn new(target: &str, saved_log: Option<&Path>, report: &'a Report) -> Self {
        Self {
            target: target.to_string(),
            saved_log: saved_log.map(|p| p.display().to_string()),
            report,
        }
    }
}

#[derive(Tabled)]
struct FindingRow<'a> {
    #[tabled(rename = "Finding")]
    kind: &'static str,
    #[tabled(rename = "URL")]
    url: &'a str,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }

    pub fn render(&self, doc: &ReportDocument<'_>) -> Result<String> {
        let rendered = match self {
            OutputFormat::Json => serde_json::to_string_pretty(doc)?,
            OutputFormat::Yaml => serde_yaml::to_string(doc)?,
            OutputFormat::Table => render_table(doc),
            OutputFormat::Text => render_text(doc),
        };
        Ok(rendered)
    }

    pub fn print(&self, doc: &ReportDocument<'_>) -> Result<()> {
        println!("{}", self.render(doc)?);
        Ok(())
    }
}

fn render_text(doc: &ReportDocument<'_>) -> String {
    let report = doc.report;
    let mut out = String::new();

    if let Some(requests) = &report.filtered_requests {
        let _ = writeln!(out, "\n{} ({})\n", "Requests".bold(), requests.len());
        for url in requests {
            let _ = writeln!(out, "{}", url);
        }
    }

    if report.matched_indicators.is_empty() {
        let _ = writeln!(out, "\n{}", "No threats found".green());
    } else {
        let _ = writeln!(out, "\n{}\n", "Unauthorised url(s) found.".red().bold());
        for url in &report.matched_indicators {
            let _ = writeln!(out, "{}", url);
        }
    }

    match report.expectation_outcome() {
        ExpectationOutcome::NotPerformed => {
            let _ = writeln!(
                out,
                "\n{}",
                "No expectation list configured, check not performed".dimmed()
            );
        }
        ExpectationOutcome::AllExpected => {
            let _ = writeln!(out, "\n{}", "All requests matched the expectation list".green());
        }
        ExpectationOutcome::Unexpected(urls) => {
            let _ = writeln!(out, "\n{}\n", "Unexpected url(s) found.".yellow().bold());
            for url in urls {
                let _ = writeln!(out, "{}", url);
            }
        }
    }

    if let Some(path) = &doc.saved_log {
        let _ = writeln!(out, "\nThe full request HAR can be found at {}", path);
    }

    out
}

fn render_table(doc: &ReportDocument<'_>) -> String {
    let report = doc.report;
    let mut rows = Vec::new();

    rows.extend(report.matched_indicators.iter().map(|url| FindingRow {
        kind: "indicator",
        url,
    }));
    if let ExpectationOutcome::Unexpected(urls) = report.expectation_outcome() {
        rows.extend(urls.iter().map(|url| FindingRow {
            kind: "unexpected",
            url,
        }));
    }
    if let Some(requests) = &report.filtered_requests {
        rows.extend(requests.iter().map(|url| FindingRow {
            kind: "request",
            url,
        }));
    }

    let mut out = Table::new(rows).with(Style::rounded()).to_string();

    if report.expectation_outcome() == ExpectationOutcome::NotPerformed {
        out.push_str("\nexpectation check: not performed");
    }
    if let Some(path) = &doc.saved_log {
        let _ = write!(out, "\nsaved log: {}", path);
    }

    out
}
