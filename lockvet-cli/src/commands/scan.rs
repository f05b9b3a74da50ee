//! `lockvet scan` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use lockvet_core::types::Severity;
use lockvet_scanner::ScanOutcome;

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let min_severity = parse_severity(&args.min_severity)?;
    let service = super::build_service(config_path).await?;

    info!(path = %args.path.display(), "starting lockfile scan");

    // Ctrl-C cancels between pipeline stages; a cancelled scan writes no history
    let cancel = CancellationToken::new();
    let signal_guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_guard.cancel();
        }
    });

    let outcome = service.scan_directory(&args.path, Some(&cancel)).await?;

    let report = build_scan_report(&outcome, min_severity);
    writer.render(&report)?;

    // Exit code 4 when findings at or above the threshold exist
    let actionable = report.findings.len();
    if actionable > 0 {
        return Err(CliError::VulnerabilitiesFound(actionable));
    }
    Ok(())
}

fn parse_severity(s: &str) -> Result<Severity, CliError> {
    Severity::from_str_loose(s).ok_or_else(|| {
        CliError::Command(format!(
            "invalid severity: {s} (expected: low, medium, high, critical)"
        ))
    })
}

fn build_scan_report(outcome: &ScanOutcome, min_severity: Severity) -> ScanReport {
    let result = &outcome.result;

    let findings = result
        .matches
        .iter()
        .filter(|m| m.vulnerability.severity >= min_severity)
        .map(|m| FindingEntry {
            id: m.vulnerability.id.clone(),
            package: m.package.clone(),
            version: m.installed_version.clone(),
            ecosystem: m.vulnerability.ecosystem.to_string(),
            severity: m.vulnerability.severity.to_string(),
            fixed_versions: m.vulnerability.fixed_versions.clone(),
            title: m.vulnerability.title.clone(),
        })
        .collect();

    ScanReport {
        scan_id: result.scan_id.to_string(),
        path: result.directory.display().to_string(),
        ecosystems: result.ecosystems.iter().map(ToString::to_string).collect(),
        total_packages: result.total_packages,
        vulnerabilities: VulnSummary {
            critical: outcome.report.counts.critical,
            high: outcome.report.counts.high,
            medium: outcome.report.counts.medium,
            low: outcome.report.counts.low,
            total: outcome.report.counts.total(),
        },
        findings,
        warnings: result.warnings.iter().map(ToString::to_string).collect(),
        caveats: result
            .caveats
            .iter()
            .map(|c| format!("{}: {}", c.file, c.note))
            .collect(),
    }
}

#[derive(Serialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub path: String,
    pub ecosystems: Vec<String>,
    pub total_packages: usize,
    pub vulnerabilities: VulnSummary,
    pub findings: Vec<FindingEntry>,
    pub warnings: Vec<String>,
    pub caveats: Vec<String>,
}

#[derive(Serialize, Default)]
pub struct VulnSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct FindingEntry {
    pub id: String,
    pub package: String,
    pub version: String,
    pub ecosystem: String,
    pub severity: String,
    pub fixed_versions: Option<String>,
    pub title: String,
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scan: {}", self.path.bold())?;
        writeln!(w, "Ecosystems: {}", self.ecosystems.join(", "))?;
        writeln!(w, "Total packages: {}", self.total_packages)?;
        writeln!(w)?;

        let vuln_str = format!(
            "{} total (C:{} H:{} M:{} L:{})",
            self.vulnerabilities.total,
            self.vulnerabilities.critical,
            self.vulnerabilities.high,
            self.vulnerabilities.medium,
            self.vulnerabilities.low,
        );

        if self.vulnerabilities.total > 0 {
            writeln!(w, "Vulnerabilities: {}", vuln_str.red().bold())?;
        } else {
            writeln!(w, "Vulnerabilities: {}", vuln_str.green().bold())?;
        }
        writeln!(w)?;

        if self.findings.is_empty() {
            writeln!(w, "{}", "No vulnerabilities at or above threshold.".green())?;
        } else {
            writeln!(
                w,
                "{:<20} {:<10} {:<25} {:<14} Fixed",
                "ID", "Severity", "Package", "Version"
            )?;
            writeln!(w, "{}", "-".repeat(86))?;

            for f in &self.findings {
                let severity_colored = match f.severity.as_str() {
                    "critical" => f.severity.red().bold(),
                    "high" => f.severity.red(),
                    "medium" => f.severity.yellow(),
                    _ => f.severity.normal(),
                };

                writeln!(
                    w,
                    "{:<20} {:<10} {:<25} {:<14} {}",
                    f.id,
                    severity_colored,
                    f.package,
                    f.version,
                    f.fixed_versions.as_deref().unwrap_or("N/A")
                )?;
            }
        }

        for warning in &self.warnings {
            writeln!(w, "{} {}", "warning:".yellow().bold(), warning)?;
        }
        for caveat in &self.caveats {
            writeln!(w, "{} {}", "note:".dimmed(), caveat)?;
        }

        Ok(())
    }
}
