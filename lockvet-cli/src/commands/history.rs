//! `lockvet history` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use lockvet_core::types::ScanHistoryEntry;

use crate::cli::HistoryArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `history` command.
pub async fn execute(
    args: HistoryArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let service = super::build_service(config_path).await?;
    let entries = service.get_scan_history(args.limit).await?;

    let report = HistoryReport {
        entries: entries.into_iter().map(HistoryRow::from).collect(),
    };
    writer.render(&report)?;
    Ok(())
}

#[derive(Serialize)]
pub struct HistoryReport {
    pub entries: Vec<HistoryRow>,
}

#[derive(Serialize)]
pub struct HistoryRow {
    pub id: i64,
    pub directory: String,
    pub ecosystem: String,
    pub vulnerability_count: u32,
    pub scanned_at: String,
}

impl From<ScanHistoryEntry> for HistoryRow {
    fn from(entry: ScanHistoryEntry) -> Self {
        Self {
            id: entry.id,
            directory: entry.directory,
            ecosystem: entry.ecosystem.to_string(),
            vulnerability_count: entry.vulnerability_count,
            scanned_at: entry.scanned_at.to_rfc3339(),
        }
    }
}

impl Render for HistoryReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.entries.is_empty() {
            writeln!(w, "No scans recorded yet.")?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<6} {:<26} {:<12} {:<8} Scanned at",
            "ID", "Directory", "Ecosystem", "Vulns"
        )?;
        writeln!(w, "{}", "-".repeat(84))?;

        for entry in &self.entries {
            let count = if entry.vulnerability_count > 0 {
                entry.vulnerability_count.to_string().red().bold()
            } else {
                entry.vulnerability_count.to_string().green()
            };
            writeln!(
                w,
                "{:<6} {:<26} {:<12} {:<8} {}",
                entry.id, entry.directory, entry.ecosystem, count, entry.scanned_at
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text_empty_history() {
        let report = HistoryReport { entries: Vec::new() };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("No scans recorded yet."));
    }

    #[test]
    fn test_render_text_rows() {
        let report = HistoryReport {
            entries: vec![HistoryRow {
                id: 7,
                directory: "/srv/app".to_owned(),
                ecosystem: "npm".to_owned(),
                vulnerability_count: 2,
                scanned_at: "2025-11-02T10:00:00+00:00".to_owned(),
            }],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("/srv/app"));
        assert!(output.contains("npm"));
    }
}
