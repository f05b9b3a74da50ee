//! `lockvet show` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use lockvet_core::types::Vulnerability;

use crate::cli::ShowArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `show` command.
pub async fn execute(
    args: ShowArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let service = super::build_service(config_path).await?;

    let Some(vulnerability) = service.get_vulnerability_detail(&args.id).await? else {
        return Err(CliError::Command(format!(
            "advisory not found in local cache: {} (try `lockvet fetch` first)",
            args.id
        )));
    };

    writer.render(&AdvisoryDetail::from(vulnerability))?;
    Ok(())
}

#[derive(Serialize)]
pub struct AdvisoryDetail {
    pub id: String,
    pub source: String,
    pub severity: String,
    pub cvss_score: Option<f64>,
    pub package: String,
    pub ecosystem: String,
    pub title: String,
    pub description: Option<String>,
    pub affected_versions: Option<String>,
    pub fixed_versions: Option<String>,
    pub published_at: Option<String>,
    pub references: Vec<String>,
}

impl From<Vulnerability> for AdvisoryDetail {
    fn from(v: Vulnerability) -> Self {
        Self {
            id: v.id,
            source: v.source.to_string(),
            severity: v.severity.to_string(),
            cvss_score: v.cvss_score,
            package: v.package,
            ecosystem: v.ecosystem.to_string(),
            title: v.title,
            description: v.description,
            affected_versions: v.affected_versions,
            fixed_versions: v.fixed_versions,
            published_at: v.published_at.map(|t| t.to_rfc3339()),
            references: v.references,
        }
    }
}

impl Render for AdvisoryDetail {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", self.id.bold())?;
        writeln!(w, "  Title:    {}", self.title)?;
        writeln!(w, "  Package:  {} ({})", self.package, self.ecosystem)?;

        let severity_colored = match self.severity.as_str() {
            "critical" => self.severity.red().bold(),
            "high" => self.severity.red(),
            "medium" => self.severity.yellow(),
            _ => self.severity.normal(),
        };
        match self.cvss_score {
            Some(score) => writeln!(w, "  Severity: {severity_colored} (CVSS {score})")?,
            None => writeln!(w, "  Severity: {severity_colored}")?,
        }

        writeln!(w, "  Source:   {}", self.source)?;
        if let Some(affected) = &self.affected_versions {
            writeln!(w, "  Affected: {affected}")?;
        }
        writeln!(
            w,
            "  Fixed:    {}",
            self.fixed_versions.as_deref().unwrap_or("N/A")
        )?;
        if let Some(published) = &self.published_at {
            writeln!(w, "  Published: {published}")?;
        }
        if let Some(description) = &self.description {
            writeln!(w)?;
            writeln!(w, "{description}")?;
        }
        if !self.references.is_empty() {
            writeln!(w)?;
            writeln!(w, "References:")?;
            for reference in &self.references {
                writeln!(w, "  - {reference}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_detail() -> AdvisoryDetail {
        AdvisoryDetail {
            id: "CVE-2021-23337".to_owned(),
            source: "osv".to_owned(),
            severity: "high".to_owned(),
            cvss_score: Some(7.2),
            package: "lodash".to_owned(),
            ecosystem: "npm".to_owned(),
            title: "Command injection in lodash".to_owned(),
            description: Some("lodash versions prior to 4.17.21 are vulnerable.".to_owned()),
            affected_versions: Some("< 4.17.21".to_owned()),
            fixed_versions: Some("4.17.21".to_owned()),
            published_at: Some("2021-02-15T11:10:00+00:00".to_owned()),
            references: vec!["https://example.invalid/advisory".to_owned()],
        }
    }

    #[test]
    fn test_render_text_full_detail() {
        let mut buffer = Vec::new();
        sample_detail().render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(output.contains("CVE-2021-23337"));
        assert!(output.contains("lodash (npm)"));
        assert!(output.contains("CVSS 7.2"));
        assert!(output.contains("< 4.17.21"));
        assert!(output.contains("References:"));
    }

    #[test]
    fn test_render_text_sparse_detail() {
        let mut detail = sample_detail();
        detail.cvss_score = None;
        detail.description = None;
        detail.affected_versions = None;
        detail.fixed_versions = None;
        detail.references.clear();

        let mut buffer = Vec::new();
        detail.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Fixed:    N/A"));
        assert!(!output.contains("References:"));
    }
}
