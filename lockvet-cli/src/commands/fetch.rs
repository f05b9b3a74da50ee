//! `lockvet fetch` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use lockvet_core::types::Ecosystem;

use crate::cli::FetchArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `fetch` command.
pub async fn execute(
    args: FetchArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let ecosystems = parse_ecosystems(&args.ecosystems)?;
    let service = super::build_service(config_path).await?;

    info!(ecosystems = ecosystems.len(), "fetching advisories");
    let changed = service.fetch_vulnerabilities(&ecosystems).await?;

    let report = FetchReport {
        ecosystems: if ecosystems.is_empty() {
            vec!["all".to_owned()]
        } else {
            ecosystems.iter().map(ToString::to_string).collect()
        },
        changed,
    };
    writer.render(&report)?;
    Ok(())
}

fn parse_ecosystems(names: &[String]) -> Result<Vec<Ecosystem>, CliError> {
    names
        .iter()
        .map(|name| {
            Ecosystem::from_str_loose(name)
                .ok_or_else(|| CliError::Command(format!("unknown ecosystem: {name}")))
        })
        .collect()
}

#[derive(Serialize)]
pub struct FetchReport {
    pub ecosystems: Vec<String>,
    pub changed: u64,
}

impl Render for FetchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Fetched advisories for: {}", self.ecosystems.join(", "))?;
        if self.changed > 0 {
            writeln!(w, "Cache updated: {} records", self.changed.to_string().bold())?;
        } else {
            writeln!(w, "{}", "Cache already up to date.".green())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ecosystems_loose_names() {
        let parsed = parse_ecosystems(&["npm".to_owned(), "PyPI".to_owned()]).unwrap();
        assert_eq!(parsed, [Ecosystem::Npm, Ecosystem::PyPi]);
    }

    #[test]
    fn test_parse_ecosystems_rejects_unknown() {
        let err = parse_ecosystems(&["fortran".to_owned()]).unwrap_err();
        assert!(err.to_string().contains("unknown ecosystem"));
    }

    #[test]
    fn test_render_text_up_to_date() {
        let report = FetchReport {
            ecosystems: vec!["all".to_owned()],
            changed: 0,
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("up to date"));
    }
}
