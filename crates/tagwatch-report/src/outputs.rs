//! Named key/value results for an orchestrating CI step.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::json;
use tagwatch_core::types::ScanReport;

/// `total`, `files_count`, `has_todos` and the compact `report`.
pub fn step_outputs(report: &ScanReport) -> Vec<(&'static str, String)> {
    vec![
        ("total", report.summary.total.to_string()),
        ("files_count", report.files_count().to_string()),
        ("has_todos", (!report.is_empty()).to_string()),
        ("report", json::format_report(report, true)),
    ]
}

/// Append outputs to a step-output file (`$GITHUB_OUTPUT` format).
///
/// Multi-line values use the `key<<DELIMITER` form.
pub fn write_outputs(path: &Path, outputs: &[(&str, String)]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    for (key, value) in outputs {
        let written = if value.contains('\n') {
            let delimiter = delimiter_for(value);
            writeln!(file, "{key}<<{delimiter}\n{value}\n{delimiter}")
        } else {
            writeln!(file, "{key}={value}")
        };
        written.with_context(|| format!("failed to write output '{key}'"))?;
    }

    Ok(())
}

/// Append Markdown to the job summary file.
pub fn append_summary(path: &Path, markdown: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{markdown}").context("failed to write job summary")?;
    Ok(())
}

fn delimiter_for(value: &str) -> String {
    let mut delimiter = String::from("TAGWATCH_EOF");
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    delimiter
}
