//! Workflow-command annotation lines for CI log ingestion.

use tagwatch_core::config::AnnotationLevel;
use tagwatch_core::types::ScanReport;

pub use tagwatch_core::config::DEFAULT_MAX_ANNOTATIONS;

/// Render at most `max` annotation lines, in the report's stored order.
///
/// The cap is global, not per file. Each line has the form
/// `::<level> file=<path>,line=<line>::<tag>: <text>`.
pub fn render_annotations(report: &ScanReport, max: usize, level: AnnotationLevel) -> Vec<String> {
    report
        .items()
        .take(max)
        .map(|(path, item)| {
            format!(
                "::{level} file={},line={}::{}",
                escape_property(path),
                item.line,
                escape_data(&format!("{}: {}", item.tag, item.text)),
            )
        })
        .collect()
}

/// Escape a message so it stays on one directive line.
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Property values additionally cannot contain `:` or `,`.
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
