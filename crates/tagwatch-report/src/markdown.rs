use tagwatch_core::policy::Verdict;
use tagwatch_core::types::ScanReport;

/// Longest item list rendered in the job summary.
const MAX_SUMMARY_ROWS: usize = 100;

/// Format a report as a Markdown job summary.
pub fn format_summary(report: &ScanReport, verdict: &Verdict) -> String {
    let mut out = String::new();

    out.push_str("# tagwatch\n\n");

    if verdict.passed {
        out.push_str("**Status:** passed\n");
    } else {
        out.push_str(&format!(
            "**Status:** failed ({})\n",
            escape_cell(verdict.reason.as_deref().unwrap_or("policy violated"))
        ));
    }

    out.push_str(&format!(
        "\n## Summary\n\n- **Items:** {}\n- **Files:** {}\n",
        report.summary.total,
        report.files_count(),
    ));
    if report.summary.new_only == Some(true) {
        out.push_str("- **Mode:** new items only\n");
    }

    if let Some(ref by_tag) = report.summary.by_tag {
        if !by_tag.is_empty() {
            out.push_str("\n### By Tag\n\n");
            out.push_str("| Tag | Count |\n");
            out.push_str("|-----|-------|\n");
            for (tag, count) in by_tag {
                out.push_str(&format!("| {tag} | {count} |\n"));
            }
        }
    }

    if report.files.is_empty() {
        out.push_str("\n## Items\n\nNo tagged comments found.\n");
        return out;
    }

    out.push_str(&format!("\n## Items ({} found)\n\n", report.summary.total));
    out.push_str("| Tag | Location | Message |\n");
    out.push_str("|-----|----------|---------|\n");
    for (path, item) in report.items().take(MAX_SUMMARY_ROWS) {
        out.push_str(&format!(
            "| {} | `{}:{}` | {} |\n",
            item.tag,
            path,
            item.line,
            escape_cell(&item.text)
        ));
    }
    if report.summary.total > MAX_SUMMARY_ROWS {
        out.push_str(&format!(
            "\n_{} more item(s) not shown._\n",
            report.summary.total - MAX_SUMMARY_ROWS
        ));
    }

    out
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
