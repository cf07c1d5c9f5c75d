use colored::Colorize;

use tagwatch_core::diff::location_key;
use tagwatch_core::policy::Verdict;
use tagwatch_core::types::ScanReport;

/// Format a scan report for terminal output.
pub fn format_report(report: &ScanReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "tagwatch - Tagged Comments".bold()));
    out.push_str(&format!("{}\n", "=".repeat(40)));

    if report.summary.new_only == Some(true) {
        out.push_str(&format!(
            "{}\n",
            "Showing only items introduced since the base revision".dimmed()
        ));
    }

    if report.files.is_empty() {
        out.push_str(&format!("\n{}\n\n", "No tagged comments found!".green().bold()));
        return out;
    }

    for file in &report.files {
        out.push_str(&format!(
            "\n{} ({})\n",
            file.path.bold(),
            file.todos.len()
        ));
        for item in &file.todos {
            out.push_str(&format!(
                "  {} {} {}\n",
                tag_label(&item.tag),
                location_key(&file.path, item.line).dimmed(),
                item.text,
            ));
        }
    }

    out.push_str(&format!(
        "\n{}: {} item(s) in {} file(s)\n",
        "Summary".bold(),
        report.summary.total,
        report.files_count(),
    ));
    if let Some(ref by_tag) = report.summary.by_tag {
        for (tag, count) in by_tag {
            out.push_str(&format!("  {tag}: {count}\n"));
        }
    }

    out.push('\n');
    out
}

fn tag_label(tag: &str) -> String {
    match tag {
        "BUG" | "FIXME" => tag.red().bold().to_string(),
        "TODO" => tag.yellow().bold().to_string(),
        "HACK" | "XXX" => tag.magenta().bold().to_string(),
        _ => tag.blue().bold().to_string(),
    }
}

/// Format a report with its policy verdict for CI use.
pub fn format_check(report: &ScanReport, verdict: &Verdict) -> String {
    let mut out = format_report(report);

    if verdict.passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else {
        out.push_str(&format!(
            "{}: {}\n",
            "CHECK FAILED".red().bold(),
            verdict.reason.as_deref().unwrap_or("policy violated"),
        ));
    }

    out
}
