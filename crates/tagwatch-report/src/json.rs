use serde::Serialize;

use tagwatch_core::policy::Verdict;
use tagwatch_core::types::ScanReport;

/// Format a scan report as JSON.
pub fn format_report(report: &ScanReport, compact: bool) -> String {
    if compact {
        serde_json::to_string(report).unwrap_or_else(|_| empty_report())
    } else {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| empty_report())
    }
}

fn empty_report() -> String {
    r#"{"files":[],"summary":{"total":0}}"#.to_string()
}

/// Report plus pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub report: &'a ScanReport,
    pub check: &'a Verdict,
}

/// Format a report with its policy verdict as JSON.
pub fn format_check(report: &ScanReport, verdict: &Verdict, compact: bool) -> String {
    let output = CheckOutput {
        report,
        check: verdict,
    };
    let json = if compact {
        serde_json::to_string(&output)
    } else {
        serde_json::to_string_pretty(&output)
    };
    json.unwrap_or_else(|_| empty_report())
}
