use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::ScanReport;

/// Tags that fail the build when tag-based gating is switched on and no
/// explicit list is configured.
pub const DEFAULT_FAILING_TAGS: &[&str] = &["FIXME", "BUG"];

/// Fail-the-build rules. Each rule is independent; an empty `fail_on_tags`
/// set disables the tag rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyRules {
    pub fail_on_any_tag: bool,
    pub fail_on_tags: BTreeSet<String>,
    pub max_allowed: Option<usize>,
}

impl PolicyRules {
    pub fn default_failing_tags() -> BTreeSet<String> {
        DEFAULT_FAILING_TAGS.iter().map(|t| t.to_string()).collect()
    }
}

/// Outcome of policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

/// Evaluate `rules` against a finished report.
///
/// Rules are checked in order any-tag, tag-set, max-count; the first one
/// that trips supplies the reason.
pub fn evaluate(report: &ScanReport, rules: &PolicyRules) -> Verdict {
    let total = report.summary.total;

    if rules.fail_on_any_tag && total > 0 {
        return Verdict::fail(format!(
            "found {total} tagged comment(s) and fail-on-any-tag is enabled"
        ));
    }

    if !rules.fail_on_tags.is_empty() {
        let mut hits: BTreeSet<&str> = BTreeSet::new();
        let mut count = 0usize;
        for (_, item) in report.items() {
            if rules.fail_on_tags.contains(&item.tag) {
                hits.insert(item.tag.as_str());
                count += 1;
            }
        }
        if count > 0 {
            let tags: Vec<&str> = hits.into_iter().collect();
            return Verdict::fail(format!(
                "found {count} item(s) with failing tag(s): {}",
                tags.join(", ")
            ));
        }
    }

    if let Some(max) = rules.max_allowed {
        if total > max {
            return Verdict::fail(format!(
                "found {total} tagged comment(s), exceeding the maximum allowed of {max}"
            ));
        }
    }

    Verdict::pass()
}
