//! Differential engine: isolate items introduced since a base revision.
//!
//! Items are matched by `(path, line)` only. Tag, text and column are not
//! part of the key, so a tag whose line moved because of unrelated edits
//! above it is reported as new.

use std::collections::HashSet;

use anyhow::Result;

use crate::types::{FileReport, ItemLocation, ScanReport};

/// Render the matching key of an item, `path:line`.
pub fn location_key(path: &str, line: usize) -> String {
    ItemLocation { path, line }.to_string()
}

/// Items of `current` whose `(path, line)` does not occur in `base`.
///
/// Files left without items are dropped, the summary is recomputed and
/// marked `new_only`. Neither input is modified.
pub fn diff_new(current: &ScanReport, base: &ScanReport) -> ScanReport {
    let base_keys: HashSet<(&str, usize)> = base
        .items()
        .map(|(path, item)| (path, item.line))
        .collect();

    let files = current
        .files
        .iter()
        .map(|file| FileReport {
            path: file.path.clone(),
            todos: file
                .todos
                .iter()
                .filter(|item| !base_keys.contains(&(file.path.as_str(), item.line)))
                .cloned()
                .collect(),
        })
        .collect();

    let mut report = ScanReport::from_files(files);
    report.summary.new_only = Some(true);
    report
}

/// Apply new-only filtering when a base report could be produced.
///
/// If the base revision could not be scanned, `current` is returned
/// unchanged.
pub fn apply_new_only(current: ScanReport, base: Result<ScanReport>) -> ScanReport {
    match base {
        Ok(base) => {
            let filtered = diff_new(&current, &base);
            tracing::info!(
                "new-only: {} of {} item(s) are new relative to base",
                filtered.summary.total,
                current.summary.total
            );
            filtered
        }
        Err(e) => {
            tracing::warn!("could not scan base revision, reporting all items: {e:#}");
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaggedItem;

    fn report(entries: &[(&str, &[(&str, usize)])]) -> ScanReport {
        ScanReport::from_files(
            entries
                .iter()
                .map(|(path, items)| FileReport {
                    path: path.to_string(),
                    todos: items
                        .iter()
                        .map(|(tag, line)| TaggedItem::new(tag, "msg", *line))
                        .collect(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_only_new_location_survives() {
        let current = report(&[("x.go", &[("TODO", 10), ("FIXME", 20)])]);
        let base = report(&[("x.go", &[("BUG", 10)])]);

        let diff = diff_new(&current, &base);

        assert_eq!(diff.summary.total, 1);
        assert_eq!(diff.summary.new_only, Some(true));
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].todos[0].tag, "FIXME");
        assert_eq!(diff.files[0].todos[0].line, 20);
    }

    #[test]
    fn test_diff_against_self_is_empty() {
        let r = report(&[
            ("a.go", &[("TODO", 1), ("TODO", 1), ("BUG", 8)]),
            ("b/c.rs", &[("FIXME", 3)]),
        ]);
        let diff = diff_new(&r, &r);
        assert_eq!(diff.summary.total, 0);
        assert!(diff.files.is_empty());
    }

    #[test]
    fn test_larger_base_never_adds_items() {
        let current = report(&[("a.go", &[("TODO", 1), ("TODO", 2), ("TODO", 3)])]);
        let small = report(&[("a.go", &[("TODO", 1)])]);
        let large = report(&[("a.go", &[("TODO", 1), ("TODO", 3)]), ("z.go", &[("BUG", 2)])]);

        let d_small = diff_new(&current, &small);
        let d_large = diff_new(&current, &large);
        assert!(d_small.summary.total >= d_large.summary.total);
        assert_eq!(d_large.summary.total, 1);
    }

    #[test]
    fn test_same_line_in_other_file_is_new() {
        let current = report(&[("a.go", &[("TODO", 5)])]);
        let base = report(&[("b.go", &[("TODO", 5)])]);
        assert_eq!(diff_new(&current, &base).summary.total, 1);
    }

    #[test]
    fn test_shifted_line_counts_as_new() {
        let current = report(&[("a.go", &[("TODO", 6)])]);
        let base = report(&[("a.go", &[("TODO", 5)])]);
        assert_eq!(diff_new(&current, &base).summary.total, 1);
    }

    #[test]
    fn test_inputs_untouched() {
        let current = report(&[("a.go", &[("TODO", 5)])]);
        let base = report(&[("a.go", &[("TODO", 5)])]);
        let before = current.clone();
        let _ = diff_new(&current, &base);
        assert_eq!(current, before);
    }

    #[test]
    fn test_empty_base_keeps_everything() {
        let current = report(&[("a.go", &[("TODO", 5)]), ("b.go", &[("BUG", 1)])]);
        let diff = diff_new(&current, &ScanReport::empty());
        assert_eq!(diff.summary.total, 2);
        assert_eq!(diff.files, current.files);
    }

    #[test]
    fn test_apply_new_only_falls_back_on_error() {
        let current = report(&[("a.go", &[("TODO", 5)])]);
        let out = apply_new_only(current.clone(), Err(anyhow::anyhow!("no such revision")));
        assert_eq!(out, current);
        assert_eq!(out.summary.new_only, None);
    }

    #[test]
    fn test_apply_new_only_filters_on_success() {
        let current = report(&[("a.go", &[("TODO", 5), ("TODO", 9)])]);
        let base = report(&[("a.go", &[("TODO", 9)])]);
        let out = apply_new_only(current, Ok(base));
        assert_eq!(out.summary.total, 1);
        assert_eq!(out.files[0].todos[0].line, 5);
    }

    #[test]
    fn test_location_key_format() {
        assert_eq!(location_key("src/a.go", 10), "src/a.go:10");
    }
}
