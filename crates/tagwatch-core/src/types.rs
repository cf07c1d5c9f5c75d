use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One tagged comment found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedItem {
    pub tag: String,
    #[serde(default)]
    pub text: String,
    pub line: usize,
    #[serde(default)]
    pub column: usize,
    #[serde(default)]
    pub line_content: String,
    #[serde(default)]
    pub priority: Option<String>,
}

impl TaggedItem {
    pub fn new(tag: &str, text: &str, line: usize) -> Self {
        Self {
            tag: tag.to_string(),
            text: text.to_string(),
            line,
            column: 1,
            line_content: String::new(),
            priority: None,
        }
    }
}

/// All tagged items of a single file, in discovery (line) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    #[serde(default)]
    pub todos: Vec<TaggedItem>,
}

/// Location of an item: `path:line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation<'a> {
    pub path: &'a str,
    pub line: usize,
}

impl fmt::Display for ItemLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// Aggregate counters of a [`ScanReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_tag: Option<BTreeMap<String, usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_with_todos: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_only: Option<bool>,
}

/// Normalized result of scanning some set of files.
///
/// `summary` is always derived from `files`; every constructor that filters
/// or merges recomputes it instead of carrying an upstream value forward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(default)]
    pub files: Vec<FileReport>,
    #[serde(default)]
    pub summary: Summary,
}

impl ScanReport {
    /// `{files: [], summary: {total: 0}}`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a report from file entries, dropping files without items.
    pub fn from_files(files: Vec<FileReport>) -> Self {
        let files: Vec<FileReport> = files.into_iter().filter(|f| !f.todos.is_empty()).collect();
        let summary = summarize(&files);
        Self { files, summary }
    }

    /// Parse a serialized report, falling back to an empty one.
    ///
    /// Only the file entries are taken from the input; the summary is
    /// recomputed, and a `new_only` marker is carried over as-is.
    pub fn from_json_lossy(json: &str) -> Self {
        match serde_json::from_str::<ScanReport>(json) {
            Ok(parsed) => {
                let new_only = parsed.summary.new_only;
                let mut report = Self::from_files(parsed.files);
                report.summary.new_only = new_only;
                report
            }
            Err(e) => {
                tracing::warn!("ignoring malformed scan report: {e}");
                Self::empty()
            }
        }
    }

    /// Keep only files whose path satisfies `keep`.
    pub fn retain_paths(self, keep: impl Fn(&str) -> bool) -> Self {
        let new_only = self.summary.new_only;
        let files = self.files.into_iter().filter(|f| keep(&f.path)).collect();
        let mut report = Self::from_files(files);
        report.summary.new_only = new_only;
        report
    }

    pub fn is_empty(&self) -> bool {
        self.summary.total == 0
    }

    pub fn files_count(&self) -> usize {
        self.files.len()
    }

    /// All items with their file path, in file-then-line order as stored.
    pub fn items(&self) -> impl Iterator<Item = (&str, &TaggedItem)> + '_ {
        self.files
            .iter()
            .flat_map(|f| f.todos.iter().map(move |item| (f.path.as_str(), item)))
    }
}

fn summarize(files: &[FileReport]) -> Summary {
    let mut by_tag: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0usize;
    for file in files {
        total += file.todos.len();
        for item in &file.todos {
            *by_tag.entry(item.tag.clone()).or_default() += 1;
        }
    }
    Summary {
        total,
        by_tag: Some(by_tag),
        files_with_todos: Some(files.len()),
        new_only: None,
    }
}
