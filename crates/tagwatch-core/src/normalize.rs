//! Translation from raw scanner output to the report model.
//!
//! This is the only place that knows the scanner's field names. Accepted
//! shapes are either `{"files": [...], "summary": {...}}` or a bare array of
//! file entries; several spellings are accepted for each field. Any summary
//! the scanner emits is discarded and recomputed.

use serde::Deserialize;

use crate::scanner::ScanError;
use crate::types::{FileReport, ScanReport, TaggedItem};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOutput {
    Report {
        #[serde(default)]
        files: Vec<RawFile>,
    },
    Files(Vec<RawFile>),
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(alias = "file", alias = "filename")]
    path: String,
    #[serde(default, alias = "items", alias = "comments", alias = "matches")]
    todos: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(alias = "type", alias = "kind", alias = "keyword")]
    tag: String,
    #[serde(default, alias = "message", alias = "msg")]
    text: Option<String>,
    #[serde(default, alias = "line_number")]
    line: usize,
    #[serde(default, alias = "col")]
    column: usize,
    #[serde(
        default,
        alias = "lineContent",
        alias = "content",
        alias = "source"
    )]
    line_content: Option<String>,
    #[serde(default, alias = "severity")]
    priority: Option<String>,
}

impl From<RawItem> for TaggedItem {
    fn from(raw: RawItem) -> Self {
        TaggedItem {
            tag: raw.tag,
            text: raw.text.unwrap_or_default().trim().to_string(),
            line: raw.line,
            column: raw.column,
            line_content: raw.line_content.unwrap_or_default(),
            priority: raw.priority,
        }
    }
}

/// Parse raw scanner output into a [`ScanReport`].
///
/// With a non-empty `vocabulary`, items whose tag is not listed are dropped
/// (exact, case-sensitive match).
pub fn normalize(raw: &str, vocabulary: &[String]) -> Result<ScanReport, ScanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(ScanReport::empty());
    }

    let files = match serde_json::from_str::<RawOutput>(trimmed)? {
        RawOutput::Report { files } => files,
        RawOutput::Files(files) => files,
    };

    let files = files
        .into_iter()
        .map(|f| FileReport {
            path: normalize_path(&f.path),
            todos: f
                .todos
                .into_iter()
                .filter(|item| vocabulary.is_empty() || vocabulary.contains(&item.tag))
                .map(TaggedItem::from)
                .collect(),
        })
        .collect();

    Ok(ScanReport::from_files(files))
}

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").map(String::from).unwrap_or(path)
}
