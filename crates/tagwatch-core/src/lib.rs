pub mod config;
pub mod diff;
pub mod git;
pub mod glob_filter;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod scanner;
pub mod types;

pub use config::Config;
pub use diff::{apply_new_only, diff_new};
pub use glob_filter::GlobFilter;
pub use pipeline::{merge_reports, ScanPipeline, ScanSettings};
pub use policy::{evaluate, PolicyRules, Verdict};
pub use scanner::{CommandExtractor, ScanError, ScanRequest, TagExtractor};
pub use types::*;
