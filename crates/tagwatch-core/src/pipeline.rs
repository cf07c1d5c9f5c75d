use std::path::Path;

use rayon::prelude::*;

use crate::glob_filter::GlobFilter;
use crate::normalize::normalize;
use crate::scanner::{ScanError, ScanRequest, TagExtractor};
use crate::types::ScanReport;

/// Settings shared by every scan of one run.
#[derive(Debug, Clone, Default)]
pub struct ScanSettings {
    /// Tag vocabulary; empty means all tags.
    pub tags: Vec<String>,
    /// Inclusion globs applied to reported paths in whole-tree mode.
    pub include: Vec<String>,
    /// Exclusion globs handed to the scanner.
    pub exclude: Vec<String>,
    /// Worker threads for file-list mode; `None` uses rayon's default.
    pub jobs: Option<usize>,
}

/// Runs the external scanner and merges its output into one report.
///
/// Scanning never fails as a whole: an unusable scanner yields an empty
/// report, a failing file contributes nothing.
pub struct ScanPipeline {
    extractor: Box<dyn TagExtractor>,
    settings: ScanSettings,
    include: GlobFilter,
}

impl ScanPipeline {
    pub fn new(extractor: Box<dyn TagExtractor>, settings: ScanSettings) -> Self {
        let include = GlobFilter::new(&settings.include);
        Self {
            extractor,
            settings,
            include,
        }
    }

    fn request(&self) -> ScanRequest {
        ScanRequest {
            tags: self.settings.tags.clone(),
            exclude: self.settings.exclude.clone(),
        }
    }

    fn scan_one(
        &self,
        root: &Path,
        target: &Path,
        request: &ScanRequest,
    ) -> Result<ScanReport, ScanError> {
        let raw = self.extractor.extract(root, target, request)?;
        normalize(&raw, &self.settings.tags)
    }

    /// Whole-tree mode: one scanner invocation against `root`.
    pub fn scan_tree(&self, root: &Path) -> ScanReport {
        if !self.extractor.is_available() {
            tracing::warn!(
                "scanner '{}' is not available, producing an empty report",
                self.extractor.name()
            );
            return ScanReport::empty();
        }

        let report = match self.scan_one(root, Path::new("."), &self.request()) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("scan of {} failed: {e}", root.display());
                return ScanReport::empty();
            }
        };

        if self.include.is_empty() {
            report
        } else {
            report.retain_paths(|p| self.include.matches(p))
        }
    }

    /// File-list mode: one scanner invocation per file, merged in input order.
    ///
    /// Paths are relative to `root`. Files are scanned concurrently on a
    /// bounded pool.
    pub fn scan_files(&self, root: &Path, files: &[String]) -> ScanReport {
        if files.is_empty() {
            tracing::info!("no files to scan");
            return ScanReport::empty();
        }
        if !self.extractor.is_available() {
            tracing::warn!(
                "scanner '{}' is not available, producing an empty report",
                self.extractor.name()
            );
            return ScanReport::empty();
        }

        let request = self.request();
        let scan_all = || -> Vec<ScanReport> {
            files
                .par_iter()
                .map(|file| match self.scan_one(root, Path::new(file), &request) {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::warn!("skipping {file}: {e}");
                        ScanReport::empty()
                    }
                })
                .collect()
        };

        let reports = match self.settings.jobs {
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(scan_all),
                Err(e) => {
                    tracing::warn!("failed to build a {jobs}-thread pool, using the global one: {e}");
                    scan_all()
                }
            },
            None => scan_all(),
        };

        tracing::debug!("scanned {} file(s)", reports.len());
        merge_reports(reports)
    }
}

/// Concatenate reports in order and recompute the summary.
pub fn merge_reports(reports: Vec<ScanReport>) -> ScanReport {
    let files = reports.into_iter().flat_map(|r| r.files).collect();
    ScanReport::from_files(files)
}
