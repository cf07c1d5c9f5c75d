use std::io::Write;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};

use tagwatch_core::config::{AnnotationLevel, Config};
use tagwatch_core::diff::{apply_new_only, diff_new};
use tagwatch_core::git;
use tagwatch_core::glob_filter::{split_list, GlobFilter};
use tagwatch_core::pipeline::ScanPipeline;
use tagwatch_core::policy::evaluate;
use tagwatch_core::scanner::CommandExtractor;
use tagwatch_core::types::ScanReport;
use tagwatch_report::{annotations, json, markdown, outputs, text};

use crate::{OutputFormat, ScanArgs};

/// What one scan pass covers.
enum Targets {
    Tree,
    Files(Vec<String>),
}

impl Targets {
    /// A file list with nothing to scan.
    fn is_empty(&self) -> bool {
        matches!(self, Targets::Files(files) if files.is_empty())
    }
}

impl ScanArgs {
    /// Fold command-line options over the loaded configuration.
    fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(ref tags) = self.tags {
            config.scan.tags = split_list(tags);
        }
        if let Some(ref include) = self.include {
            config.scan.include = split_list(include);
        }
        if let Some(ref exclude) = self.exclude {
            config.scan.exclude = split_list(exclude);
        }
        if let Some(ref scanner) = self.scanner {
            config.scan.scanner = scanner.clone();
        }
        if self.jobs.is_some() {
            config.scan.jobs = self.jobs;
        }

        config.diff.changed_only |= self.changed_only;
        config.diff.new_only |= self.new_only;
        if self.base.is_some() {
            config.diff.base = self.base.clone();
        }
        if self.head.is_some() {
            config.diff.head = self.head.clone();
        }

        config.policy.fail_on_any |= self.fail_on_any;
        config.policy.fail_on_tags |= self.fail_on_tags;
        if let Some(ref tags) = self.failing_tags {
            config.policy.failing_tags = split_list(tags);
        }
        if self.max_allowed.is_some() {
            config.policy.max_allowed = self.max_allowed;
        }

        if self.no_annotations {
            config.output.annotations = false;
        }
        if let Some(max) = self.max_annotations {
            config.output.max_annotations = max;
        }
        if let Some(ref level) = self.annotation_level {
            config.output.annotation_level = level.parse::<AnnotationLevel>()?;
        }
        if self.report.is_some() {
            config.output.report_path = self.report.clone();
        }
        Ok(())
    }
}

fn load_config(root: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(root)),
    }
}

pub fn cmd_scan(args: &ScanArgs) -> Result<()> {
    let root = args.path.as_path();
    if !root.is_dir() {
        anyhow::bail!("scan root '{}' is not a directory", root.display());
    }

    let mut config = load_config(root, args.config.as_deref())?;
    args.apply_to(&mut config)?;

    let extractor = CommandExtractor::new(&config.scan.scanner)
        .with_args(config.scan.scanner_args.clone());
    let pipeline = ScanPipeline::new(Box::new(extractor), config.scan_settings());

    let targets = resolve_targets(root, &config);
    let current = run(&pipeline, root, &targets);

    let report = match (config.diff.new_only, config.diff.base.as_deref()) {
        (true, Some(_)) if targets.is_empty() => {
            tracing::info!("no files selected, skipping the base revision scan");
            diff_new(&current, &ScanReport::empty())
        }
        (true, Some(base)) => {
            let base_report =
                git::with_base_checkout(root, base, || run(&pipeline, root, &targets));
            apply_new_only(current, base_report)
        }
        (true, None) => {
            tracing::warn!("--new-only needs a base revision; reporting all items");
            current
        }
        (false, _) => current,
    };

    emit(args, &config, &report)
}

fn resolve_targets(root: &Path, config: &Config) -> Targets {
    if !config.diff.changed_only {
        return Targets::Tree;
    }
    let Some(base) = config.diff.base.as_deref() else {
        tracing::warn!("--changed-only needs a base revision; scanning the whole tree");
        return Targets::Tree;
    };

    match git::changed_files(root, base, config.diff.head.as_deref()) {
        Ok(files) => {
            let include = GlobFilter::new(&config.scan.include);
            let exclude = GlobFilter::new(&config.scan.exclude);
            let selected = git::select_changed(&files, &include, &exclude);
            tracing::info!(
                "{} changed file(s), {} selected for scanning",
                files.len(),
                selected.len()
            );
            Targets::Files(selected)
        }
        Err(e) => {
            tracing::warn!("could not list changed files, scanning the whole tree: {e:#}");
            Targets::Tree
        }
    }
}

fn run(pipeline: &ScanPipeline, root: &Path, targets: &Targets) -> ScanReport {
    match targets {
        Targets::Tree => pipeline.scan_tree(root),
        Targets::Files(files) => pipeline.scan_files(root, files),
    }
}

fn emit(args: &ScanArgs, config: &Config, report: &ScanReport) -> Result<()> {
    let verdict = evaluate(report, &config.policy_rules());

    if config.output.annotations {
        for line in annotations::render_annotations(
            report,
            config.output.max_annotations,
            config.output.annotation_level,
        ) {
            println!("{line}");
        }
    }

    if let Some(ref path) = config.output.report_path {
        std::fs::write(path, json::format_report(report, args.compact))
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    match args.format {
        OutputFormat::Text => print!("{}", text::format_check(report, &verdict)),
        OutputFormat::Json => println!("{}", json::format_check(report, &verdict, args.compact)),
    }

    let output_file = args
        .github_output
        .clone()
        .or_else(|| std::env::var_os("GITHUB_OUTPUT").map(Into::into));
    if let Some(path) = output_file {
        if let Err(e) = outputs::write_outputs(&path, &outputs::step_outputs(report)) {
            tracing::warn!("failed to write step outputs: {e:#}");
        }
    }

    if let Some(path) = std::env::var_os("GITHUB_STEP_SUMMARY") {
        let summary = markdown::format_summary(report, &verdict);
        if let Err(e) = outputs::append_summary(Path::new(&path), &summary) {
            tracing::warn!("failed to write job summary: {e:#}");
        }
    }

    if !verdict.passed {
        tracing::error!(
            "check failed: {}",
            verdict.reason.as_deref().unwrap_or("policy violated")
        );
        std::io::stdout().flush().ok();
        process::exit(verdict.exit_code());
    }
    Ok(())
}
