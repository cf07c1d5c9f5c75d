use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tagwatch_core::config::{Config, CONFIG_FILE};
use tagwatch_core::diff::diff_new;
use tagwatch_core::types::ScanReport;
use tagwatch_report::json;

mod scan;

#[derive(Parser)]
#[command(name = "tagwatch")]
#[command(about = "Find TODO/FIXME comments, report the new ones, and gate CI on them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source tree, emit annotations and outputs, and apply fail rules
    Scan(ScanArgs),
    /// Print the items of CURRENT that are not present in BASE (two saved JSON reports)
    Diff {
        /// Report of the current revision
        current: PathBuf,
        /// Report of the base revision
        base: PathBuf,
        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Create a default .tagwatch.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Options of `tagwatch scan`. Every option overrides `.tagwatch.toml`.
#[derive(Debug, Args)]
struct ScanArgs {
    /// Scan root
    #[arg(default_value = ".")]
    path: PathBuf,
    /// Config file path (defaults to .tagwatch.toml in the scan root or an ancestor)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Comma-separated tags to report, e.g. "TODO,FIXME"
    #[arg(long)]
    tags: Option<String>,
    /// Comma-separated glob patterns of files to include
    #[arg(long)]
    include: Option<String>,
    /// Comma-separated glob patterns of files to exclude
    #[arg(long)]
    exclude: Option<String>,
    /// Only scan files changed between --base and --head
    #[arg(long)]
    changed_only: bool,
    /// Base revision for --changed-only and --new-only
    #[arg(long)]
    base: Option<String>,
    /// Head revision for --changed-only (default HEAD)
    #[arg(long)]
    head: Option<String>,
    /// Only report items not present on the base revision
    #[arg(long)]
    new_only: bool,
    /// Fail if any tagged comment is found
    #[arg(long)]
    fail_on_any: bool,
    /// Fail if any item carries one of the failing tags
    #[arg(long)]
    fail_on_tags: bool,
    /// Comma-separated failing tags (default "FIXME,BUG")
    #[arg(long)]
    failing_tags: Option<String>,
    /// Fail if more than this many items are found
    #[arg(long)]
    max_allowed: Option<usize>,
    /// Do not print annotation directives
    #[arg(long)]
    no_annotations: bool,
    /// Maximum number of annotation directives
    #[arg(long)]
    max_annotations: Option<usize>,
    /// Annotation severity: notice, warning or error
    #[arg(long)]
    annotation_level: Option<String>,
    /// Output format on stdout
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Single-line JSON output
    #[arg(long)]
    compact: bool,
    /// Also write the JSON report to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Step output file (defaults to $GITHUB_OUTPUT)
    #[arg(long)]
    github_output: Option<PathBuf>,
    /// External scanner program
    #[arg(long)]
    scanner: Option<String>,
    /// Worker threads for per-file scanning
    #[arg(long)]
    jobs: Option<usize>,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan(args) => scan::cmd_scan(&args),
        Commands::Diff {
            current,
            base,
            compact,
        } => cmd_diff(&current, &base, compact),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

/// Logs go to stderr; stdout carries annotations and the report.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagwatch=info,tagwatch_core=info,tagwatch_report=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn cmd_diff(current: &Path, base: &Path, compact: bool) -> Result<()> {
    let current = std::fs::read_to_string(current)
        .with_context(|| format!("failed to read {}", current.display()))?;
    let base = std::fs::read_to_string(base)
        .with_context(|| format!("failed to read {}", base.display()))?;

    let report = diff_new(
        &ScanReport::from_json_lossy(&current),
        &ScanReport::from_json_lossy(&base),
    );
    println!("{}", json::format_report(&report, compact));
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}
