use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::pipeline::ScanSettings;
use crate::policy::{PolicyRules, DEFAULT_FAILING_TAGS};

pub const CONFIG_FILE: &str = ".tagwatch.toml";

/// Default cap on emitted annotations.
pub const DEFAULT_MAX_ANNOTATIONS: usize = 50;

/// Top-level configuration from `.tagwatch.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// External scanner program.
    #[serde(default = "default_scanner")]
    pub scanner: String,
    /// Extra arguments placed before the scanner's own flags.
    #[serde(default)]
    pub scanner_args: Vec<String>,
    /// Tag vocabulary; empty means every tag the scanner recognizes.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub jobs: Option<usize>,
}

fn default_scanner() -> String {
    "todo-scanner".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scanner: default_scanner(),
            scanner_args: Vec::new(),
            tags: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            jobs: None,
        }
    }
}

/// Restricting the scan to changed files and to newly introduced items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub changed_only: bool,
    #[serde(default)]
    pub new_only: bool,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub fail_on_any: bool,
    #[serde(default)]
    pub fail_on_tags: bool,
    #[serde(default = "default_failing_tags")]
    pub failing_tags: Vec<String>,
    #[serde(default)]
    pub max_allowed: Option<usize>,
}

fn default_failing_tags() -> Vec<String> {
    DEFAULT_FAILING_TAGS.iter().map(|t| t.to_string()).collect()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            fail_on_any: false,
            fail_on_tags: false,
            failing_tags: default_failing_tags(),
            max_allowed: None,
        }
    }
}

/// Severity marker of an annotation directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Notice,
    #[default]
    Warning,
    Error,
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationLevel::Notice => write!(f, "notice"),
            AnnotationLevel::Warning => write!(f, "warning"),
            AnnotationLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for AnnotationLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notice" | "info" => Ok(AnnotationLevel::Notice),
            "warning" | "warn" => Ok(AnnotationLevel::Warning),
            "error" => Ok(AnnotationLevel::Error),
            _ => Err(anyhow::anyhow!("unknown annotation level: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub annotations: bool,
    #[serde(default = "default_max_annotations")]
    pub max_annotations: usize,
    #[serde(default)]
    pub annotation_level: AnnotationLevel,
    /// Also write the JSON report to this file.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_max_annotations() -> usize {
    DEFAULT_MAX_ANNOTATIONS
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            annotations: true,
            max_annotations: DEFAULT_MAX_ANNOTATIONS,
            annotation_level: AnnotationLevel::default(),
            report_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a `.tagwatch.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `tagwatch init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.tagwatch.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!("using config {}", config_path.display());
                        config
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Settings for the scan pipeline.
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            tags: self.scan.tags.clone(),
            include: self.scan.include.clone(),
            exclude: self.scan.exclude.clone(),
            jobs: self.scan.jobs,
        }
    }

    /// Fail-the-build rules derived from `[policy]`.
    pub fn policy_rules(&self) -> PolicyRules {
        let fail_on_tags: BTreeSet<String> = if self.policy.fail_on_tags {
            self.policy.failing_tags.iter().cloned().collect()
        } else {
            BTreeSet::new()
        };
        PolicyRules {
            fail_on_any_tag: self.policy.fail_on_any,
            fail_on_tags,
            max_allowed: self.policy.max_allowed,
        }
    }

    /// Generate default TOML content for `tagwatch init`.
    pub fn default_toml() -> String {
        r#"# tagwatch - tagged comment scanning for CI

[scan]
# External scanner that prints JSON for a file or directory
scanner = "todo-scanner"
# Restrict to these tags (empty = every tag the scanner knows)
tags = []
# Glob patterns, matched against paths relative to the scan root
include = []
exclude = ["vendor/**", "node_modules/**"]

[diff]
# Only scan files changed between base and head
changed_only = false
# Only report items that do not exist on the base revision
new_only = false
# base = "origin/main"
# head = "HEAD"

[policy]
fail_on_any = false
fail_on_tags = false
failing_tags = ["FIXME", "BUG"]
# max_allowed = 10

[output]
annotations = true
max_annotations = 50
# "notice", "warning" or "error"
annotation_level = "warning"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.scanner, "todo-scanner");
        assert!(config.scan.tags.is_empty());
        assert!(!config.diff.changed_only);
        assert_eq!(config.policy.failing_tags, vec!["FIXME", "BUG"]);
        assert_eq!(config.output.max_annotations, 50);
        assert!(config.output.annotations);
        assert_eq!(config.policy_rules(), PolicyRules::default());
    }

    #[test]
    fn test_deserialize_config() {
        let toml_str = r#"
[scan]
tags = ["TODO", "HACK"]
include = ["src/**"]
jobs = 4

[diff]
changed_only = true
new_only = true
base = "origin/main"

[policy]
fail_on_tags = true
failing_tags = ["HACK"]
max_allowed = 7

[output]
max_annotations = 10
annotation_level = "error"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scan.tags, vec!["TODO", "HACK"]);
        assert_eq!(config.scan.jobs, Some(4));
        assert_eq!(config.diff.base.as_deref(), Some("origin/main"));
        assert_eq!(config.output.annotation_level, AnnotationLevel::Error);

        let rules = config.policy_rules();
        assert!(!rules.fail_on_any_tag);
        assert_eq!(rules.max_allowed, Some(7));
        assert!(rules.fail_on_tags.contains("HACK"));
        assert_eq!(rules.fail_on_tags.len(), 1);
    }

    #[test]
    fn test_failing_tags_default_when_enabled() {
        let config: Config = toml::from_str("[policy]\nfail_on_tags = true\n").unwrap();
        assert_eq!(config.policy_rules().fail_on_tags, PolicyRules::default_failing_tags());
    }

    #[test]
    fn test_default_toml_is_valid() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.scan.exclude, vec!["vendor/**", "node_modules/**"]);
        assert_eq!(config.output.annotation_level, AnnotationLevel::Warning);
    }

    #[test]
    fn test_load_or_default_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[scan]\ntags = [\"BUG\"]\n").unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load_or_default(&nested);
        assert_eq!(config.scan.tags, vec!["BUG"]);
    }

    #[test]
    fn test_load_or_default_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[scan\nnot toml").unwrap();
        let config = Config::load_or_default(dir.path());
        assert!(config.scan.tags.is_empty());
    }

    #[test]
    fn test_load_explicit_broken_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[policy]\nmax_allowed = \"many\"\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_annotation_level_parse() {
        assert_eq!("warn".parse::<AnnotationLevel>().unwrap(), AnnotationLevel::Warning);
        assert_eq!("ERROR".parse::<AnnotationLevel>().unwrap(), AnnotationLevel::Error);
        assert_eq!("notice".parse::<AnnotationLevel>().unwrap(), AnnotationLevel::Notice);
        assert!("loud".parse::<AnnotationLevel>().is_err());
    }
}
