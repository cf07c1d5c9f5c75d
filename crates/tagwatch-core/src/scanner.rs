use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// What the scanner is asked to look for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    /// Tag vocabulary; empty means every tag the scanner recognizes.
    pub tags: Vec<String>,
    /// Exclusion globs, passed through to the scanner.
    pub exclude: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scanner '{program}' is not available")]
    Unavailable { program: String },

    #[error("scanner failed on '{target}' ({status}): {stderr}")]
    Failed {
        target: String,
        status: String,
        stderr: String,
    },

    #[error("failed to run scanner: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scanner output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The external tag-extraction capability.
///
/// Implementations turn a file or directory into raw scanner output; the
/// output is translated into the report model by [`crate::normalize`].
pub trait TagExtractor: Send + Sync {
    /// Human-readable name, used in log messages.
    fn name(&self) -> &str;

    /// Whether the capability can be used at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Scan `target` (relative to `root`) and return the raw output.
    fn extract(&self, root: &Path, target: &Path, request: &ScanRequest)
        -> Result<String, ScanError>;
}

/// Runs an external scanner program that prints JSON on stdout.
///
/// Invocation: `<program> [args..] --format json [--tags A,B] [--exclude P].. <target>`
/// with the scan root as working directory. Availability is probed with
/// `<program> [args..] --version`.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra leading arguments, e.g. a subcommand.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn command_for(&self, target: &Path, request: &ScanRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(["--format", "json"]);
        if !request.tags.is_empty() {
            cmd.arg("--tags").arg(request.tags.join(","));
        }
        for pattern in &request.exclude {
            cmd.arg("--exclude").arg(pattern);
        }
        cmd.arg(target);
        cmd
    }
}

impl TagExtractor for CommandExtractor {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("scanner")
    }

    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .args(&self.args)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn extract(
        &self,
        root: &Path,
        target: &Path,
        request: &ScanRequest,
    ) -> Result<String, ScanError> {
        let output = match self.command_for(target, request).current_dir(root).output() {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::Unavailable {
                    program: self.program_name(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            return Err(ScanError::Failed {
                target: target.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
