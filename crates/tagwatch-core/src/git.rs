use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::glob_filter::GlobFilter;

/// Committer identity for the stash commit, so restoring works on CI
/// runners without a configured git user.
const STASH_IDENTITY: [&str; 4] = [
    "-c",
    "user.name=tagwatch",
    "-c",
    "user.email=tagwatch@localhost",
];

fn git(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Files added, copied, modified or renamed between `base` and `head`.
///
/// `head` defaults to `HEAD`. Only files under `root` are listed, with
/// paths relative to `root`. Paths are read NUL-separated so names with
/// non-ASCII or special characters come back unquoted.
pub fn changed_files(root: &Path, base: &str, head: Option<&str>) -> Result<Vec<String>> {
    let head = head.filter(|h| !h.is_empty()).unwrap_or("HEAD");
    let stdout = git(
        root,
        &[
            "diff",
            "--name-only",
            "-z",
            "--relative",
            "--diff-filter=ACMR",
            base,
            head,
        ],
    )
    .with_context(|| format!("failed to list files changed between {base} and {head}"))?;

    Ok(stdout
        .split('\0')
        .filter(|path| !path.is_empty())
        .map(String::from)
        .collect())
}

/// Candidate files that pass the include filter and are not excluded,
/// in their original order.
pub fn select_changed(files: &[String], include: &GlobFilter, exclude: &GlobFilter) -> Vec<String> {
    files
        .iter()
        .filter(|f| include.matches(f) && !exclude.excludes(f))
        .cloned()
        .collect()
}

/// The working tree switched to a base revision.
///
/// While the guard lives the tree is at the base revision; dropping it
/// checks the original ref out again and restores stashed local changes.
/// Only one guard may exist per working tree at a time.
pub struct BaseCheckout {
    root: PathBuf,
    original: String,
    /// Commit of the stash entry this guard created, if any.
    stash: Option<String>,
}

/// Current top of the stash, `None` when the stash is empty.
fn stash_top(root: &Path) -> Option<String> {
    git(root, &["rev-parse", "-q", "--verify", "refs/stash"]).ok()
}

impl BaseCheckout {
    /// Save local changes, then check out `rev`.
    ///
    /// If the checkout fails the stash is restored before the error is
    /// returned.
    pub fn acquire(root: &Path, rev: &str) -> Result<Self> {
        let branch = git(root, &["rev-parse", "--abbrev-ref", "HEAD"])
            .context("failed to determine current revision")?;
        let original = if branch == "HEAD" {
            git(root, &["rev-parse", "HEAD"]).context("failed to resolve detached HEAD")?
        } else {
            branch
        };

        let dirty = !git(root, &["status", "--porcelain"])?.is_empty();

        // From here on, Drop restores whatever has been changed.
        let mut guard = Self {
            root: root.to_path_buf(),
            original,
            stash: None,
        };

        if dirty {
            let before = stash_top(root);
            let mut args: Vec<&str> = STASH_IDENTITY.to_vec();
            args.extend(["stash", "push", "--include-untracked", "-m", "tagwatch base scan"]);
            git(root, &args).context("failed to stash local changes")?;
            // `stash push` succeeds without creating an entry when nothing
            // it tracks changed (e.g. only a submodule is dirty).
            let after = stash_top(root);
            if after.is_some() && after != before {
                guard.stash = after;
            }
        }

        git(root, &["checkout", "--quiet", rev])
            .with_context(|| format!("failed to check out base revision {rev}"))?;

        tracing::debug!("checked out {rev} (was {})", guard.original);
        Ok(guard)
    }

    fn restore(&mut self) -> Result<()> {
        git(&self.root, &["checkout", "--quiet", &self.original])
            .with_context(|| format!("failed to restore {}", self.original))?;
        let Some(stash) = self.stash.take() else {
            return Ok(());
        };
        if stash_top(&self.root).as_deref() == Some(stash.as_str()) {
            git(&self.root, &["stash", "pop", "--quiet", "stash@{0}"])
                .context("failed to restore stashed changes")?;
        } else {
            // Someone stashed on top of ours; apply by commit and leave the entry.
            git(&self.root, &["stash", "apply", "--quiet", &stash])
                .with_context(|| format!("failed to restore stashed changes from {stash}"))?;
            tracing::warn!(
                "restored local changes from stash commit {stash}; the entry was left in the stash"
            );
        }
        Ok(())
    }
}

impl Drop for BaseCheckout {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!(
                "working tree at {} may not be restored: {e:#}",
                self.root.display()
            );
        }
    }
}

/// Run `f` with the working tree at `rev`, restoring it afterwards.
pub fn with_base_checkout<T>(root: &Path, rev: &str, f: impl FnOnce() -> T) -> Result<T> {
    let guard = BaseCheckout::acquire(root, rev)?;
    let out = f();
    drop(guard);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn run(root: &Path, args: &[&str]) {
        let mut all: Vec<&str> = STASH_IDENTITY.to_vec();
        all.extend_from_slice(args);
        git(root, &all).unwrap();
    }

    /// Repo with two commits: `first` has a.txt = "one", HEAD has a.txt = "two" and b.txt.
    fn fixture_repo() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        run(root, &["init", "--quiet", "-b", "main"]);
        fs::write(root.join("a.txt"), "one\n").unwrap();
        run(root, &["add", "."]);
        run(root, &["commit", "--quiet", "-m", "first"]);
        let first = git(root, &["rev-parse", "HEAD"]).unwrap();
        fs::write(root.join("a.txt"), "two\n").unwrap();
        fs::write(root.join("b.txt"), "new\n").unwrap();
        run(root, &["add", "."]);
        run(root, &["commit", "--quiet", "-m", "second"]);
        (dir, first)
    }

    #[test]
    fn test_select_changed_preserves_order() {
        let files: Vec<String> = ["z.go", "docs/a.md", "vendor/x.go", "a.go"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let selected = select_changed(
            &files,
            &GlobFilter::parse("*.go"),
            &GlobFilter::parse("vendor/**"),
        );
        assert_eq!(selected, vec!["z.go", "a.go"]);
    }

    #[test]
    fn test_select_changed_no_patterns_keeps_all() {
        let files = vec!["a".to_string(), "b".to_string()];
        let selected = select_changed(&files, &GlobFilter::parse(""), &GlobFilter::parse(""));
        assert_eq!(selected, files);
    }

    #[test]
    fn test_changed_files_lists_diff() {
        if !git_available() {
            return;
        }
        let (dir, first) = fixture_repo();
        let mut files = changed_files(dir.path(), &first, None).unwrap();
        files.sort();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_changed_files_keeps_non_ascii_names_unquoted() {
        if !git_available() {
            return;
        }
        let (dir, first) = fixture_repo();
        let root = dir.path();
        let base = git(root, &["rev-parse", "HEAD"]).unwrap();
        fs::write(root.join("café.go"), "// TODO: accent\n").unwrap();
        fs::write(root.join("with space.go"), "// TODO: space\n").unwrap();
        run(root, &["add", "."]);
        run(root, &["commit", "--quiet", "-m", "third"]);

        let mut files = changed_files(root, &base, None).unwrap();
        files.sort();
        assert_eq!(files, vec!["café.go", "with space.go"]);
        assert!(files.iter().all(|f| root.join(f).exists()));
        assert!(changed_files(root, &first, None).unwrap().contains(&"café.go".to_string()));
    }

    #[test]
    fn test_changed_files_bad_revision_errors() {
        if !git_available() {
            return;
        }
        let (dir, _) = fixture_repo();
        assert!(changed_files(dir.path(), "does-not-exist", Some("HEAD")).is_err());
    }

    #[test]
    fn test_base_checkout_restores_tree_and_local_changes() {
        if !git_available() {
            return;
        }
        let (dir, first) = fixture_repo();
        let root = dir.path();
        fs::write(root.join("a.txt"), "local edit\n").unwrap();
        fs::write(root.join("untracked.txt"), "scratch\n").unwrap();

        let seen = with_base_checkout(root, &first, || {
            (
                fs::read_to_string(root.join("a.txt")).unwrap(),
                root.join("b.txt").exists(),
                root.join("untracked.txt").exists(),
            )
        })
        .unwrap();
        assert_eq!(seen, ("one\n".to_string(), false, false));

        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "local edit\n");
        assert!(root.join("b.txt").exists());
        assert!(root.join("untracked.txt").exists());
        assert_eq!(git(root, &["rev-parse", "--abbrev-ref", "HEAD"]).unwrap(), "main");
    }

    #[test]
    fn test_failed_checkout_restores_local_changes() {
        if !git_available() {
            return;
        }
        let (dir, _) = fixture_repo();
        let root = dir.path();
        fs::write(root.join("a.txt"), "local edit\n").unwrap();

        let result = with_base_checkout(root, "no-such-rev", || ());
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "local edit\n");
    }

    #[test]
    fn test_dirty_submodule_leaves_existing_stash_alone() {
        if !git_available() {
            return;
        }
        let lib_dir = tempfile::tempdir().unwrap();
        let lib = lib_dir.path();
        run(lib, &["init", "--quiet", "-b", "main"]);
        fs::write(lib.join("x.txt"), "lib\n").unwrap();
        run(lib, &["add", "."]);
        run(lib, &["commit", "--quiet", "-m", "lib"]);

        let (dir, _) = fixture_repo();
        let root = dir.path();
        let lib_path = lib.to_string_lossy().to_string();
        let mut add: Vec<&str> = STASH_IDENTITY.to_vec();
        add.extend([
            "-c",
            "protocol.file.allow=always",
            "submodule",
            "add",
            "--quiet",
            lib_path.as_str(),
            "sub",
        ]);
        if git(root, &add).is_err() {
            return;
        }
        run(root, &["commit", "--quiet", "-m", "add submodule"]);
        let base = git(root, &["rev-parse", "HEAD"]).unwrap();
        fs::write(root.join("b.txt"), "newer\n").unwrap();
        run(root, &["commit", "--quiet", "-am", "after submodule"]);

        fs::write(root.join("a.txt"), "user wip\n").unwrap();
        run(root, &["stash", "push", "--quiet", "-m", "user wip"]);
        fs::write(root.join("sub/x.txt"), "dirty\n").unwrap();
        assert!(!git(root, &["status", "--porcelain"]).unwrap().is_empty());

        with_base_checkout(root, &base, || ()).unwrap();

        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "two\n");
        assert!(git(root, &["stash", "list"]).unwrap().contains("user wip"));
        assert_eq!(fs::read_to_string(root.join("sub/x.txt")).unwrap(), "dirty\n");
    }

    #[test]
    fn test_own_stash_is_popped_not_older_entries() {
        if !git_available() {
            return;
        }
        let (dir, first) = fixture_repo();
        let root = dir.path();
        fs::write(root.join("a.txt"), "user wip\n").unwrap();
        run(root, &["stash", "push", "--quiet", "-m", "user wip"]);
        fs::write(root.join("b.txt"), "local edit\n").unwrap();

        with_base_checkout(root, &first, || ()).unwrap();

        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "two\n");
        assert_eq!(fs::read_to_string(root.join("b.txt")).unwrap(), "local edit\n");
        let stashes = git(root, &["stash", "list"]).unwrap();
        assert_eq!(stashes.lines().count(), 1);
        assert!(stashes.contains("user wip"));
    }

    #[test]
    fn test_not_a_repository_is_error() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        assert!(BaseCheckout::acquire(dir.path(), "HEAD~1").is_err());
    }
}
