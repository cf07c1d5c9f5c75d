use globset::{Glob, GlobSet, GlobSetBuilder};

/// Inclusion/exclusion filter over relative file paths, built from a
/// comma-separated list of shell-style glob patterns.
pub struct GlobFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

/// Split a comma-separated list, trimming elements and dropping empty ones.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!("skipping invalid glob pattern '{pattern}': {e}"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("failed to compile glob patterns: {e}");
        GlobSet::empty()
    })
}

impl GlobFilter {
    /// Parse a comma-separated pattern list such as `" *.go , *.md "`.
    pub fn parse(list: &str) -> Self {
        Self::new(&split_list(list))
    }

    pub fn new(patterns: &[String]) -> Self {
        let patterns: Vec<String> = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        let set = build_globset(&patterns);
        Self { patterns, set }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Inclusion test: an empty filter matches every path.
    pub fn matches(&self, path: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        self.set.is_match(normalize(path))
    }

    /// Exclusion test: an empty filter excludes nothing.
    pub fn excludes(&self, path: &str) -> bool {
        !self.is_empty() && self.set.is_match(normalize(path))
    }
}

fn normalize(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => normalized,
    }
}

/// Does `path` match any of `patterns`? An empty list matches everything.
pub fn matches(path: &str, patterns: &[String]) -> bool {
    GlobFilter::new(patterns).matches(path)
}
