//! Exclusion filter: decides per-path whether a file or directory is ignored.
//!
//! Three ordered rules: directory-name match, extension match, size bound.
//! The first matching rule wins; reasons are reported back to the indexer's
//! skipped list rather than treated as errors.

use std::path::Path;

/// Directories pruned from descent during indexing.
pub const EXCLUDE_DIR_NAMES: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "libs",
    "__pycache__",
    ".venv",
    "venv",
    ".git",
    ".idea",
    ".vscode",
];

/// File extensions (matched case-insensitively against the full path suffix).
pub const EXCLUDE_EXTENSIONS: &[&str] =
    &[".tmp", ".log", ".pyc", ".pyo", ".pyd", ".DS_Store"];

/// Default maximum file size, in megabytes.
pub const MAX_FILE_SIZE_MB: u64 = 256;

/// Outcome of evaluating a path against a [`FilterConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(String),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Runtime-overridable exclusion bounds. Defaults mirror the compiled-in
/// constants above; the destination indexer constructs one with
/// `max_size_bytes` effectively unbounded (see §4.2 of the spec) so an
/// older large file already in the mirror is still seen and considered for
/// deletion.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub excluded_dir_names: Vec<String>,
    pub excluded_extensions: Vec<String>,
    pub max_size_bytes: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_dir_names: EXCLUDE_DIR_NAMES.iter().map(|s| s.to_string()).collect(),
            excluded_extensions: EXCLUDE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
        }
    }
}

impl FilterConfig {
    /// A config with directory/extension rules unchanged but an effectively
    /// unbounded size cap, for indexing the destination tree.
    pub fn unbounded_size(mut self) -> Self {
        self.max_size_bytes = u64::MAX;
        self
    }

    /// True if `name` (a single path component) is an excluded directory name.
    pub fn is_excluded_dir_name(&self, name: &str) -> bool {
        self.excluded_dir_names.iter().any(|d| d == name)
    }

    /// Evaluate a path against the three ordered rules. `is_file` and `size`
    /// come from a prior `stat`; pass `size = 0` for directories, which are
    /// never subject to rule 3.
    pub fn evaluate(&self, path: &Path, is_file: bool, size: u64) -> Decision {
        for component in path.components() {
            if let Some(name) = component.as_os_str().to_str() {
                if self.is_excluded_dir_name(name) {
                    return Decision::Reject(format!("Excluded directory: {name}"));
                }
            }
        }

        let path_lower = path.to_string_lossy().to_lowercase();
        for ext in &self.excluded_extensions {
            if path_lower.ends_with(&ext.to_lowercase()) {
                return Decision::Reject(format!("Excluded extension: {ext}"));
            }
        }

        if is_file && size > self.max_size_bytes {
            let size_mb = size as f64 / (1024.0 * 1024.0);
            let max_mb = self.max_size_bytes as f64 / (1024.0 * 1024.0);
            return Decision::Reject(format!("File size {size_mb:.1}MB > {max_mb:.1}MB"));
        }

        Decision::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_file() {
        let cfg = FilterConfig::default();
        assert_eq!(cfg.evaluate(Path::new("src/main.rs"), true, 1024), Decision::Accept);
    }

    #[test]
    fn test_rejects_excluded_directory() {
        let cfg = FilterConfig::default();
        let decision = cfg.evaluate(Path::new("project/node_modules/pkg/index.js"), true, 10);
        assert!(!decision.is_accepted());
    }

    #[test]
    fn test_rejects_excluded_extension_case_insensitive() {
        let cfg = FilterConfig::default();
        let decision = cfg.evaluate(Path::new("build/output.LOG"), true, 10);
        assert!(!decision.is_accepted());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let cfg = FilterConfig::default();
        let too_big = MAX_FILE_SIZE_MB * 1024 * 1024 + 1;
        let decision = cfg.evaluate(Path::new("big.bin"), true, too_big);
        assert!(!decision.is_accepted());
    }

    #[test]
    fn test_unbounded_size_accepts_large_file() {
        let cfg = FilterConfig::default().unbounded_size();
        let huge = MAX_FILE_SIZE_MB * 1024 * 1024 * 100;
        assert_eq!(cfg.evaluate(Path::new("huge.bin"), true, huge), Decision::Accept);
    }

    #[test]
    fn test_directory_rule_takes_priority_over_size() {
        let cfg = FilterConfig::default();
        let decision =
            cfg.evaluate(Path::new("node_modules/huge.bin"), true, u64::MAX / 2);
        match decision {
            Decision::Reject(reason) => assert!(reason.contains("Excluded directory")),
            Decision::Accept => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_size_rule_skipped_for_directories() {
        let cfg = FilterConfig::default();
        assert_eq!(cfg.evaluate(Path::new("some/dir"), false, u64::MAX), Decision::Accept);
    }
}
