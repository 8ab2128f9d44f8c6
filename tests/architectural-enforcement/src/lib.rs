//! Source scanning helpers for the architecture rules
//!
//! Production code is everything in [`PRODUCTION_ROOTS`] up to the first
//! `#[cfg(test)]` line of each file. Comment text is ignored.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Source trees holding production code, relative to the workspace root
pub const PRODUCTION_ROOTS: &[&str] = &["widget/core/src", "tui/src"];

/// A forbidden pattern found in production code
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Path relative to the workspace root, `/`-separated
    pub file: String,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.text)
    }
}

/// Workspace root (two levels above this crate)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .unwrap_or_else(|_| Path::new(env!("CARGO_MANIFEST_DIR")).join("../.."))
}

/// Every `.rs` file under the production roots, as `(relative path, absolute path)`
#[must_use]
pub fn production_sources(root: &Path) -> Vec<(String, PathBuf)> {
    let mut files = Vec::new();
    for dir in PRODUCTION_ROOTS {
        let base = root.join(dir);
        if !base.exists() {
            continue;
        }
        for entry in WalkDir::new(&base).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let relative = path
                .strip_prefix(root)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.push((relative, path.to_path_buf()));
        }
    }
    files.sort();
    files
}

/// Numbered code lines of `source` before its test module, comments stripped
#[must_use]
pub fn production_lines(source: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        lines.push((idx + 1, code));
    }
    lines
}

/// Lines in production code containing any of `needles`
///
/// Files whose relative path ends with one of `allowed` are skipped.
#[must_use]
pub fn find_violations(root: &Path, needles: &[&str], allowed: &[&str]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (relative, path) in production_sources(root) {
        if allowed.iter().any(|a| relative.ends_with(a)) {
            continue;
        }
        let Ok(source) = fs::read_to_string(&path) else {
            continue;
        };
        for (line, code) in production_lines(&source) {
            if needles.iter().any(|n| code.contains(n)) {
                violations.push(Violation {
                    file: relative.clone(),
                    line,
                    text: code.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Report every violation and fail
pub fn assert_clean(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\nCRITICAL: {rule}\n");
    for violation in violations {
        eprintln!("  {violation}");
    }

    panic!(
        "\nFound {} violation(s) of: {rule}.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// x.unwrap()\nlet y = z; // w.unwrap()\n#[cfg(test)]\nmod tests { q.unwrap() }\n";
        let lines = production_lines(source);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (1, "fn a() {}"));
        assert_eq!(lines[1].0, 3);
        assert!(!lines[1].1.contains("unwrap"));
    }

    #[test]
    fn test_violation_display() {
        let violation = Violation {
            file: "tui/src/app.rs".to_string(),
            line: 12,
            text: "x.unwrap()".to_string(),
        };
        assert_eq!(violation.to_string(), "tui/src/app.rs:12: x.unwrap()");
    }

    #[test]
    fn test_production_roots_exist() {
        let root = workspace_root();
        let sources = production_sources(&root);
        assert!(sources.iter().any(|(f, _)| f == "widget/core/src/widget.rs"));
        assert!(sources.iter().any(|(f, _)| f == "tui/src/app.rs"));
    }
}
