//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the studio crates:
//! - No sleep() calls in production code
//! - Async I/O only inside async functions
//!
//! The helpers here find production sources and classify lines; the rules
//! themselves live in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["studio/core/src", "studio/cli/src"];

/// Kind of function enclosing a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// `fn`
    Sync,
    /// `async fn`
    Async,
}

/// A Rust source file loaded for inspection
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// File contents
    pub content: String,
}

impl SourceFile {
    /// Lines up to the first `#[cfg(test)]` (test modules sit at the end)
    pub fn production_lines(&self) -> Vec<&str> {
        self.content
            .lines()
            .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
            .collect()
    }
}

/// Workspace root, derived from this package's manifest directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Load every `.rs` file under the production directories
///
/// # Panics
///
/// Panics if a production directory is missing, so a moved crate cannot
/// silently escape the checks.
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.is_dir(), "production directory missing: {}", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(SourceFile {
                path: relative,
                content,
            });
        }
    }

    files
}

/// The part of a line before any `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Classify a line as a function signature
pub fn fn_signature(line: &str) -> Option<FnKind> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }

    let (kind, rest) = match rest.strip_prefix("async ") {
        Some(stripped) => (FnKind::Async, stripped),
        None => (FnKind::Sync, rest),
    };
    rest.starts_with("fn ").then_some(kind)
}

/// Kind of the nearest function signature above `idx`
pub fn enclosing_fn(lines: &[&str], idx: usize) -> Option<FnKind> {
    lines[..=idx.min(lines.len().saturating_sub(1))]
        .iter()
        .rev()
        .find_map(|line| fn_signature(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature() {
        assert_eq!(fn_signature("    fn feed(&mut self) {"), Some(FnKind::Sync));
        assert_eq!(fn_signature("pub fn load_config() -> X {"), Some(FnKind::Sync));
        assert_eq!(fn_signature("    pub async fn run(self) {"), Some(FnKind::Async));
        assert_eq!(fn_signature("async fn main() {"), Some(FnKind::Async));
        assert_eq!(fn_signature("    let f = fnord;"), None);
    }

    #[test]
    fn test_enclosing_fn() {
        let lines = [
            "pub fn load() {",
            "    std::fs::read_to_string(p);",
            "}",
            "async fn go() {",
            "    x.await;",
        ];
        assert_eq!(enclosing_fn(&lines, 1), Some(FnKind::Sync));
        assert_eq!(enclosing_fn(&lines, 4), Some(FnKind::Async));
    }

    #[test]
    fn test_production_lines_stop_at_tests() {
        let file = SourceFile {
            path: PathBuf::from("x.rs"),
            content: "fn a() {}\n#[cfg(test)]\nmod tests {}\n".to_string(),
        };
        assert_eq!(file.production_lines(), vec!["fn a() {}"]);
    }

    #[test]
    fn test_code_part() {
        assert_eq!(code_part("let x = 1; // std::fs::read"), "let x = 1; ");
    }
}
