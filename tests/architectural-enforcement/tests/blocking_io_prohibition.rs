//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code in the studio crates MUST NOT block inside async
//! functions.
//! **Required**: Use `tokio::fs`, `tokio::io`, `reqwest` (async) in async code.
//! Blocking calls are tolerated in plain `fn`s that run before or outside the
//! runtime, such as configuration loading.

use architectural_enforcement::{code_part, enclosing_fn, production_sources, FnKind};

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in async production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n❌ FORBIDDEN in async fn:");
        eprintln!("  - std::fs::*, std::net::*");
        eprintln!("  - std::process::Command");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("  - std::io::stdin(), std::io::stdout()");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt");
        eprintln!("  - reqwest::Client (async)");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Blocking HTTP is never acceptable, async context or not
#[test]
fn test_no_blocking_http_client() {
    let offenders: Vec<String> = production_sources()
        .iter()
        .flat_map(|file| {
            file.production_lines()
                .iter()
                .enumerate()
                .filter(|(_, line)| code_part(line).contains("reqwest::blocking"))
                .map(|(idx, _)| format!("{}:{}", file.path.display(), idx + 1))
                .collect::<Vec<_>>()
        })
        .collect();

    assert!(offenders.is_empty(), "reqwest::blocking used at {offenders:?}");
}

fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.production_lines();

        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            let Some(kind) = blocking_kind(code) else {
                continue;
            };

            // Plain fns run outside the runtime
            if enclosing_fn(&lines, idx) != Some(FnKind::Async) {
                continue;
            }

            violations.push(format!(
                "{}:{} - {}: {}",
                file.path.display(),
                idx + 1,
                kind,
                line.trim()
            ));
        }
    }

    violations
}

fn blocking_kind(code: &str) -> Option<&'static str> {
    if code.contains("std::fs::") {
        Some("Blocking file I/O")
    } else if code.contains("std::net::") {
        Some("Blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("Blocking process I/O")
    } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
        Some("Blocking stdin/stdout")
    } else {
        None
    }
}
