//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep. Waiting happens on I/O, on
//! cancellation, or on a deadline (`sleep_until` on a computed instant).
//! **Exceptions**: pacing of recorded transcripts in the replay backend.

use std::path::Path;

use architectural_enforcement::{code_part, production_sources};

/// Files allowed to pace output with a fixed delay
const PACING_ALLOWED: &[&str] = &["studio/core/src/backend/replay.rs"];

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - tokio::time::sleep_until(deadline) for scheduled work");
        eprintln!("  - tokio::time::timeout() around I/O");
        eprintln!("  - Transcript pacing in the replay backend");
        eprintln!("  - Test code (#[cfg(test)] modules)");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - std::thread::sleep anywhere");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        let pacing_allowed = PACING_ALLOWED.iter().any(|p| file.path == Path::new(p));

        for (idx, line) in file.production_lines().iter().enumerate() {
            let code = code_part(line);

            let thread_sleep = code.contains("thread::sleep");
            let any_sleep = code.contains("::sleep(") || code.contains(".sleep(");

            if thread_sleep || (any_sleep && !pacing_allowed) {
                violations.push(format!(
                    "{}:{} - {}",
                    file.path.display(),
                    idx + 1,
                    line.trim()
                ));
            }
        }
    }

    violations
}
