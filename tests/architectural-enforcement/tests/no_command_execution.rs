//! Integration Test: No Command Execution
//!
//! The honeypot fabricates every shell response. Operator input must never
//! reach a process, a shell, or a blocking HTTP call.

use architectural_enforcement::{assert_clean, find_violations, source_dir, Rule};

const EXECUTION_RULES: &[Rule] = &[
    Rule {
        pattern: "std::process::Command",
        reason: "Process spawn",
    },
    Rule {
        pattern: "tokio::process",
        reason: "Process spawn",
    },
    Rule {
        pattern: "Command::new",
        reason: "Process spawn",
    },
    Rule {
        pattern: "libc::system",
        reason: "Shell call",
    },
    Rule {
        pattern: "libc::exec",
        reason: "Process exec",
    },
    Rule {
        pattern: "reqwest::blocking",
        reason: "Blocking HTTP client",
    },
];

#[test]
fn test_core_never_executes_input() {
    let dir = source_dir("honeypot/core");
    assert!(dir.exists(), "missing source directory {}", dir.display());

    let violations = find_violations(&dir, EXECUTION_RULES);
    assert_clean("Command execution found in honeypot-core!", &violations);
}

#[test]
fn test_console_never_executes_input() {
    let dir = source_dir("honeypot/console");
    assert!(dir.exists(), "missing source directory {}", dir.display());

    let violations = find_violations(&dir, EXECUTION_RULES);
    assert_clean("Command execution found in honeypot-console!", &violations);
}
