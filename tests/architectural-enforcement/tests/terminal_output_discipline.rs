//! Integration Test: Terminal Output Discipline
//!
//! The controller and the pipeline worker share stdout through `Console`,
//! whose lock keeps printed blocks whole. Direct prints in the core would
//! interleave with worker output and break the impersonated shell.

use architectural_enforcement::{assert_clean, find_violations, source_dir, Rule};

const OUTPUT_RULES: &[Rule] = &[
    Rule {
        pattern: "println!",
        reason: "Direct stdout print",
    },
    Rule {
        pattern: "print!(",
        reason: "Direct stdout print",
    },
    Rule {
        pattern: "eprintln!",
        reason: "Direct stderr print (use tracing)",
    },
];

#[test]
fn test_core_prints_only_through_console() {
    let dir = source_dir("honeypot/core");
    assert!(dir.exists(), "missing source directory {}", dir.display());

    let violations = find_violations(&dir, OUTPUT_RULES);
    assert_clean("Direct terminal output found in honeypot-core!", &violations);
}
