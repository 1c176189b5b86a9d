//! Architectural Enforcement
//!
//! Source scanners backing the integration tests in `tests/`:
//! - operator input is never executed (no process spawning)
//! - the impersonated terminal is only written through `Console`
//! - HTTP stays async
//!
//! Scanning stops at the first `#[cfg(test)]` line of a file; test modules
//! sit at the bottom of every source file in this workspace.

use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden pattern and the reason it is forbidden
pub struct Rule {
    /// Substring searched for in code (comments stripped)
    pub pattern: &'static str,
    /// Shown next to each violation
    pub reason: &'static str,
}

/// Workspace root, resolved from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Production source directory of a workspace member, e.g. `honeypot/core`
#[must_use]
pub fn source_dir(member: &str) -> PathBuf {
    workspace_root().join(member).join("src")
}

/// Scan every `.rs` file under `dir` for `rules`
///
/// Returns one `path:line - reason: code` entry per hit.
#[must_use]
pub fn find_violations(dir: &Path, rules: &[Rule]) -> Vec<String> {
    let mut violations = Vec::new();

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            check_file(entry.path(), rules, &mut violations);
        }
    }

    violations
}

fn check_file(path: &Path, rules: &[Rule], violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    for (idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }

        let code = line.split("//").next().unwrap_or(line);
        for rule in rules {
            if code.contains(rule.pattern) {
                violations.push(format!(
                    "{}:{} - {}: {}",
                    path.display(),
                    idx + 1,
                    rule.reason,
                    line.trim()
                ));
            }
        }
    }
}

/// Print violations and panic if there are any
pub fn assert_clean(title: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\nFound {} violation(s). Fix these before merging!", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_skips_comments_and_test_modules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("sample.rs"),
            "// std::process::Command in a comment\n\
             let c = std::process::Command::new(\"sh\");\n\
             #[cfg(test)]\n\
             mod tests { fn t() { std::process::Command::new(\"sh\"); } }\n",
        )
        .unwrap();

        let rules = [Rule {
            pattern: "std::process::Command",
            reason: "Process spawn",
        }];
        let violations = find_violations(dir.path(), &rules);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].ends_with(":2 - Process spawn: let c = std::process::Command::new(\"sh\");"));
    }

    #[test]
    fn test_scanner_ignores_non_rust_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.md"), "println!(\"hi\")\n").unwrap();

        let rules = [Rule {
            pattern: "println!",
            reason: "Direct stdout print",
        }];
        assert!(find_violations(dir.path(), &rules).is_empty());
    }
}
