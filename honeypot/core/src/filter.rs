//! Command Filter
//!
//! Safety gate applied to every input line before it can reach the
//! completion provider. It blocks anything that looks like a file-transfer
//! probe (`scp`/`sftp` and the `-t`/`-f` sink/source flags they use).
//!
//! # Design Philosophy
//!
//! The filter is a coarse substring match, not a shell parser. Any line that
//! merely contains `-t` or `-f` is blocked too; those false positives are
//! accepted. Classification is pure: no state, no I/O.

use serde::{Deserialize, Serialize};

/// Substrings that mark an input as a file-transfer attempt (lowercase)
pub const BLOCKED_PATTERNS: [&str; 4] = ["scp", "sftp", "-t", "-f"];

/// Reason recorded in the event log for blocked inputs
pub const BLOCK_REASON: &str = "SCP/SFTP";

/// Reply printed to the terminal instead of a generated response
pub const REJECTION_MESSAGE: &str = "operation not allowed";

/// Result of classifying one input line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Input may be forwarded to the completion provider
    Allowed,
    /// Input matched a blocked pattern
    Blocked,
}

impl Classification {
    /// Check if the input was blocked
    #[must_use]
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

/// Classify a raw input line.
///
/// Case-insensitive; the input is trimmed before matching.
#[must_use]
pub fn classify(input: &str) -> Classification {
    let normalized = input.trim().to_lowercase();
    if BLOCKED_PATTERNS
        .iter()
        .any(|pattern| normalized.contains(pattern))
    {
        Classification::Blocked
    } else {
        Classification::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_transfer_commands_blocked() {
        let blocked = [
            "scp file.txt user@host:/tmp",
            "sftp user@host",
            "scp -t /tmp",
            "scp -f /etc/passwd",
            "SCP secrets.tar root@10.0.0.1:",
            "  SfTp admin@omegablack  ",
        ];
        for input in blocked {
            assert_eq!(classify(input), Classification::Blocked, "{input}");
        }
    }

    #[test]
    fn test_flag_substrings_over_block() {
        // Substring match, not flag-aware
        assert!(classify("tail -f /var/log/syslog").is_blocked());
        assert!(classify("ls -T").is_blocked());
        assert!(classify("rm -f /tmp/x").is_blocked());
        assert!(classify("git-team").is_blocked());
    }

    #[test]
    fn test_ordinary_commands_allowed() {
        let allowed = ["ls -la", "whoami", "cat /etc/hostname", "ps aux", "uname -a", "cd /root"];
        for input in allowed {
            assert_eq!(classify(input), Classification::Allowed, "{input}");
        }
    }

    #[test]
    fn test_classification_is_pure() {
        for input in ["ls -la", "scp a b", "", "   ", "echo -F"] {
            assert_eq!(classify(input), classify(input));
        }
    }

    #[test]
    fn test_empty_input_allowed() {
        assert_eq!(classify(""), Classification::Allowed);
        assert_eq!(classify("   "), Classification::Allowed);
    }
}
