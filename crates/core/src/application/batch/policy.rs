// Failure policy for non-zero trainer exits

use std::str::FromStr;

/// What the drain loop does when a training run exits non-zero.
///
/// - `Continue`: record the failure and keep draining (default; a
///   persistently failing config never blocks the rest of the batch).
/// - `Halt`: stop after the failing entry, retaining the remainder of
///   the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    #[default]
    Continue,
    Halt,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "halt" => Ok(FailurePolicy::Halt),
            other => Err(format!(
                "invalid failure policy: {other} (expected \"continue\" or \"halt\")"
            )),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::Halt => write!(f, "halt"),
        }
    }
}
