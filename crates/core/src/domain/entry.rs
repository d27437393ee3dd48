// Queue Entry Domain Model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One queued training run: the path of its configuration file.
///
/// The queue never inspects the file contents; existence is checked at
/// enqueue time by the application layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry(PathBuf);

impl QueueEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
