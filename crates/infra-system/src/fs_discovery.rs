// Filesystem config discovery adapter

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use trainq_core::error::Result;
use trainq_core::port::ConfigDiscovery;

/// Recursively lists configuration files by extension.
///
/// Extension matching is case-insensitive; results are sorted so
/// listings are stable across platforms and refreshes.
pub struct FsConfigDiscovery {
    extensions: Vec<String>,
}

impl FsConfigDiscovery {
    pub fn new(extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().to_lowercase())
                .collect(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_lowercase();
                self.extensions.iter().any(|want| *want == ext)
            })
            .unwrap_or(false)
    }

    fn walk(&self, dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for dir_entry in fs::read_dir(dir)? {
            let path = dir_entry?.path();
            if path.is_dir() {
                self.walk(&path, found)?;
            } else if self.matches(&path) {
                found.push(path);
            }
        }
        Ok(())
    }
}

impl Default for FsConfigDiscovery {
    /// Trainer configurations are TOML files by convention.
    fn default() -> Self {
        Self::new(["toml"])
    }
}

impl ConfigDiscovery for FsConfigDiscovery {
    fn list_configs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        self.walk(dir, &mut found)?;
        found.sort();
        debug!(dir = %dir.display(), count = found.len(), "Config discovery completed");
        Ok(found)
    }
}
