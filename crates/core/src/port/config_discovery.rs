// Config Discovery Port

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Lists the training configuration files found under a directory.
///
/// Used by the front-end to offer and bulk-enqueue presets; the queue
/// core itself never calls it.
pub trait ConfigDiscovery: Send + Sync {
    fn list_configs(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}
