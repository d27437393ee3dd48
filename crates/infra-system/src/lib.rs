// Trainq Infrastructure - System Adapters
// Implements: TrainerExecutor, ConfigDiscovery

pub mod fs_discovery;
pub mod subprocess_trainer;

pub use fs_discovery::FsConfigDiscovery;
pub use subprocess_trainer::{SubprocessTrainer, TrainerCommand};
