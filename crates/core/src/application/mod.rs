// Application Layer - Queue drive and stop control

pub mod batch;

// Re-exports
pub use batch::{stop_channel, FailurePolicy, StopSender, StopToken, TrainingQueue};
