// Environment Provider Port

use std::collections::HashMap;

/// Source of the environment variables handed to the trainer.
///
/// The executor forwards the returned map verbatim; nothing is added or
/// filtered downstream of this port.
pub trait EnvironmentProvider: Send + Sync {
    fn training_env(&self) -> HashMap<String, String>;
}

/// Forwards the current process environment (production)
pub struct ProcessEnvironment;

impl EnvironmentProvider for ProcessEnvironment {
    fn training_env(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }
}
