// Trainer Executor Port
// Abstraction for running exactly one external training process at a time

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Result of a finished training run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: i64,
}

/// How a training process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
    Killed,
}

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Launch failed: {0}")]
    Launch(String),

    #[error("A training process is already running")]
    AlreadyRunning,

    #[error("No training process is being tracked")]
    NotRunning,

    #[error("Kill failed: {0}")]
    Kill(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Trainer Executor trait
///
/// Tracks at most one child process: Idle -> Running on `execute`,
/// Running -> Idle when `wait` returns, whether the exit was natural or
/// kill-induced. Concurrent launches are rejected, never queued.
///
/// Implementations:
/// - SubprocessTrainer: shells out to the trainer script (infra-system)
/// - mocks::MockTrainerExecutor: scripted outcomes for tests
#[async_trait]
pub trait TrainerExecutor: Send + Sync {
    /// Launch a training run for the given configuration file with the
    /// given environment variables, forwarded verbatim.
    ///
    /// # Errors
    /// - ExecutionError::Launch if the process cannot be started
    /// - ExecutionError::AlreadyRunning if a process is already tracked
    async fn execute(
        &self,
        config: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), ExecutionError>;

    /// Block until the tracked process terminates, naturally or via
    /// `kill`, and report how it ended. Safe to call exactly once per
    /// launch.
    ///
    /// # Errors
    /// - ExecutionError::NotRunning if nothing was launched
    async fn wait(&self) -> Result<ExecutionResult, ExecutionError>;

    /// Forcibly terminate the tracked process tree. No-op when idle.
    async fn kill(&self) -> Result<(), ExecutionError>;

    /// Non-blocking status query.
    fn is_running(&self) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Scripted outcome for one `execute`/`wait` pair
    #[derive(Debug, Clone)]
    pub enum MockRun {
        /// Exit 0
        Succeed,
        /// Non-zero exit with the given code
        Fail(i32),
        /// Refuse to launch
        RefuseLaunch(String),
        /// Report a kill-induced exit
        Killed,
    }

    /// Mock Trainer Executor for queue tests
    ///
    /// Outcomes are consumed in script order; once the script runs out,
    /// every further run succeeds. Launched configs are recorded so
    /// tests can assert FIFO ordering.
    pub struct MockTrainerExecutor {
        script: Mutex<VecDeque<MockRun>>,
        launched: Mutex<Vec<PathBuf>>,
        in_flight: Mutex<Option<MockRun>>,
    }

    impl MockTrainerExecutor {
        pub fn new(script: Vec<MockRun>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                launched: Mutex::new(Vec::new()),
                in_flight: Mutex::new(None),
            }
        }

        pub fn always_succeeding() -> Self {
            Self::new(Vec::new())
        }

        /// Configs handed to `execute`, in launch order.
        pub fn launched(&self) -> Vec<PathBuf> {
            self.launched.lock().unwrap().clone()
        }

        pub fn launch_count(&self) -> usize {
            self.launched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TrainerExecutor for MockTrainerExecutor {
        async fn execute(
            &self,
            config: &Path,
            _env: &HashMap<String, String>,
        ) -> Result<(), ExecutionError> {
            let mut in_flight = self.in_flight.lock().unwrap();
            if in_flight.is_some() {
                return Err(ExecutionError::AlreadyRunning);
            }

            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(MockRun::Succeed);

            if let MockRun::RefuseLaunch(msg) = &next {
                return Err(ExecutionError::Launch(msg.clone()));
            }

            self.launched.lock().unwrap().push(config.to_path_buf());
            *in_flight = Some(next);
            Ok(())
        }

        async fn wait(&self) -> Result<ExecutionResult, ExecutionError> {
            let run = self
                .in_flight
                .lock()
                .unwrap()
                .take()
                .ok_or(ExecutionError::NotRunning)?;

            Ok(match run {
                MockRun::Succeed => ExecutionResult {
                    status: ExecutionStatus::Success,
                    exit_code: Some(0),
                    duration_ms: 10,
                },
                MockRun::Fail(code) => ExecutionResult {
                    status: ExecutionStatus::Failed,
                    exit_code: Some(code),
                    duration_ms: 10,
                },
                MockRun::Killed => ExecutionResult {
                    status: ExecutionStatus::Killed,
                    exit_code: None,
                    duration_ms: 10,
                },
                MockRun::RefuseLaunch(msg) => return Err(ExecutionError::Launch(msg)),
            })
        }

        async fn kill(&self) -> Result<(), ExecutionError> {
            let mut in_flight = self.in_flight.lock().unwrap();
            if in_flight.is_some() {
                *in_flight = Some(MockRun::Killed);
            }
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.in_flight.lock().unwrap().is_some()
        }
    }
}
