// Training Queue - sequential drain over the trainer executor

mod policy;
mod stop;

pub use policy::FailurePolicy;
pub use stop::{stop_channel, StopSender, StopToken};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::domain::{BatchReport, BatchStatus, ConfigQueue, QueueEntry, RunOutcome, RunRecord};
use crate::error::{AppError, Result};
use crate::port::{EnvironmentProvider, ExecutionStatus, TimeProvider, TrainerExecutor};

/// Sequential training queue.
///
/// Holds the pending configuration files and drives them through the
/// trainer executor one process at a time. `add` and `clear` may arrive
/// from another control path while a drain is in progress; the queue
/// lock and the executor's single tracked process are the only shared
/// mutable state.
pub struct TrainingQueue {
    queue: Mutex<ConfigQueue>,
    executor: Arc<dyn TrainerExecutor>,
    environment: Arc<dyn EnvironmentProvider>,
    time_provider: Arc<dyn TimeProvider>,
    failure_policy: FailurePolicy,
    draining: AtomicBool,
}

impl TrainingQueue {
    pub fn new(
        executor: Arc<dyn TrainerExecutor>,
        environment: Arc<dyn EnvironmentProvider>,
        time_provider: Arc<dyn TimeProvider>,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            queue: Mutex::new(ConfigQueue::new()),
            executor,
            environment,
            time_provider,
            failure_policy,
            draining: AtomicBool::new(false),
        }
    }

    /// Append a configuration file to the queue.
    ///
    /// Empty or nonexistent paths are logged and ignored; the call never
    /// fails. Returns the listing for display.
    pub fn add(&self, path: &str) -> String {
        let trimmed = path.trim();
        if trimmed.is_empty() || !Path::new(trimmed).is_file() {
            warn!(config = %path, "Config file not found, not queued");
        } else {
            self.queue
                .lock()
                .unwrap()
                .push_back(QueueEntry::new(trimmed));
            info!(config = %trimmed, "Added config to queue");
        }
        self.listing()
    }

    /// Discard all pending entries. An in-flight run is unaffected.
    pub fn clear(&self) -> String {
        self.queue.lock().unwrap().clear();
        info!("Queue cleared");
        String::new()
    }

    /// Newline-joined listing of the pending configurations.
    pub fn listing(&self) -> String {
        self.queue.lock().unwrap().listing()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }

    /// Drain the queue front-to-back, one training process at a time.
    ///
    /// Blocks on each run until its process has fully terminated and
    /// only then removes the entry. A launch failure aborts the drain
    /// and propagates, leaving the unlaunchable entry queued. A
    /// kill-induced exit (or a raised stop flag) stops the whole queue,
    /// retaining the interrupted entry and everything behind it.
    pub async fn run(&self, stop: &StopToken) -> Result<BatchReport> {
        if self.draining.swap(true, Ordering::SeqCst) {
            return Err(AppError::InvalidState(
                "queue drain already in progress".to_string(),
            ));
        }
        let result = self.drain(stop).await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain(&self, stop: &StopToken) -> Result<BatchReport> {
        let mut report = BatchReport::new(self.time_provider.now_rfc3339());
        let env = self.environment.training_env();

        loop {
            if stop.is_stopped() {
                info!("Stop requested, queue drain interrupted");
                report.status = BatchStatus::Interrupted;
                break;
            }

            let Some(entry) = self.queue.lock().unwrap().front().cloned() else {
                break;
            };

            info!(config = %entry, pending = self.len(), "Starting training run");

            if let Err(e) = self.executor.execute(entry.path(), &env).await {
                error!(config = %entry, error = %e, "Trainer could not be launched");
                return Err(e.into());
            }

            let result = self.executor.wait().await?;

            match result.status {
                ExecutionStatus::Killed => {
                    warn!(config = %entry, "Training run was killed, stopping queue");
                    report.push(RunRecord {
                        config: entry.path().to_path_buf(),
                        outcome: RunOutcome::Interrupted,
                        exit_code: result.exit_code,
                        duration_ms: result.duration_ms,
                    });
                    report.status = BatchStatus::Interrupted;
                    break;
                }
                ExecutionStatus::Success => {
                    self.queue.lock().unwrap().pop_front_if(&entry);
                    info!(
                        config = %entry,
                        duration_ms = %result.duration_ms,
                        "Training run completed"
                    );
                    report.push(RunRecord {
                        config: entry.path().to_path_buf(),
                        outcome: RunOutcome::Succeeded,
                        exit_code: result.exit_code,
                        duration_ms: result.duration_ms,
                    });
                }
                ExecutionStatus::Failed => {
                    self.queue.lock().unwrap().pop_front_if(&entry);
                    warn!(
                        config = %entry,
                        exit_code = ?result.exit_code,
                        "Training run failed"
                    );
                    report.push(RunRecord {
                        config: entry.path().to_path_buf(),
                        outcome: RunOutcome::Failed,
                        exit_code: result.exit_code,
                        duration_ms: result.duration_ms,
                    });
                    if self.failure_policy == FailurePolicy::Halt {
                        warn!("Failure policy is halt, stopping queue");
                        report.status = BatchStatus::Halted;
                        break;
                    }
                }
            }
        }

        if report.status == BatchStatus::Completed {
            info!(runs = report.records.len(), "Queue finished");
        }
        Ok(report)
    }
}
