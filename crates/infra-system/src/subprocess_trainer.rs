// Subprocess trainer adapter
// reason: tokio for async process management, nix for signal delivery

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};

use trainq_core::port::trainer_executor::{
    ExecutionError, ExecutionResult, ExecutionStatus, TrainerExecutor,
};
use trainq_core::port::TimeProvider;

/// Flag pair used to hand the configuration file to the trainer script.
const CONFIG_FILE_FLAG: &str = "--config_file";

/// How long a killed process gets to exit after SIGTERM before SIGKILL.
const GRACEFUL_KILL_TIMEOUT_MS: i64 = 5000;

/// Poll interval while waiting for a signalled process to disappear.
const KILL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the external trainer is invoked.
///
/// Supplied at construction; there are no process-wide defaults.
#[derive(Debug, Clone)]
pub struct TrainerCommand {
    /// Interpreter or executable, e.g. a `python` binary.
    pub interpreter: PathBuf,
    /// Trainer entry-point script, passed as the first argument.
    pub script: PathBuf,
    /// Working directory for the trainer, if different from ours.
    pub working_dir: Option<PathBuf>,
}

/// Trainer executor that shells out to the configured training script.
///
/// Tracks at most one child process. The child is spawned as its own
/// process-group leader so `kill` can take the whole tree down, and its
/// stdio is inherited so training output streams live. `kill` and
/// `is_running` work off the recorded pid and never contend with the
/// lock held across `wait`.
pub struct SubprocessTrainer {
    command: TrainerCommand,
    time_provider: Arc<dyn TimeProvider>,
    child: Mutex<Option<Child>>,
    pid: AtomicI32,
    started_at_ms: AtomicI64,
    kill_requested: AtomicBool,
}

impl SubprocessTrainer {
    pub fn new(command: TrainerCommand, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            command,
            time_provider,
            child: Mutex::new(None),
            pid: AtomicI32::new(0),
            started_at_ms: AtomicI64::new(0),
            kill_requested: AtomicBool::new(false),
        }
    }

    /// Process id of the tracked training run, if one is in flight.
    pub fn pid(&self) -> Option<i32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// SIGTERM the process group, poll for exit, escalate to SIGKILL.
    #[cfg(unix)]
    async fn kill_tree(&self, pid: i32) -> Result<(), ExecutionError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, killpg, Signal};
        use nix::unistd::Pid;

        let pgrp = Pid::from_raw(pid);

        info!(pid = %pid, "Sending SIGTERM to training process group");
        match killpg(pgrp, Signal::SIGTERM) {
            Ok(()) => {}
            // The group is already gone; nothing left to terminate.
            Err(Errno::ESRCH) => return Ok(()),
            Err(e) => return Err(ExecutionError::Kill(format!("SIGTERM failed: {}", e))),
        }

        let deadline = self.time_provider.now_millis() + GRACEFUL_KILL_TIMEOUT_MS;
        loop {
            tokio::time::sleep(KILL_POLL_INTERVAL).await;

            // Signal 0 probes for existence without delivering anything.
            if kill(Pid::from_raw(pid), None).is_err() {
                info!(pid = %pid, "Training process exited after SIGTERM");
                return Ok(());
            }

            if self.time_provider.now_millis() > deadline {
                warn!(pid = %pid, "Training process survived SIGTERM, sending SIGKILL");
                return match killpg(pgrp, Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => Ok(()),
                    Err(e) => Err(ExecutionError::Kill(format!("SIGKILL failed: {}", e))),
                };
            }
        }
    }

    #[cfg(windows)]
    async fn kill_tree(&self, pid: i32) -> Result<(), ExecutionError> {
        // taskkill /T takes the whole child tree down with the root.
        let output = Command::new("taskkill")
            .args(["/T", "/F", "/PID", &pid.to_string()])
            .output()
            .await
            .map_err(|e| ExecutionError::Kill(e.to_string()))?;

        if !output.status.success() {
            return Err(ExecutionError::Kill(format!(
                "taskkill failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TrainerExecutor for SubprocessTrainer {
    async fn execute(
        &self,
        config: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), ExecutionError> {
        let mut slot = self.child.lock().await;
        if slot.is_some() {
            return Err(ExecutionError::AlreadyRunning);
        }

        let mut cmd = Command::new(&self.command.interpreter);
        cmd.arg(&self.command.script)
            .arg(CONFIG_FILE_FLAG)
            .arg(config)
            .env_clear()
            .envs(env)
            .kill_on_drop(true);

        if let Some(dir) = &self.command.working_dir {
            cmd.current_dir(dir);
        }

        // Own process group so kill() can signal the whole tree.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|e| ExecutionError::Launch(e.to_string()))?;

        let pid = child.id().map(|id| id as i32).unwrap_or(0);

        info!(
            interpreter = %self.command.interpreter.display(),
            script = %self.command.script.display(),
            config = %config.display(),
            pid = %pid,
            "Training process started"
        );

        self.kill_requested.store(false, Ordering::SeqCst);
        self.started_at_ms
            .store(self.time_provider.now_millis(), Ordering::SeqCst);
        self.pid.store(pid, Ordering::SeqCst);
        *slot = Some(child);

        Ok(())
    }

    async fn wait(&self) -> Result<ExecutionResult, ExecutionError> {
        // Take the child out of the slot so kill(), which works off the
        // pid, stays lock-free while we block here.
        let mut child = self
            .child
            .lock()
            .await
            .take()
            .ok_or(ExecutionError::NotRunning)?;

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutionError::Io(e.to_string()))?;

        let duration_ms =
            self.time_provider.now_millis() - self.started_at_ms.load(Ordering::SeqCst);
        self.pid.store(0, Ordering::SeqCst);

        let killed = self.kill_requested.swap(false, Ordering::SeqCst);
        let exit_code = status.code();
        // A missing exit code means the process died to a signal.
        let exec_status = if killed || exit_code.is_none() {
            ExecutionStatus::Killed
        } else if status.success() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        info!(
            exit_code = ?exit_code,
            duration_ms = %duration_ms,
            status = ?exec_status,
            "Training process exited"
        );

        Ok(ExecutionResult {
            status: exec_status,
            exit_code,
            duration_ms,
        })
    }

    async fn kill(&self) -> Result<(), ExecutionError> {
        let Some(pid) = self.pid() else {
            // Nothing running; stopping an idle executor is a no-op.
            return Ok(());
        };
        self.kill_requested.store(true, Ordering::SeqCst);
        self.kill_tree(pid).await
    }

    fn is_running(&self) -> bool {
        let Some(pid) = self.pid() else {
            return false;
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::kill;
            use nix::unistd::Pid;

            kill(Pid::from_raw(pid), None).is_ok()
        }

        #[cfg(windows)]
        {
            let output = std::process::Command::new("tasklist")
                .args(["/FI", &format!("PID eq {}", pid), "/NH"])
                .output();

            match output {
                Ok(output) => {
                    String::from_utf8_lossy(&output.stdout).contains(&pid.to_string())
                }
                Err(_) => false,
            }
        }
    }
}
