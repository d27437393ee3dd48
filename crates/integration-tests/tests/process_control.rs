#![cfg(unix)]
// Process lifecycle of the real subprocess trainer

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use trainq_core::port::time_provider::SystemTimeProvider;
use trainq_core::port::trainer_executor::ExecutionStatus;
use trainq_core::port::TrainerExecutor;
use trainq_infra_system::{SubprocessTrainer, TrainerCommand};

fn sh_trainer(dir: &tempfile::TempDir, script_body: &str) -> SubprocessTrainer {
    let script = dir.path().join("trainer.sh");
    std::fs::write(&script, script_body).unwrap();
    SubprocessTrainer::new(
        TrainerCommand {
            interpreter: PathBuf::from("/bin/sh"),
            script,
            working_dir: None,
        },
        Arc::new(SystemTimeProvider),
    )
}

fn plain_env() -> HashMap<String, String> {
    HashMap::from([("PATH".to_string(), "/usr/bin:/bin".to_string())])
}

fn process_gone(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Orphans get reaped by init asynchronously; allow a short grace
    // window before declaring the process still alive.
    for _ in 0..20 {
        if kill(Pid::from_raw(pid), None).is_err() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    false
}

#[tokio::test]
async fn kill_interrupts_a_blocked_wait_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = Arc::new(sh_trainer(&dir, "sleep 30\n"));

    trainer
        .execute(Path::new("net.toml"), &plain_env())
        .await
        .unwrap();
    assert!(trainer.is_running());
    let pid = trainer.pid().unwrap();

    let killer = trainer.clone();
    let kill_handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        killer.kill().await
    });

    let started = Instant::now();
    let result = trainer.wait().await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Killed);
    // SIGTERM lands well inside the SIGKILL escalation window.
    assert!(started.elapsed() < Duration::from_secs(5));
    kill_handle.await.unwrap().unwrap();

    assert!(!trainer.is_running());
    assert!(process_gone(pid));
}

#[tokio::test]
async fn kill_takes_down_the_whole_process_tree() {
    let dir = tempfile::tempdir().unwrap();
    let grandchild_pid_file = dir.path().join("grandchild.pid");
    // The trainer spawns its own background worker and then blocks on
    // it, mirroring launcher-style training scripts.
    let body = "sleep 30 &\necho $! > \"$PID_FILE\"\nwait\n";
    let trainer = Arc::new(sh_trainer(&dir, body));

    let mut env = plain_env();
    env.insert(
        "PID_FILE".to_string(),
        grandchild_pid_file.to_string_lossy().into_owned(),
    );

    trainer
        .execute(Path::new("net.toml"), &env)
        .await
        .unwrap();

    // Give the script time to fork and record its worker pid.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let grandchild_pid: i32 = std::fs::read_to_string(&grandchild_pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();

    let killer = trainer.clone();
    let kill_handle = tokio::spawn(async move { killer.kill().await });

    let result = trainer.wait().await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Killed);
    kill_handle.await.unwrap().unwrap();

    assert!(process_gone(grandchild_pid));
}

#[tokio::test]
async fn executor_returns_to_idle_after_each_run() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = sh_trainer(&dir, "exit 0\n");

    for _ in 0..2 {
        assert!(!trainer.is_running());
        trainer
            .execute(Path::new("net.toml"), &plain_env())
            .await
            .unwrap();
        let result = trainer.wait().await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
    }

    assert!(trainer.pid().is_none());
}
