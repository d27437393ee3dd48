// Queue drain behaviour across the public crate API

use std::collections::HashMap;
use std::sync::Arc;

use trainq_core::application::{stop_channel, FailurePolicy, TrainingQueue};
use trainq_core::domain::{BatchStatus, RunOutcome};
use trainq_core::port::time_provider::SystemTimeProvider;
use trainq_core::port::trainer_executor::mocks::{MockRun, MockTrainerExecutor};
use trainq_core::port::EnvironmentProvider;

struct EmptyEnvironment;

impl EnvironmentProvider for EmptyEnvironment {
    fn training_env(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

fn queue_with(executor: Arc<MockTrainerExecutor>, policy: FailurePolicy) -> TrainingQueue {
    TrainingQueue::new(
        executor,
        Arc::new(EmptyEnvironment),
        Arc::new(SystemTimeProvider),
        policy,
    )
}

fn temp_configs(dir: &tempfile::TempDir, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, "seed = 1\n").unwrap();
            path.to_string_lossy().into_owned()
        })
        .collect()
}

#[tokio::test]
async fn queue_can_be_refilled_and_drained_again() {
    let dir = tempfile::tempdir().unwrap();
    let configs = temp_configs(&dir, &["a.toml", "b.toml", "c.toml"]);
    let executor = Arc::new(MockTrainerExecutor::always_succeeding());
    let queue = queue_with(executor.clone(), FailurePolicy::Continue);
    let (_stop_tx, stop_rx) = stop_channel();

    queue.add(&configs[0]);
    let first = queue.run(&stop_rx).await.unwrap();
    assert_eq!(first.status, BatchStatus::Completed);
    assert!(queue.is_empty());

    queue.add(&configs[1]);
    queue.add(&configs[2]);
    let second = queue.run(&stop_rx).await.unwrap();

    assert_eq!(second.status, BatchStatus::Completed);
    assert_eq!(second.records.len(), 2);
    assert_eq!(executor.launch_count(), 3);
    assert_eq!(
        executor
            .launched()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>(),
        configs
    );
}

#[tokio::test]
async fn interrupted_drain_resumes_from_the_killed_entry() {
    let dir = tempfile::tempdir().unwrap();
    let configs = temp_configs(&dir, &["a.toml", "b.toml"]);
    // First launch is killed; everything after the script succeeds.
    let executor = Arc::new(MockTrainerExecutor::new(vec![MockRun::Killed]));
    let queue = queue_with(executor.clone(), FailurePolicy::Continue);
    for config in &configs {
        queue.add(config);
    }
    let (_stop_tx, stop_rx) = stop_channel();

    let first = queue.run(&stop_rx).await.unwrap();
    assert_eq!(first.status, BatchStatus::Interrupted);
    assert_eq!(first.records[0].outcome, RunOutcome::Interrupted);
    // The killed entry stays at the front, so the batch can be re-run.
    assert_eq!(queue.len(), 2);

    let second = queue.run(&stop_rx).await.unwrap();
    assert_eq!(second.status, BatchStatus::Completed);
    assert_eq!(second.records.len(), 2);
    assert!(queue.is_empty());

    let launched: Vec<String> = executor
        .launched()
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        launched,
        vec![configs[0].clone(), configs[0].clone(), configs[1].clone()]
    );
}

#[tokio::test]
async fn halted_drain_retains_the_unattempted_tail() {
    let dir = tempfile::tempdir().unwrap();
    let configs = temp_configs(&dir, &["a.toml", "b.toml", "c.toml"]);
    let executor = Arc::new(MockTrainerExecutor::new(vec![
        MockRun::Succeed,
        MockRun::Fail(1),
    ]));
    let queue = queue_with(executor.clone(), FailurePolicy::Halt);
    for config in &configs {
        queue.add(config);
    }
    let (_stop_tx, stop_rx) = stop_channel();

    let report = queue.run(&stop_rx).await.unwrap();

    assert_eq!(report.status, BatchStatus::Halted);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[1].outcome, RunOutcome::Failed);
    assert_eq!(queue.listing(), configs[2]);
}
