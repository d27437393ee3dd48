//! Trainq - queue training configs and run them sequentially
//!
//! Composition root: CLI parsing, logging setup, dependency wiring and
//! Ctrl-C cancellation around the queue core.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trainq_core::application::{stop_channel, FailurePolicy, TrainingQueue};
use trainq_core::domain::{BatchReport, BatchStatus, RunOutcome};
use trainq_core::port::time_provider::SystemTimeProvider;
use trainq_core::port::{ConfigDiscovery, ProcessEnvironment, TrainerExecutor};
use trainq_infra_system::{FsConfigDiscovery, SubprocessTrainer, TrainerCommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "trainq")]
#[command(about = "Queue training configs and run them sequentially", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue the given configs and drain the queue
    Run {
        /// Training configuration files, queued in order
        configs: Vec<PathBuf>,

        /// Also queue every config discovered under this directory
        #[arg(long)]
        preset_dir: Option<PathBuf>,

        /// Interpreter used to run the trainer script
        #[arg(long, env = "TRAINQ_INTERPRETER", default_value = "python")]
        interpreter: PathBuf,

        /// Trainer entry-point script
        #[arg(long, env = "TRAINQ_TRAINER_SCRIPT")]
        script: PathBuf,

        /// Working directory for the trainer
        #[arg(long)]
        working_dir: Option<PathBuf>,

        /// What to do when a run exits non-zero
        #[arg(long, default_value_t = FailurePolicy::Continue)]
        on_failure: FailurePolicy,

        /// Report format
        #[arg(long, value_enum, default_value = "table")]
        format: ReportFormat,
    },

    /// List the configs discovered under a directory
    List {
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            configs,
            preset_dir,
            interpreter,
            script,
            working_dir,
            on_failure,
            format,
        } => {
            run_queue(
                configs,
                preset_dir,
                TrainerCommand {
                    interpreter,
                    script,
                    working_dir,
                },
                on_failure,
                format,
            )
            .await
        }
        Commands::List { dir } => list_configs(&dir),
    }
}

fn init_logging() {
    let log_format = std::env::var("TRAINQ_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("trainq=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

async fn run_queue(
    configs: Vec<PathBuf>,
    preset_dir: Option<PathBuf>,
    trainer_command: TrainerCommand,
    on_failure: FailurePolicy,
    format: ReportFormat,
) -> Result<()> {
    info!("Trainq v{} starting", VERSION);

    // Dependency wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let executor = Arc::new(SubprocessTrainer::new(trainer_command, time_provider.clone()));
    let queue = Arc::new(TrainingQueue::new(
        executor.clone(),
        Arc::new(ProcessEnvironment),
        time_provider,
        on_failure,
    ));

    let mut candidates = configs;
    if let Some(dir) = preset_dir {
        let discovery = FsConfigDiscovery::default();
        let found = discovery
            .list_configs(&dir)
            .with_context(|| format!("listing configs under {}", dir.display()))?;
        if found.is_empty() {
            println!(
                "{}",
                format!("No configs found under {}", dir.display()).yellow()
            );
        }
        candidates.extend(found);
    }

    for config in &candidates {
        queue.add(&config.to_string_lossy());
    }

    if queue.is_empty() {
        bail!("nothing to run: no valid configs were queued");
    }

    println!("{}", "Queue".cyan().bold());
    println!("{}", queue.listing());
    println!();

    // Ctrl-C kills the current training run and stops the whole queue.
    let (stop_tx, stop_rx) = stop_channel();
    {
        let executor = executor.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping queue");
                stop_tx.stop();
                if let Err(e) = executor.kill().await {
                    tracing::error!(error = %e, "Failed to kill training process");
                }
            }
        });
    }

    let report = queue.run(&stop_rx).await.context("queue drain failed")?;
    render_report(&report, format)?;

    match report.status {
        BatchStatus::Completed if report.all_succeeded() => Ok(()),
        BatchStatus::Completed => bail!("{} training run(s) failed", report.failed_count()),
        BatchStatus::Halted => bail!("queue halted after a failed training run"),
        BatchStatus::Interrupted => bail!("queue interrupted"),
    }
}

fn list_configs(dir: &Path) -> Result<()> {
    let discovery = FsConfigDiscovery::default();
    let configs = discovery
        .list_configs(dir)
        .with_context(|| format!("listing configs under {}", dir.display()))?;

    if configs.is_empty() {
        println!(
            "{}",
            format!("No configs found under {}", dir.display()).yellow()
        );
        return Ok(());
    }

    println!("{}", format!("Configs under {}", dir.display()).cyan().bold());
    for config in configs {
        println!("  {}", config.display());
    }
    Ok(())
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "config")]
    config: String,
    #[tabled(rename = "outcome")]
    outcome: String,
    #[tabled(rename = "exit code")]
    exit_code: String,
    #[tabled(rename = "duration")]
    duration: String,
}

fn render_report(report: &BatchReport, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        ReportFormat::Table => {
            if report.records.is_empty() {
                println!("{}", "No training runs were started".yellow());
            } else {
                let rows: Vec<RunRow> = report
                    .records
                    .iter()
                    .map(|r| RunRow {
                        config: r.config.display().to_string(),
                        outcome: match r.outcome {
                            RunOutcome::Succeeded => "succeeded".green().to_string(),
                            RunOutcome::Failed => "failed".red().to_string(),
                            RunOutcome::Interrupted => "interrupted".yellow().to_string(),
                        },
                        exit_code: r
                            .exit_code
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        duration: format_duration(r.duration_ms),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }

            match report.status {
                BatchStatus::Completed => {
                    println!();
                    println!("{}", "✓ Queue finished".green().bold());
                }
                BatchStatus::Halted => {
                    println!();
                    println!("{}", "✗ Queue halted on failure".red().bold());
                }
                BatchStatus::Interrupted => {
                    println!();
                    println!("{}", "■ Queue interrupted".yellow().bold());
                }
            }
        }
    }
    Ok(())
}

fn format_duration(ms: i64) -> String {
    if ms >= 60_000 {
        format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000)
    } else if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}
