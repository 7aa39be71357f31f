//! # Update Credentials Available Date
//!
//! Enqueues a single `backfill_date_for_all_course_runs` task, which sends
//! certificate date updates for every course run to the credentials service.
//!
//! ```text
//! $ update-credentials-available-date --config config/credentials-dispatch.toml
//! ```
//!
//! The task must reach a queue that outlives this process, so the in-memory
//! backend is refused. Logs go to stderr; stdout carries only the result.

use anyhow::{bail, Context};
use clap::Parser;
use credentials_dispatch::commands::enqueue_backfill;
use credentials_dispatch::config::ConfigManager;
use credentials_dispatch::logging::{init_structured_logging, log_error};
use credentials_dispatch::messaging::submitter_from_config;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "update-credentials-available-date")]
#[command(about = "Enqueue a backfill of certificate available dates for all course runs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (default: config/credentials-dispatch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines regardless of configuration
    #[arg(long)]
    json_logs: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // No-op when run got far enough to install the configured subscriber
            init_structured_logging(cli.json_logs);
            log_error(
                "update_credentials_available_date",
                "enqueue_backfill",
                &format!("{err:#}"),
                None,
            );
            eprintln!("❌ {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let manager =
        ConfigManager::load_from_path(cli.config.as_deref()).context("loading configuration")?;
    init_structured_logging(cli.json_logs || manager.config().logging.json);

    let queue = &manager.config().queue;
    if !queue.backend.is_durable() {
        bail!(
            "queue backend {:?} does not outlive this command; configure the spool backend",
            queue.backend
        );
    }

    let submitter =
        submitter_from_config(queue).context("building work submitter")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let item = runtime
        .block_on(enqueue_backfill(submitter.as_ref()))
        .context("enqueuing backfill task")?;

    println!("✅ Enqueued {} ({})", item.task_name, item.idempotency_key);
    Ok(())
}
