//! SQL Restore Orchestrator
//!
//! Restores a tree of SQL dumps into MySQL with a bounded worker pool, then
//! applies the project's modification scripts one by one in priority order.

// restoretool/src/main.rs
mod cli;
mod config;
mod errors;
mod executor;
mod modify;
mod pipeline;
mod restore;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use cli::Cli;
use config::{AppConfig, load_credentials_from_env};
use modify::ModifyOutcome;
use pipeline::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE, RunSummary};

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };

    // A missing .env file is fine; the variables may come from the real environment.
    dotenv::dotenv().ok();

    let app_config = match load_app_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let _log_guard = match init_logging(&app_config.log_file, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!("Project Folder: {}", cli.folder.display());
    println!(
        "🔄 Restoring {} with {} workers (log: {})",
        app_config.restore_path.display(),
        app_config.max_concurrent_restores,
        app_config.log_file.display()
    );
    tracing::info!("Starting restore run with configuration: {:?}", app_config);

    match pipeline::run_pipeline_flow(&app_config).await {
        Ok(summary) => {
            tracing::info!("Run finished in phase {}", summary.final_phase);
            print_summary(&summary);
            ExitCode::from(summary.exit_code())
        }
        Err(e) => {
            tracing::error!("Run aborted: {}", e);
            eprintln!("❌ Error: {}", e);
            if let Some(output) = e.output().filter(|o| !o.trim().is_empty()) {
                eprintln!("{}", output);
            }
            ExitCode::from(pipeline::exit_code_for_error(&e))
        }
    }
}

fn load_app_config(cli: &Cli) -> Result<AppConfig> {
    let raw_config = AppConfig::load_from_json(&cli.config)
        .with_context(|| format!("Failed to load application configuration from {}", cli.config.display()))?;
    let credentials = load_credentials_from_env().context("Failed to load database credentials")?;
    let app_config = AppConfig::resolve(cli, raw_config, credentials)
        .context("Invalid application configuration")?;
    Ok(app_config)
}

/// Routes all tracing events to `log_file` (appended, no ANSI colours) and,
/// when `verbose`, to stdout as well. The guard must outlive the run.
fn init_logging(log_file: &Path, verbose: bool) -> Result<WorkerGuard> {
    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .context("Log file path must name a file")?
        .to_string_lossy()
        .into_owned();

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .with_context(|| format!("Failed to create log file {}", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(false);
    let stdout_layer = verbose.then(|| fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(guard)
}

fn print_summary(summary: &RunSummary) {
    let marker = if summary.restore.all_succeeded() { "✓" } else { "⚠️" };
    println!(
        "{} Restore: {}/{} files restored in {:.2?}",
        marker, summary.restore.finished, summary.restore.total, summary.restore.elapsed
    );
    match &summary.modify {
        Ok(ModifyOutcome::NoModifyDir) => println!("Modify: no modification directory"),
        Ok(ModifyOutcome::Completed(report)) => println!(
            "Modify: {}/{} files applied in {:.2?}",
            report.succeeded, report.processed, report.elapsed
        ),
        Err(e) => println!("Modify: skipped, {}", e),
    }

    if summary.exit_code() == EXIT_SUCCESS {
        println!("✅ Operation completed successfully in {:.2?}.", summary.total_elapsed);
    } else {
        println!(
            "⚠️ Completed with {} failed file(s) in {:.2?}; see the log for details.",
            summary.failed_files(),
            summary.total_elapsed
        );
    }
}
