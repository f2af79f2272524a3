mod logic;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::executor::{CommandRunner, DatabaseExecutor};
use crate::utils::setting::check_db_connection;

pub use logic::{EXIT_CONNECTIVITY, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE, RunSummary};

/// Public entry point: build the client, prove the database is reachable,
/// then run the restore and modification phases.
pub async fn run_pipeline_flow(app_config: &AppConfig) -> Result<RunSummary, AppError> {
    let runner = CommandRunner::from_config(app_config)?;
    check_db_connection(&runner, &app_config.credentials.database).await?;

    let executor = Arc::new(DatabaseExecutor::new(runner));
    logic::perform_pipeline_orchestration(
        executor,
        &app_config.restore_path,
        &app_config.modify_dir,
        app_config.max_concurrent_restores,
    )
    .await
}

/// Maps a run-level error to a process exit code.
pub fn exit_code_for_error(error: &AppError) -> u8 {
    match error {
        AppError::Connectivity { .. } => EXIT_CONNECTIVITY,
        _ => EXIT_ERROR,
    }
}
