// Pre-flight connectivity check
use tracing::{error, info};

use crate::errors::AppError;
use crate::executor::SqlRunner;

/// Verifies the database is reachable by selecting it through the same client
/// used for restores. Nothing may be restored if this fails.
pub async fn check_db_connection<R: SqlRunner>(runner: &R, database: &str) -> Result<(), AppError> {
    let probe = format!("USE `{}`;\n", database.replace('`', "``"));

    match runner.run(probe.into_bytes()).await {
        Ok(output) if output.success => {
            info!("✅ Successfully connected to database {}", database);
            Ok(())
        }
        Ok(output) => {
            error!(
                "❌ Failed to connect to database {}: {}\n{}",
                database, output.status, output.combined
            );
            Err(AppError::Connectivity {
                message: format!("client exited with {}", output.status),
                output: output.combined,
            })
        }
        Err(e) => {
            error!("❌ Failed to connect to database {}: {}", database, e);
            Err(AppError::Connectivity {
                message: e.to_string(),
                output: String::new(),
            })
        }
    }
}
