pub mod discovery;
pub mod setting;

use std::path::PathBuf;
use which::which;

use crate::errors::AppError;

/// Finds an executable (e.g. `mysql`, `docker`) in the system PATH.
/// Absolute or relative paths are accepted as long as they resolve.
pub fn find_executable(name: &str) -> Result<PathBuf, AppError> {
    which(name).map_err(|_| AppError::MissingExecutable {
        name: name.to_string(),
    })
}
