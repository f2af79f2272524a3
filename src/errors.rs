use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("{name} executable not found in PATH. Please ensure the MySQL client tools (or docker) are installed and in your PATH.")]
    MissingExecutable { name: String },

    /// Directory traversal failed. Fatal to the phase that raised it.
    #[error("Failed to discover SQL files under {}: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A single file could not be run. Always recovered at the item boundary.
    #[error("Execution of {} failed: {message}", .path.display())]
    Execution {
        path: PathBuf,
        message: String,
        output: String,
    },

    /// Pre-flight check failed; nothing may be restored.
    #[error("Database connectivity check failed: {message}")]
    Connectivity { message: String, output: String },
}

impl AppError {
    /// Captured client output attached to the error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            AppError::Execution { output, .. } | AppError::Connectivity { output, .. } => {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}
