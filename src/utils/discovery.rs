// restoretool/src/utils/discovery.rs
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::AppError;

pub const SQL_EXTENSION: &str = ".sql";

/// Result of looking for SQL files under a directory that may legitimately be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// The directory does not exist.
    NotFound,
    /// The directory exists; the list may be empty.
    Found(Vec<PathBuf>),
}

/// Recursively collects every regular `*.sql` file under `dir_path`, sorted
/// ascending by full path (byte order, not component order).
///
/// Symlinked `*.sql` files are ignored: only regular files are collected.
///
/// Any traversal failure, including a missing root, is a `Discovery` error.
pub fn find_and_sort_sql_files(dir_path: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut sql_files = Vec::new();

    for entry in WalkDir::new(dir_path).follow_links(false) {
        let entry = entry.map_err(|source| AppError::Discovery {
            path: dir_path.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if entry.file_name().to_string_lossy().ends_with(SQL_EXTENSION) {
            sql_files.push(entry.into_path());
        }
    }

    sql_files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(sql_files)
}

/// Like [`find_and_sort_sql_files`] but reports a missing directory as
/// [`Discovery::NotFound`] instead of an error.
pub fn locate_sql_files(dir_path: &Path) -> Result<Discovery, AppError> {
    // An inconclusive check falls through so the walk reports the real error.
    if let Ok(false) = dir_path.try_exists() {
        return Ok(Discovery::NotFound);
    }
    find_and_sort_sql_files(dir_path).map(Discovery::Found)
}
