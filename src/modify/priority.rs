// restoretool/src/modify/priority.rs
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Execution class of a modification script, in execution order.
///
/// Rows are cleared and shrunk before limits apply, and masking runs last so
/// it sees the final row population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityClass {
    Truncate,
    Delete,
    Limit,
    Masking,
    Unclassified,
}

const PREFIXES: [(&str, PriorityClass); 4] = [
    ("truncate", PriorityClass::Truncate),
    ("delete", PriorityClass::Delete),
    ("limit", PriorityClass::Limit),
    ("masking", PriorityClass::Masking),
];

impl PriorityClass {
    /// Classifies by a case-insensitive prefix of the file's base name; first match wins.
    pub fn classify(path: &Path) -> Self {
        let Some(name) = path.file_name() else {
            return PriorityClass::Unclassified;
        };
        let name = name.to_string_lossy().to_lowercase();
        PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, class)| *class)
            .unwrap_or(PriorityClass::Unclassified)
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PriorityClass::Truncate => "truncate",
            PriorityClass::Delete => "delete",
            PriorityClass::Limit => "limit",
            PriorityClass::Masking => "masking",
            PriorityClass::Unclassified => "unclassified",
        };
        f.write_str(label)
    }
}

/// Orders modification files by [`PriorityClass`], then by case-sensitive base name.
pub fn prioritize(mut files: Vec<PathBuf>) -> Vec<PathBuf> {
    files.sort_by_cached_key(|path| {
        (
            PriorityClass::classify(path),
            path.file_name().map(OsString::from).unwrap_or_default(),
        )
    });
    files
}
