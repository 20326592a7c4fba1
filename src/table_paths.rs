//! Purpose: Table-identifier normalization and collision naming helpers.
//! Exports: `TABLE_SUFFIX`, `normalize_table_name`, `collision_name`, `default_table_dir`.
//! Role: Keep catalog, session, and CLI naming rules aligned from one source.
//! Invariants: Every identifier carries the `.csv` suffix exactly once.
//! Invariants: Identifiers must not contain path separators.
//! Invariants: Collision names take the form `<stem>(N).csv`.

use std::path::PathBuf;

pub const TABLE_SUFFIX: &str = ".csv";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TableNameError {
    Empty,
    ContainsPathSeparator,
}

pub fn default_table_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Appends the table suffix unless the name already carries it.
pub fn normalize_table_name(name: &str) -> Result<String, TableNameError> {
    if name.contains('/') || name.contains('\\') {
        return Err(TableNameError::ContainsPathSeparator);
    }
    let stem = name.strip_suffix(TABLE_SUFFIX).unwrap_or(name);
    if stem.is_empty() {
        return Err(TableNameError::Empty);
    }
    Ok(format!("{stem}{TABLE_SUFFIX}"))
}

/// Builds the `attempt`-th alternative for an identifier that is already taken.
pub fn collision_name(identifier: &str, attempt: u32) -> String {
    let stem = identifier.strip_suffix(TABLE_SUFFIX).unwrap_or(identifier);
    format!("{stem}({attempt}){TABLE_SUFFIX}")
}
