// Schema-checked appends: truncate wide rows, keep ragged short rows as-is.
use std::fs::OpenOptions;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind, storage_error};
use crate::core::rows::Row;

/// Non-fatal report that a row was wider than the table schema.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArityWarning {
    pub table: String,
    pub width: usize,
    pub provided: usize,
    pub dropped: Vec<String>,
}

/// Confirmation of a persisted row, exactly as written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Appended {
    pub table: String,
    pub row: Row,
    pub warning: Option<ArityWarning>,
}

/// Appends one record to `path`, cutting it down to `width` values first.
///
/// Shorter rows are written unpadded. The file is opened in append mode and
/// must already exist.
pub fn append_row(path: &Path, table: &str, width: usize, mut row: Row) -> Result<Appended, Error> {
    if row.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("no values to append")
            .with_table(table));
    }
    if width == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("table has no known columns")
            .with_table(table)
            .with_hint("Select the table again to refresh its schema."));
    }

    let warning = if row.len() > width {
        let provided = row.len();
        let dropped = row.split_off(width);
        warn!(table, width, provided, "row wider than schema; excess values dropped");
        Some(ArityWarning {
            table: table.to_string(),
            width,
            provided,
            dropped,
        })
    } else {
        None
    };

    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|err| storage_error(err, path).with_table(table))?;
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    writer.write_record(&row).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to append row")
            .with_table(table)
            .with_path(path)
            .with_source(err)
    })?;
    writer.into_inner().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to flush appended row: {}", err.error()))
            .with_table(table)
            .with_path(path)
    })?;

    debug!(table, fields = row.len(), "appended row");
    Ok(Appended {
        table: table.to_string(),
        row,
        warning,
    })
}
