// Column projection: distinct values of one named column, keyed by header.
use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::core::encoding::{CANDIDATES, TextEncoding, resolve_header};
use crate::core::error::{DecodeAttempt, Error, ErrorKind};
use crate::core::rows::{malformed_detail, open_records, record_error};

enum Failure {
    Malformed(String),
    Fatal(Error),
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::Fatal(err)
    }
}

/// Collects the distinct values of `column` across every data row.
///
/// The column is looked up in the header as [`resolve_header`] reads it. Each
/// candidate encoding must then decode the whole file and agree that the
/// column exists; a candidate that fails partway contributes nothing and the
/// next one starts over. Rows shorter than the header read the column as the
/// empty string; values past the header width are ignored. When the header
/// repeats a name, the last occurrence wins.
pub fn project_column(path: &Path, table: &str, column: &str) -> Result<HashSet<String>, Error> {
    let header = resolve_header(path).map_err(|err| err.with_table(table))?;
    if column_index(header.columns.iter().map(String::as_str), column).is_none() {
        return Err(Error::new(ErrorKind::ColumnNotFound)
            .with_message(format!("no column named `{column}`"))
            .with_table(table)
            .with_column(column)
            .with_path(path)
            .with_hint(format!("Known columns: [{}]", header.columns.join(", "))));
    }

    let mut attempts = Vec::new();
    for encoding in CANDIDATES {
        match project_with(path, encoding, column) {
            Ok(values) => {
                debug!(table, column, %encoding, distinct = values.len(), "projected column");
                return Ok(values);
            }
            Err(Failure::Malformed(detail)) => {
                debug!(table, column, %encoding, %detail, "projection decode failed");
                attempts.push(DecodeAttempt {
                    encoding: encoding.label(),
                    detail,
                });
            }
            Err(Failure::Fatal(err)) => return Err(err.with_table(table)),
        }
    }
    Err(Error::new(ErrorKind::DecodeFailure)
        .with_message("no candidate encoding could decode the whole table")
        .with_table(table)
        .with_column(column)
        .with_path(path)
        .with_attempts(attempts))
}

fn column_index<'a>(names: impl Iterator<Item = &'a str>, column: &str) -> Option<usize> {
    names
        .enumerate()
        .filter(|(_, name)| *name == column)
        .map(|(idx, _)| idx)
        .last()
}

fn project_with(
    path: &Path,
    encoding: TextEncoding,
    column: &str,
) -> Result<HashSet<String>, Failure> {
    let mut records = open_records(path, encoding)?.into_records();
    let classify = |err: csv::Error| match malformed_detail(&err) {
        Some(detail) => Failure::Malformed(detail),
        None => Failure::Fatal(record_error(err, path)),
    };

    let header = match records.next() {
        Some(record) => record.map_err(classify)?,
        None => csv::StringRecord::new(),
    };
    let index = column_index(header.iter(), column).ok_or_else(|| {
        Failure::Malformed(format!("header decoded as {encoding} has no column `{column}`"))
    })?;

    let mut values = HashSet::new();
    for record in records {
        let record = record.map_err(classify)?;
        values.insert(record.get(index).unwrap_or("").to_string());
    }
    Ok(values)
}
