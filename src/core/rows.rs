// Record streaming over table files through a decoding reader.
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::core::encoding::{DecodingReader, MalformedInput, TextEncoding};
use crate::core::error::{DecodeAttempt, Error, ErrorKind, storage_error};

/// An untyped record; an empty string is the only "missing" value.
pub type Row = Vec<String>;

pub(crate) type RecordReader = csv::Reader<DecodingReader<File>>;

pub(crate) fn open_records(path: &Path, encoding: TextEncoding) -> Result<RecordReader, Error> {
    let file = File::open(path).map_err(|err| storage_error(err, path))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(DecodingReader::new(file, encoding)))
}

/// Returns a description when `err` came from undecodable input.
pub(crate) fn malformed_detail(err: &csv::Error) -> Option<String> {
    match err.kind() {
        csv::ErrorKind::Io(io_err) if io_err.kind() == std::io::ErrorKind::InvalidData => io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MalformedInput>())
            .map(|malformed| malformed.to_string()),
        csv::ErrorKind::Utf8 { err, .. } => Some(format!("invalid utf-8 in record: {err}")),
        _ => None,
    }
}

pub(crate) fn record_error(err: csv::Error, path: &Path) -> Error {
    if let Some(detail) = malformed_detail(&err) {
        return Error::new(ErrorKind::DecodeFailure)
            .with_message("table body could not be decoded")
            .with_path(path)
            .with_attempts(vec![DecodeAttempt {
                encoding: encoding_of(&err).unwrap_or("unknown"),
                detail,
            }]);
    }
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => storage_error(io_err, path),
        other => Error::new(ErrorKind::Io)
            .with_message(format!("failed to read record: {other:?}"))
            .with_path(path),
    }
}

fn encoding_of(err: &csv::Error) -> Option<&'static str> {
    match err.kind() {
        csv::ErrorKind::Io(io_err) => io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MalformedInput>())
            .map(|malformed| malformed.encoding.label()),
        _ => None,
    }
}

/// Lazily yields every record of a table file in file order, header first.
///
/// The file is closed when the iterator is dropped or exhausted. After the
/// first error the stream ends.
pub struct TableRows {
    path: PathBuf,
    records: csv::StringRecordsIntoIter<DecodingReader<File>>,
    failed: bool,
}

impl TableRows {
    pub(crate) fn open(path: &Path, encoding: TextEncoding) -> Result<Self, Error> {
        let reader = open_records(path, encoding)?;
        Ok(Self {
            path: path.to_path_buf(),
            records: reader.into_records(),
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for TableRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRows")
            .field("path", &self.path)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl Iterator for TableRows {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.records.next()? {
            Ok(record) => Some(Ok(record.iter().map(str::to_string).collect())),
            Err(err) => {
                self.failed = true;
                Some(Err(record_error(err, &self.path)))
            }
        }
    }
}
