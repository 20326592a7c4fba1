use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    TableNotFound,
    ColumnNotFound,
    NoSelection,
    StorageMissing,
    DecodeFailure,
    Io,
    NameSpaceExhausted,
}

/// One failed candidate during encoding resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodeAttempt {
    pub encoding: &'static str,
    pub detail: String,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    table: Option<String>,
    column: Option<String>,
    attempts: Vec<DecodeAttempt>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            table: None,
            column: None,
            attempts: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn attempts(&self) -> &[DecodeAttempt] {
        &self.attempts
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_attempts(mut self, attempts: Vec<DecodeAttempt>) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {table})")?;
        }
        if let Some(column) = &self.column {
            write!(f, " (column: {column})")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if !self.attempts.is_empty() {
            let tried = self
                .attempts
                .iter()
                .map(|attempt| format!("{}: {}", attempt.encoding, attempt.detail))
                .collect::<Vec<_>>()
                .join("; ");
            write!(f, " (tried: {tried})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::TableNotFound => 3,
        ErrorKind::ColumnNotFound => 4,
        ErrorKind::NoSelection => 5,
        ErrorKind::StorageMissing => 6,
        ErrorKind::DecodeFailure => 7,
        ErrorKind::Io => 8,
        ErrorKind::NameSpaceExhausted => 9,
    }
}

/// Wraps an I/O failure on a table file, mapping a vanished file to `StorageMissing`.
pub(crate) fn storage_error(err: std::io::Error, path: &std::path::Path) -> Error {
    let kind = match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::StorageMissing,
        _ => ErrorKind::Io,
    };
    Error::new(kind).with_path(path).with_source(err)
}

#[cfg(test)]
mod tests {
    use super::{DecodeAttempt, Error, ErrorKind, storage_error, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::TableNotFound, 3),
            (ErrorKind::ColumnNotFound, 4),
            (ErrorKind::NoSelection, 5),
            (ErrorKind::StorageMissing, 6),
            (ErrorKind::DecodeFailure, 7),
            (ErrorKind::Io, 8),
            (ErrorKind::NameSpaceExhausted, 9),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_lists_context_and_attempts() {
        let err = Error::new(ErrorKind::DecodeFailure)
            .with_message("no candidate encoding decoded the header")
            .with_table("t.csv")
            .with_attempts(vec![
                DecodeAttempt {
                    encoding: "utf-8",
                    detail: "malformed input at byte 3".to_string(),
                },
                DecodeAttempt {
                    encoding: "ascii",
                    detail: "malformed input at byte 3".to_string(),
                },
            ]);
        let text = err.to_string();
        assert!(text.starts_with("DecodeFailure: no candidate"));
        assert!(text.contains("(table: t.csv)"));
        assert!(text.contains("utf-8: malformed input at byte 3; ascii:"));
    }

    #[test]
    fn missing_file_maps_to_storage_missing() {
        let err = std::io::Error::from(std::io::ErrorKind::NotFound);
        let mapped = storage_error(err, std::path::Path::new("gone.csv"));
        assert_eq!(mapped.kind(), ErrorKind::StorageMissing);

        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let mapped = storage_error(err, std::path::Path::new("locked.csv"));
        assert_eq!(mapped.kind(), ErrorKind::Io);
        assert!(std::error::Error::source(&mapped).is_some());
    }
}
