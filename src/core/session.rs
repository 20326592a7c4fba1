// Session: the single selected table and every row-level operation against it.
use std::collections::HashSet;

use tracing::debug;

use crate::core::append::{Appended, append_row};
use crate::core::catalog::{Catalog, name_error};
use crate::core::encoding::{DEFAULT_ENCODING, ResolvedHeader, resolve_header};
use crate::core::error::{Error, ErrorKind};
use crate::core::project::project_column;
use crate::core::rows::{Row, TableRows};
use crate::table_paths::normalize_table_name;

/// Selection state. Operations take the catalog explicitly, so several
/// sessions can share one catalog.
#[derive(Clone, Debug, Default)]
pub struct Session {
    selected: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selects a catalogued table and returns its live header.
    ///
    /// Catalog membership decides existence. On success the live header
    /// replaces the cached schema used by appends. If the live header cannot
    /// be decoded the table stays selected and the error is returned.
    pub fn select(&mut self, catalog: &mut Catalog, name: &str) -> Result<ResolvedHeader, Error> {
        let identifier = normalize_table_name(name).map_err(|err| name_error(err, name))?;
        if !catalog.contains(&identifier) {
            return Err(Error::new(ErrorKind::TableNotFound)
                .with_message("table does not exist")
                .with_table(&identifier)
                .with_path(catalog.path_of(&identifier))
                .with_hint("Create it first, or check the table directory."));
        }

        debug!(table = %identifier, "selected table");
        self.selected = Some(identifier.clone());
        let header = resolve_header(&catalog.path_of(&identifier))
            .map_err(|err| err.with_table(&identifier))?;
        catalog.refresh(&identifier, header.columns.clone());
        Ok(header)
    }

    /// Re-reads the selected table's header from disk.
    pub fn peek_header(&self, catalog: &Catalog) -> Result<ResolvedHeader, Error> {
        let table = self.require_selection()?;
        resolve_header(&catalog.path_of(table)).map_err(|err| err.with_table(table))
    }

    /// Appends against the cached schema width; see [`append_row`].
    pub fn append(&self, catalog: &Catalog, row: Row) -> Result<Appended, Error> {
        let table = self.require_selection()?;
        let width = catalog.schema(table).map(<[String]>::len).ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message("selected table has no catalog entry")
                .with_table(table)
        })?;
        append_row(&catalog.path_of(table), table, width, row)
    }

    pub fn project_column(&self, catalog: &Catalog, column: &str) -> Result<HashSet<String>, Error> {
        let table = self.require_selection()?;
        project_column(&catalog.path_of(table), table, column)
    }

    /// Streams every record, header first, decoded as UTF-8 only.
    pub fn dump(&self, catalog: &Catalog) -> Result<TableRows, Error> {
        let table = self.require_selection()?;
        let path = catalog.path_of(table);
        if !path.exists() {
            return Err(Error::new(ErrorKind::StorageMissing)
                .with_message("selected table no longer exists on disk")
                .with_table(table)
                .with_path(&path));
        }
        TableRows::open(&path, DEFAULT_ENCODING).map_err(|err| err.with_table(table))
    }

    fn require_selection(&self) -> Result<&str, Error> {
        self.selected.as_deref().ok_or_else(|| {
            Error::new(ErrorKind::NoSelection)
                .with_message("no table selected")
                .with_hint("Select a table first.")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::core::catalog::Catalog;
    use crate::core::error::ErrorKind;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn row_operations_need_a_selection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        catalog.create("t", &strings(&["a"])).expect("create");
        let session = Session::new();

        assert_eq!(
            session.peek_header(&catalog).unwrap_err().kind(),
            ErrorKind::NoSelection
        );
        assert_eq!(
            session.append(&catalog, strings(&["x"])).unwrap_err().kind(),
            ErrorKind::NoSelection
        );
        assert_eq!(
            session.project_column(&catalog, "a").unwrap_err().kind(),
            ErrorKind::NoSelection
        );
        assert_eq!(session.dump(&catalog).unwrap_err().kind(), ErrorKind::NoSelection);
    }

    #[test]
    fn unknown_table_leaves_selection_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        catalog.create("t", &strings(&["a"])).expect("create");
        let mut session = Session::new();
        session.select(&mut catalog, "t").expect("select");

        let err = session.select(&mut catalog, "nope").expect_err("not found");
        assert_eq!(err.kind(), ErrorKind::TableNotFound);
        assert_eq!(err.table(), Some("nope.csv"));
        assert_eq!(session.selected(), Some("t.csv"));
    }

    #[test]
    fn selection_refreshes_cached_schema_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        catalog.create("t", &strings(&["a"])).expect("create");
        std::fs::write(dir.path().join("t.csv"), "a,b,c\n").expect("external edit");
        assert_eq!(catalog.schema("t.csv").map(<[String]>::len), Some(1));

        let mut session = Session::new();
        let header = session.select(&mut catalog, "t.csv").expect("select");
        assert_eq!(header.columns, strings(&["a", "b", "c"]));
        assert_eq!(catalog.schema("t.csv").map(<[String]>::len), Some(3));

        let appended = session
            .append(&catalog, strings(&["1", "2", "3"]))
            .expect("append");
        assert!(appended.warning.is_none());
    }

    #[test]
    fn externally_removed_table_is_still_selectable_but_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        catalog.create("t", &strings(&["a"])).expect("create");
        std::fs::remove_file(dir.path().join("t.csv")).expect("remove");

        let mut session = Session::new();
        let err = session.select(&mut catalog, "t").expect_err("header gone");
        assert_eq!(err.kind(), ErrorKind::StorageMissing);
        assert_eq!(session.selected(), Some("t.csv"));

        let err = session.dump(&catalog).expect_err("dump");
        assert_eq!(err.kind(), ErrorKind::StorageMissing);
        let err = session.append(&catalog, strings(&["x"])).expect_err("append");
        assert_eq!(err.kind(), ErrorKind::StorageMissing);
        assert!(!dir.path().join("t.csv").exists());
    }

    #[test]
    fn dump_reads_utf8_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (bytes, _, _) = encoding_rs::GBK.encode("名字,a\n");
        std::fs::write(dir.path().join("g.csv"), &bytes).expect("write");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        let mut session = Session::new();

        let header = session.select(&mut catalog, "g").expect("select");
        assert_eq!(header.columns, strings(&["名字", "a"]));

        let first = session
            .dump(&catalog)
            .expect("dump")
            .next()
            .expect("item");
        assert_eq!(first.unwrap_err().kind(), ErrorKind::DecodeFailure);
    }
}
