// Table catalog: one directory scan at open, plus collision-safe table creation.
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::encoding::resolve_header;
use crate::core::error::{Error, ErrorKind};
use crate::table_paths::{TABLE_SUFFIX, TableNameError, collision_name, normalize_table_name};

/// Upper bound on `name(N).csv` candidates tried before giving up.
pub const MAX_NAME_ATTEMPTS: u32 = 1000;

#[derive(Debug)]
pub struct Catalog {
    dir: PathBuf,
    tables: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// Scans `dir` once and caches the header of every `.csv` file found.
    ///
    /// Files whose header cannot be read are still registered, with an empty
    /// schema.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        let entries = std::fs::read_dir(&dir).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read table directory")
                .with_path(&dir)
                .with_source(err)
        })?;

        let mut tables = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read table directory entry")
                    .with_path(&dir)
                    .with_source(err)
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(TABLE_SUFFIX) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let columns = match resolve_header(&path) {
                Ok(header) => header.columns,
                Err(err) => {
                    warn!(table = %name, error = %err, "table header unreadable; cached with empty schema");
                    Vec::new()
                }
            };
            tables.insert(name, columns);
        }

        debug!(dir = %dir.display(), tables = tables.len(), "scanned table directory");
        Ok(Self { dir, tables })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, identifier: &str) -> PathBuf {
        self.dir.join(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.tables.contains_key(identifier)
    }

    /// Cached schema; not re-read from disk.
    pub fn schema(&self, identifier: &str) -> Option<&[String]> {
        self.tables.get(identifier).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables
            .iter()
            .map(|(name, columns)| (name.as_str(), columns.as_slice()))
    }

    /// Creates a table file holding only a header record and registers it.
    ///
    /// Returns the identifier actually used, which carries a `(N)` counter
    /// when the requested name is taken. Existing files are never touched.
    pub fn create(&mut self, name: &str, columns: &[String]) -> Result<String, Error> {
        let requested = normalize_table_name(name).map_err(|err| name_error(err, name))?;
        if columns.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("a table needs at least one column")
                .with_table(&requested));
        }

        let (identifier, file) = self.claim_name(&requested)?;
        let path = self.path_of(&identifier);
        if let Err(err) = write_header(file, columns, &path) {
            return Err(abandon_claim(&path, &identifier, err));
        }

        debug!(table = %identifier, width = columns.len(), "created table");
        self.tables.insert(identifier.clone(), columns.to_vec());
        Ok(identifier)
    }

    pub(crate) fn refresh(&mut self, identifier: &str, columns: Vec<String>) {
        if let Some(cached) = self.tables.get_mut(identifier) {
            if *cached != columns {
                debug!(table = %identifier, width = columns.len(), "refreshed cached schema");
            }
            *cached = columns;
        }
    }

    fn claim_name(&self, requested: &str) -> Result<(String, File), Error> {
        let mut candidate = requested.to_string();
        for attempt in 1..=MAX_NAME_ATTEMPTS + 1 {
            let path = self.path_of(&candidate);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((candidate, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(table = %candidate, "table name taken");
                    candidate = collision_name(requested, attempt);
                }
                Err(err) => {
                    return Err(Error::new(ErrorKind::Io)
                        .with_message("failed to create table file")
                        .with_table(&candidate)
                        .with_path(&path)
                        .with_source(err));
                }
            }
        }
        Err(Error::new(ErrorKind::NameSpaceExhausted)
            .with_message(format!(
                "no free name after {MAX_NAME_ATTEMPTS} suffixed candidates"
            ))
            .with_table(requested)
            .with_path(&self.dir)
            .with_hint("Pick a different table name or remove unused copies."))
    }
}

// A claimed file that never got its header would shadow the name forever.
fn abandon_claim(path: &Path, identifier: &str, err: Error) -> Error {
    if let Err(cleanup) = std::fs::remove_file(path) {
        warn!(table = %identifier, error = %cleanup, "failed to remove partial table file");
    }
    err.with_table(identifier)
}

fn write_header<W: Write>(sink: W, columns: &[String], path: &Path) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(sink);
    writer.write_record(columns).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write table header")
            .with_path(path)
            .with_source(err)
    })?;
    writer.into_inner().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to flush table header: {}", err.error()))
            .with_path(path)
    })?;
    Ok(())
}

pub(crate) fn name_error(err: TableNameError, name: &str) -> Error {
    let message = match err {
        TableNameError::Empty => "table name is empty",
        TableNameError::ContainsPathSeparator => "table name must not contain path separators",
    };
    Error::new(ErrorKind::Usage)
        .with_message(message)
        .with_table(name)
        .with_hint("Use a bare name like `people`; the .csv suffix is added for you.")
}

#[cfg(test)]
mod tests {
    use super::{Catalog, MAX_NAME_ATTEMPTS, abandon_claim, write_header};
    use crate::core::error::{Error, ErrorKind};
    use std::io;

    struct FullDisk;

    impl io::Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn scan_picks_up_csv_files_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("people.csv"), "name,age\nann,3\n").expect("write");
        std::fs::write(dir.path().join("notes.txt"), "not,a,table\n").expect("write");
        std::fs::write(dir.path().join("blank.csv"), "").expect("write");
        std::fs::create_dir(dir.path().join("folder.csv")).expect("mkdir");

        let catalog = Catalog::open(dir.path()).expect("open");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.schema("people.csv"), Some(&cols(&["name", "age"])[..]));
        assert_eq!(catalog.schema("blank.csv"), Some(&[][..]));
        assert!(!catalog.contains("notes.txt"));
        assert!(!catalog.contains("folder.csv"));
    }

    #[test]
    fn undecodable_table_is_cached_with_empty_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bad.csv"), b"a,\xff").expect("write");
        let catalog = Catalog::open(dir.path()).expect("open");
        assert_eq!(catalog.schema("bad.csv"), Some(&[][..]));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Catalog::open(dir.path().join("missing")).expect_err("missing dir");
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn create_writes_header_and_registers_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        let created = catalog.create("t", &cols(&["a", "b"])).expect("create");
        assert_eq!(created, "t.csv");
        assert_eq!(catalog.schema("t.csv"), Some(&cols(&["a", "b"])[..]));
        let text = std::fs::read_to_string(dir.path().join("t.csv")).expect("read");
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["a,b"]);
    }

    #[test]
    fn collisions_get_counted_suffixes_and_never_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        assert_eq!(catalog.create("t", &cols(&["a"])).unwrap(), "t.csv");
        assert_eq!(catalog.create("t.csv", &cols(&["b"])).unwrap(), "t(1).csv");
        assert_eq!(catalog.create("t", &cols(&["c"])).unwrap(), "t(2).csv");

        assert_eq!(catalog.schema("t.csv"), Some(&cols(&["a"])[..]));
        assert_eq!(catalog.schema("t(1).csv"), Some(&cols(&["b"])[..]));
        let first = std::fs::read_to_string(dir.path().join("t.csv")).expect("read");
        assert_eq!(first.lines().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn collision_search_stops_at_cap() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("t.csv"), "a\n").expect("write");
        for n in 1..=MAX_NAME_ATTEMPTS {
            std::fs::write(dir.path().join(format!("t({n}).csv")), "a\n").expect("write");
        }
        let mut catalog = Catalog::open(dir.path()).expect("open");
        let err = catalog.create("t", &cols(&["a"])).expect_err("exhausted");
        assert_eq!(err.kind(), ErrorKind::NameSpaceExhausted);
    }

    #[test]
    fn create_rejects_bad_names_and_empty_schemas() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut catalog = Catalog::open(dir.path()).expect("open");
        let err = catalog.create("../t", &cols(&["a"])).expect_err("separator");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = catalog.create("t", &[]).expect_err("no columns");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(catalog.is_empty());
    }

    #[test]
    fn header_write_failure_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = write_header(FullDisk, &cols(&["a"]), &dir.path().join("t.csv"))
            .expect_err("full disk");
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn abandoned_claim_frees_the_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "").expect("claimed");

        let err = abandon_claim(&path, "t.csv", Error::new(ErrorKind::Io));
        assert_eq!(err.table(), Some("t.csv"));
        assert!(!path.exists());

        let mut catalog = Catalog::open(dir.path()).expect("open");
        assert_eq!(catalog.create("t", &cols(&["a"])).unwrap(), "t.csv");
    }
}
