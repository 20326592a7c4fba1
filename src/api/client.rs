//! Purpose: Bundle one catalog with one session behind the table command surface.
//! Exports: `TableClient`, `ApiResult`.
//! Role: Entry point for the CLI and embedders; mirrors the shell commands.
//! Invariants: The catalog is scanned exactly once, in `TableClient::open`.
//! Invariants: Selection changes only through `select_table`.
#![allow(clippy::result_large_err)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::append::Appended;
use crate::core::catalog::Catalog;
use crate::core::encoding::ResolvedHeader;
use crate::core::error::Error;
use crate::core::rows::{Row, TableRows};
use crate::core::session::Session;
use crate::table_paths::default_table_dir;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Debug)]
pub struct TableClient {
    catalog: Catalog,
    session: Session,
}

impl TableClient {
    /// Scans the current directory.
    pub fn new() -> ApiResult<Self> {
        Self::open(default_table_dir())
    }

    pub fn open(table_dir: impl Into<PathBuf>) -> ApiResult<Self> {
        Ok(Self {
            catalog: Catalog::open(table_dir)?,
            session: Session::new(),
        })
    }

    pub fn table_dir(&self) -> &Path {
        self.catalog.dir()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected(&self) -> Option<&str> {
        self.session.selected()
    }

    pub fn create_table(&mut self, name: &str, columns: &[String]) -> ApiResult<String> {
        self.catalog.create(name, columns)
    }

    pub fn select_table(&mut self, name: &str) -> ApiResult<ResolvedHeader> {
        self.session.select(&mut self.catalog, name)
    }

    pub fn peek_header(&self) -> ApiResult<ResolvedHeader> {
        self.session.peek_header(&self.catalog)
    }

    pub fn append_row(&self, row: Row) -> ApiResult<Appended> {
        self.session.append(&self.catalog, row)
    }

    pub fn dump_table(&self) -> ApiResult<TableRows> {
        self.session.dump(&self.catalog)
    }

    pub fn project_column(&self, column: &str) -> ApiResult<HashSet<String>> {
        self.session.project_column(&self.catalog, column)
    }

    pub fn list_tables(&self) -> Vec<(String, Vec<String>)> {
        self.catalog
            .entries()
            .map(|(name, columns)| (name.to_string(), columns.to_vec()))
            .collect()
    }
}
