//! Purpose: Shared core library crate used by the `tabfile` CLI and tests.
//! Exports: `api` (stable surface), `core` (catalog, session, encoding, errors), `notice`.
//! Role: Storage and schema-integrity layer for CSV-backed tables.
//! Invariants: Operations open, consume, and close table files within one call.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod notice;
pub mod table_paths;
