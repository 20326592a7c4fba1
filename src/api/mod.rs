//! Purpose: Define the stable public Rust API boundary for tabfile.
//! Exports: Core types plus `TableClient`, the command surface used by the CLI.
//! Role: Public, additive-only surface; hides helper modules.
//! Invariants: Every row-level call goes through a `Session` selection.
//! Invariants: Errors are returned as values; nothing here panics on bad input.

mod client;

pub use crate::core::append::{Appended, ArityWarning};
pub use crate::core::catalog::{Catalog, MAX_NAME_ATTEMPTS};
pub use crate::core::encoding::{CANDIDATES, DEFAULT_ENCODING, ResolvedHeader, TextEncoding};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{DecodeAttempt, Error, ErrorKind};
pub use crate::core::rows::{Row, TableRows};
pub use crate::core::session::Session;
pub use client::{ApiResult, TableClient};
