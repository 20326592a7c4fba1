//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `arity_notice`.
//! Role: Shared contract helper for CLI diagnostics (non-error events).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

use crate::core::append::ArityWarning;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub table: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("table".to_string(), json!(notice.table));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Describes a truncated append.
pub fn arity_notice(warning: &ArityWarning, cmd: &str, time: String) -> Notice {
    let mut details = Map::new();
    details.insert("width".to_string(), json!(warning.width));
    details.insert("provided".to_string(), json!(warning.provided));
    details.insert("dropped".to_string(), json!(warning.dropped));

    Notice {
        kind: "arity".to_string(),
        time,
        cmd: cmd.to_string(),
        table: warning.table.clone(),
        message: format!(
            "row has {} values but the table has {} columns; excess values dropped",
            warning.provided, warning.width
        ),
        details,
    }
}
