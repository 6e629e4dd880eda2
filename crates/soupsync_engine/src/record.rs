//! Record helpers: sync metadata, ids and nested children.

use crate::config::{LOCAL, SYNC_FLAGS};
use crate::error::{SyncError, SyncResult};
use serde_json::Value;
use soupsync_store::{Record, SOUP_ENTRY_ID};

/// Key under which a remote sub-query result keeps its rows.
const SUBQUERY_RECORDS: &str = "records";

/// Sets all four sync-metadata flags to false.
pub fn mark_clean(record: &mut Record) {
    for flag in SYNC_FLAGS {
        record.insert(flag.to_string(), Value::Bool(false));
    }
}

/// Returns true if the record's `__local__` flag is set.
pub fn is_locally_dirty(record: &Record) -> bool {
    record.get(LOCAL).map(is_truthy).unwrap_or(false)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        Value::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        _ => false,
    }
}

/// Renders an id value as a string.
///
/// Strings are taken as is and numbers are printed; anything else is not an id.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the record's local row id.
pub fn local_id(record: &Record) -> Option<i64> {
    match record.get(SOUP_ENTRY_ID)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Borrows the nested children of a fetched record.
///
/// Children may be a bare array or a sub-query result object with a
/// `records` array. Absent or `null` means no children.
pub fn children_of<'a>(record: &'a Record, relationship: &str) -> SyncResult<Vec<&'a Record>> {
    let rows = match record.get(relationship) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(Value::Object(result)) => match result.get(SUBQUERY_RECORDS) {
            Some(Value::Array(rows)) => rows,
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(_) => return Err(not_a_list(relationship)),
        },
        Some(_) => return Err(not_a_list(relationship)),
    };

    rows.iter()
        .map(|row| {
            row.as_object().ok_or_else(|| {
                SyncError::malformed(format!("child under {relationship} is not an object"))
            })
        })
        .collect()
}

/// Removes the nested children from a fetched record and returns them.
pub fn take_children(record: &mut Record, relationship: &str) -> SyncResult<Vec<Record>> {
    let children = children_of(record, relationship)?
        .into_iter()
        .cloned()
        .collect();
    record.remove(relationship);
    Ok(children)
}

fn not_a_list(relationship: &str) -> SyncError {
    SyncError::malformed(format!("children under {relationship} are not a list"))
}
