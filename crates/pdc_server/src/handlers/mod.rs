pub mod arches;
pub mod changesets;
pub mod health;
pub mod lookups;
pub mod releases;
pub mod repo_clone;
pub mod repos;
pub mod variants;

use axum::body::Bytes;
use pdc_core::error::PdcError;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Body of a create call: one object, or a list for a list body.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Created<T> {
    One(T),
    Many(Vec<T>),
}

/// Paths no route matches get the regular 404 body.
pub async fn not_found() -> AppError {
    AppError(PdcError::not_found())
}

/// Decode a JSON request body; an empty body reads as `{}`.
pub(crate) fn json_body(bytes: &Bytes) -> Result<Value, PdcError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| PdcError::InvalidInput(format!("JSON parse error - {e}")))
}

/// Numeric path ids; anything else cannot name a row.
pub(crate) fn path_id(raw: &str) -> Result<i64, PdcError> {
    raw.parse().map_err(|_| PdcError::not_found())
}

/// Body of a bulk delete: a JSON list of identifiers.
pub(crate) fn id_list(body: Value) -> Result<Vec<Value>, PdcError> {
    match body {
        Value::Array(items) if !items.is_empty() => Ok(items),
        _ => Err(PdcError::InvalidInput(
            "Bulk delete expects a non-empty list of identifiers.".into(),
        )),
    }
}
