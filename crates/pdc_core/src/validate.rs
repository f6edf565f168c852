//! Request body validation.
//!
//! [`FieldReader`] walks a JSON object, converts each field and collects
//! per-field messages instead of stopping at the first problem, so a single
//! response reports every bad field.

use serde_json::{Map, Value};

use crate::error::{FieldErrors, PdcError};
use crate::lookups::Lookup;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_STRING: &str = "Not a valid string.";
pub const NOT_INTEGER: &str = "A valid integer is required.";

const TRUE_VALUES: &[&str] = &["t", "T", "y", "Y", "yes", "YES", "true", "True", "TRUE", "on", "On", "ON", "1"];
const FALSE_VALUES: &[&str] = &["f", "F", "n", "N", "no", "NO", "false", "False", "FALSE", "off", "Off", "OFF", "0"];

/// Reject keys outside `allowed` with a single detail message.
pub fn ensure_known_fields(map: &Map<String, Value>, allowed: &[&str]) -> Result<(), PdcError> {
    let mut unknown: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|k| !allowed.contains(k))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    let quoted: Vec<String> = unknown.iter().map(|k| format!("\"{k}\"")).collect();
    Err(PdcError::InvalidInput(format!(
        "Unknown fields: {}.",
        quoted.join(", ")
    )))
}

/// The body as a JSON object, or the serializer error for anything else.
pub fn as_object(body: &Value) -> Result<&Map<String, Value>, PdcError> {
    body.as_object().ok_or_else(|| {
        PdcError::Validation(FieldErrors::non_field(format!(
            "Invalid data. Expected a dictionary, but got {}.",
            kind(body)
        )))
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Display form used in messages: bare for strings, JSON otherwise.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Lenient boolean conversion: JSON booleans, 0/1 and the usual spellings.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) if TRUE_VALUES.contains(&s.as_str()) => Some(true),
        Value::String(s) if FALSE_VALUES.contains(&s.as_str()) => Some(false),
        _ => None,
    }
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(NOT_NULL),
        _ => Err(NOT_STRING),
    }
}

pub struct FieldReader<'a> {
    map: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    /// Check the body shape and field names, then start reading.
    pub fn new(body: &'a Value, allowed: &[&str]) -> Result<Self, PdcError> {
        let map = as_object(body)?;
        ensure_known_fields(map, allowed)?;
        Ok(Self::over(map))
    }

    /// Read an already checked object.
    pub fn over(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            errors: FieldErrors::new(),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn error(&mut self, key: &str, message: impl Into<String>) {
        self.errors.add(key, message);
    }

    /// Required, non-blank text.
    pub fn string(&mut self, key: &str) -> Option<String> {
        let Some(value) = self.map.get(key) else {
            self.errors.add(key, REQUIRED);
            return None;
        };
        match as_text(value) {
            Ok(s) if s.trim().is_empty() => {
                self.errors.add(key, NOT_BLANK);
                None
            }
            Ok(s) => Some(s),
            Err(msg) => {
                self.errors.add(key, msg);
                None
            }
        }
    }

    /// `None` when absent, `Some(None)` for null or blank.
    pub fn nullable_string(&mut self, key: &str) -> Option<Option<String>> {
        let value = self.map.get(key)?;
        match as_text(value) {
            Ok(s) if s.trim().is_empty() => Some(None),
            Ok(s) => Some(Some(s)),
            Err(NOT_NULL) => Some(None),
            Err(msg) => {
                self.errors.add(key, msg);
                None
            }
        }
    }

    /// Required lookup value.
    pub fn choice<L: Lookup>(&mut self, key: &str) -> Option<L> {
        let raw = self.string(key)?;
        match L::parse_choice(&raw) {
            Ok(v) => Some(v),
            Err(msg) => {
                self.errors.add(key, msg);
                None
            }
        }
    }

    /// Optional boolean; `None` when absent or invalid (the error is recorded).
    pub fn boolean(&mut self, key: &str) -> Option<bool> {
        let value = self.map.get(key)?;
        if value.is_null() {
            self.errors.add(key, NOT_NULL);
            return None;
        }
        let parsed = parse_bool(value);
        if parsed.is_none() {
            self.errors.add(
                key,
                format!("\"{}\" is not a valid boolean.", display_value(value)),
            );
        }
        parsed
    }

    pub fn boolean_or(&mut self, key: &str, default: bool) -> bool {
        self.boolean(key).unwrap_or(default)
    }

    /// `None` when absent, `Some(None)` for null.
    pub fn nullable_integer(&mut self, key: &str) -> Option<Option<i64>> {
        let value = self.map.get(key)?;
        if value.is_null() {
            return Some(None);
        }
        match parse_int(value) {
            Some(n) => Some(Some(n)),
            None => {
                self.errors.add(key, NOT_INTEGER);
                None
            }
        }
    }

    /// List of text items; a missing required list is reported.
    pub fn string_list(&mut self, key: &str, required: bool) -> Option<Vec<String>> {
        let Some(value) = self.map.get(key) else {
            if required {
                self.errors.add(key, REQUIRED);
            }
            return None;
        };
        let Some(items) = value.as_array() else {
            self.errors.add(
                key,
                format!("Expected a list of items but got type \"{}\".", kind(value)),
            );
            return None;
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match as_text(item) {
                Ok(s) => out.push(s),
                Err(msg) => {
                    self.errors.add(key, msg);
                    return None;
                }
            }
        }
        Some(out)
    }

    /// Fail with every collected field error.
    pub fn finish(self) -> Result<(), PdcError> {
        self.errors.into_result()
    }
}
