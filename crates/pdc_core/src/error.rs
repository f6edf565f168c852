use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Key under which errors not tied to a single field are reported.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Error)]
pub enum PdcError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("invalid query: {}", .0.join("; "))]
    InvalidQuery(Vec<String>),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("item {index} rejected: {source}")]
    BulkItem {
        index: usize,
        data: Value,
        source: Box<PdcError>,
    },

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PdcError {
    /// The generic 404 used for missing resources.
    pub fn not_found() -> Self {
        Self::NotFound("Not found.".into())
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidInput(_) | Self::Validation(_) | Self::InvalidQuery(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::BulkItem { source, .. } => source.http_status(),
            Self::Internal(_) => 500,
        }
    }

    /// Response body in the PDC wire format.
    pub fn body(&self) -> Value {
        match self {
            Self::NotFound(msg) | Self::InvalidInput(msg) | Self::Unauthorized(msg) => {
                json!({ "detail": msg })
            }
            Self::Validation(errors) => json!(errors),
            Self::InvalidQuery(messages) => json!({ "detail": messages }),
            Self::BulkItem {
                index,
                data,
                source,
            } => {
                // Nested errors are lifted out of their own `detail` wrapper.
                let inner = source.body();
                let detail = match inner.get("detail") {
                    Some(d) if inner.as_object().map_or(false, |o| o.len() == 1) => d.clone(),
                    _ => inner,
                };
                json!({
                    "detail": detail,
                    "invalid_data": data,
                    "invalid_data_id": index,
                })
            }
            Self::Internal(_) => json!({ "detail": "Internal server error." }),
        }
    }

    /// Attach the position and payload of a bulk item to an error.
    pub fn in_bulk(self, index: usize, data: Value) -> Self {
        Self::BulkItem {
            index,
            data,
            source: Box::new(self),
        }
    }
}

/// Unique keys of the catalog tables.
///
/// The service checks these before writing; stores map a unique-key
/// violation from a racing writer to the same error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Arch,
    Release,
    Variant,
    VariantArch,
    Repo,
}

impl Conflict {
    pub fn error(self) -> PdcError {
        let errors = match self {
            Self::Arch => FieldErrors::single("name", "Arch with this Name already exists."),
            Self::Release => {
                FieldErrors::non_field("Release with this Release id already exists.")
            }
            Self::Variant => FieldErrors::non_field(
                "Variant with this Release and Variant uid already exists.",
            ),
            Self::VariantArch => {
                FieldErrors::non_field("Variant arch with this Variant and Arch already exists.")
            }
            Self::Repo => FieldErrors::non_field(
                "Repo with this Variant arch, Service, Repo family, Content format, \
                 Content category, Name and Shadow already exists.",
            ),
        };
        PdcError::Validation(errors)
    }
}

impl From<FieldErrors> for PdcError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Field name → messages, the serializer-style error map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::single(NON_FIELD_ERRORS, message)
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), PdcError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PdcError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(PdcError::not_found().http_status(), 404);
        assert_eq!(PdcError::InvalidInput("x".into()).http_status(), 400);
        assert_eq!(
            PdcError::Validation(FieldErrors::non_field("x")).http_status(),
            400
        );
        assert_eq!(PdcError::InvalidQuery(vec![]).http_status(), 400);
        assert_eq!(PdcError::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(
            PdcError::Internal(anyhow::anyhow!("boom")).http_status(),
            500
        );
    }

    #[test]
    fn bulk_item_keeps_inner_status() {
        let err = PdcError::not_found().in_bulk(3, json!(7));
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn validation_body_is_the_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("name", "This field is required.");
        errors.add("name", "second");
        let body = PdcError::Validation(errors).body();
        assert_eq!(body, json!({ "name": ["This field is required.", "second"] }));
    }

    #[test]
    fn bulk_body_unwraps_detail() {
        let err = PdcError::InvalidInput("Unknown fields: \"foo\".".into())
            .in_bulk(0, json!({ "foo": 1 }));
        assert_eq!(
            err.body(),
            json!({
                "detail": "Unknown fields: \"foo\".",
                "invalid_data": { "foo": 1 },
                "invalid_data_id": 0,
            })
        );
    }

    #[test]
    fn bulk_body_embeds_field_errors() {
        let err = PdcError::Validation(FieldErrors::single("content_format", "bad"))
            .in_bulk(1, json!({}));
        assert_eq!(err.body()["detail"], json!({ "content_format": ["bad"] }));
        assert_eq!(err.body()["invalid_data_id"], json!(1));
    }

    #[test]
    fn display_field_errors() {
        let err = PdcError::Validation(FieldErrors::single("shadow", "not a bool"));
        assert_eq!(err.to_string(), "validation failed: shadow: not a bool");
    }

    #[test]
    fn conflicts_are_validation_errors() {
        assert_eq!(Conflict::Repo.error().http_status(), 400);
        assert_eq!(
            Conflict::Arch.error().body(),
            json!({ "name": ["Arch with this Name already exists."] })
        );
        assert_eq!(
            Conflict::Release.error().body(),
            json!({ "non_field_errors": ["Release with this Release id already exists."] })
        );
    }

    #[test]
    fn internal_body_hides_cause() {
        let err = PdcError::Internal(anyhow::anyhow!("password=hunter2"));
        assert_eq!(err.body(), json!({ "detail": "Internal server error." }));
    }
}
