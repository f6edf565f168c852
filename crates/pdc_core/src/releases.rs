//! Release create/update rules.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::changes::ChangeRecorder;
use crate::error::{Conflict, PdcError};
use crate::lookups::ReleaseType;
use crate::ports::{CatalogTx, Result};
use crate::types::{Release, ReleaseFields};
use crate::validate::{as_object, ensure_known_fields, FieldReader};

/// `release_id` is read-only and ignored on input.
const FIELDS: &[&str] = &[
    "release_id",
    "short",
    "version",
    "name",
    "release_type",
    "base_product",
    "active",
];

fn short_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z\-]+$").expect("valid regex"))
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)*$").expect("valid regex"))
}

/// Read release attributes; `base_product` falls back to `current_base`
/// when the body does not mention it.
fn read_fields(map: &Map<String, Value>, current_base: Option<String>) -> Result<ReleaseFields> {
    let mut reader = FieldReader::over(map);
    let short = reader.string("short");
    if let Some(s) = &short {
        if !short_re().is_match(s) {
            reader.error("short", "Only lowercase letters and '-' are allowed.");
        }
    }
    let version = reader.string("version");
    if let Some(v) = &version {
        if !version_re().is_match(v) {
            reader.error("version", "Only numbers separated by '.' are allowed.");
        }
    }
    let name = reader.string("name");
    let release_type = if reader.has("release_type") {
        reader.choice::<ReleaseType>("release_type")
    } else {
        Some(ReleaseType::Ga)
    };
    let base_product = reader.nullable_string("base_product");
    let active = reader.boolean_or("active", true);
    reader.finish()?;

    match (short, version, name, release_type) {
        (Some(short), Some(version), Some(name), Some(release_type)) => Ok(ReleaseFields {
            short,
            version,
            name,
            release_type,
            base_product: base_product.unwrap_or(current_base),
            active,
        }),
        _ => Err(PdcError::Internal(anyhow::anyhow!(
            "release fields missing without a recorded error"
        ))),
    }
}

async fn ensure_unique(
    tx: &mut dyn CatalogTx,
    fields: &ReleaseFields,
    own_pk: Option<i64>,
) -> Result<()> {
    if let Some(existing) = tx.find_release(&fields.release_id()).await? {
        if Some(existing.pk) != own_pk {
            return Err(Conflict::Release.error());
        }
    }
    Ok(())
}

pub(crate) async fn create(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    body: &Value,
) -> Result<Release> {
    let map = as_object(body)?;
    ensure_known_fields(map, FIELDS)?;
    let fields = read_fields(map, None)?;
    ensure_unique(tx, &fields, None).await?;
    let release = tx.insert_release(&fields).await?;
    rec.created(&release);
    Ok(release)
}

pub(crate) async fn update(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    release_id: &str,
    body: &Value,
    partial: bool,
) -> Result<Release> {
    let current = tx
        .find_release(release_id)
        .await?
        .ok_or_else(PdcError::not_found)?;
    let map = as_object(body)?;
    ensure_known_fields(map, FIELDS)?;

    let fields = if partial {
        let mut merged = match serde_json::to_value(&current) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        };
        merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        read_fields(&merged, current.base_product.clone())?
    } else {
        read_fields(map, current.base_product.clone())?
    };

    ensure_unique(tx, &fields, Some(current.pk)).await?;
    let updated = tx.update_release(current.pk, &fields).await?;
    rec.updated(&current, &updated);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read(body: Value) -> Result<ReleaseFields> {
        read_fields(body.as_object().unwrap(), None)
    }

    #[test]
    fn defaults_apply() {
        let fields = read(json!({ "short": "rhel", "version": "7.1", "name": "RHEL" })).unwrap();
        assert_eq!(fields.release_type, ReleaseType::Ga);
        assert!(fields.active);
        assert_eq!(fields.release_id(), "rhel-7.1");
    }

    #[test]
    fn short_and_version_are_checked() {
        let err = read(json!({ "short": "RHEL", "version": "seven", "name": "RHEL" }))
            .unwrap_err();
        let body = err.body();
        assert!(body.get("short").is_some());
        assert!(body.get("version").is_some());
    }

    #[test]
    fn bad_release_type() {
        let err = read(json!({
            "short": "rhel", "version": "7", "name": "RHEL", "release_type": "beta"
        }))
        .unwrap_err();
        assert!(err.body()["release_type"][0]
            .as_str()
            .unwrap()
            .starts_with("'beta' is not allowed value."));
    }
}
