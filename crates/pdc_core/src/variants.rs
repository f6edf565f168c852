//! Variant create/update/delete rules, including the arch set semantics.
//!
//! A variant's arches are its VariantArch rows. Arches can be replaced
//! (`arches`) or edited incrementally (`add_arches`, `remove_arches`, PATCH
//! only). A VariantArch with repos attached can never be removed, and a
//! variant with repos can never be deleted.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::changes::ChangeRecorder;
use crate::error::{Conflict, FieldErrors, PdcError};
use crate::lookups::VariantType;
use crate::ports::{CatalogTx, Result};
use crate::types::{Arch, Variant, VariantFields};
use crate::validate::{as_object, ensure_known_fields, FieldReader};

const FIELDS: &[&str] = &["release", "id", "uid", "name", "type", "arches"];
const PATCH_FIELDS: &[&str] = &[
    "release",
    "id",
    "uid",
    "name",
    "type",
    "arches",
    "add_arches",
    "remove_arches",
];

struct VariantInput {
    release_id: String,
    variant_id: String,
    variant_uid: String,
    variant_name: String,
    variant_type: VariantType,
    arches: BTreeSet<String>,
}

/// Read the scalar fields and the final arch set.
///
/// `edits` holds the PATCH body when incremental arch edits are allowed.
fn read_input(
    source: &Map<String, Value>,
    edits: Option<&Map<String, Value>>,
) -> Result<VariantInput> {
    let mut reader = FieldReader::over(source);
    let release_id = reader.string("release");
    let variant_id = reader.string("id");
    let variant_uid = reader.string("uid");
    let variant_name = reader.string("name");
    let variant_type = reader.choice::<VariantType>("type");
    let arches = reader.string_list("arches", true);
    reader.finish()?;

    let mut arches: BTreeSet<String> = arches.unwrap_or_default().into_iter().collect();

    if let Some(edits) = edits {
        let mut reader = FieldReader::over(edits);
        let add = reader.string_list("add_arches", false);
        let remove = reader.string_list("remove_arches", false);
        if edits.contains_key("arches") && (add.is_some() || remove.is_some()) {
            reader.error(
                crate::error::NON_FIELD_ERRORS,
                "Can not combine 'arches' with 'add_arches' or 'remove_arches'.",
            );
        }
        arches.extend(add.unwrap_or_default());
        for arch in remove.unwrap_or_default() {
            if !arches.remove(&arch) {
                reader.error(
                    "remove_arches",
                    format!("Arch '{arch}' is not present in the variant."),
                );
            }
        }
        reader.finish()?;
    }

    if arches.is_empty() {
        return Err(FieldErrors::single("arches", "Variant must have at least one arch.").into());
    }

    match (release_id, variant_id, variant_uid, variant_name, variant_type) {
        (Some(release_id), Some(variant_id), Some(variant_uid), Some(variant_name), Some(variant_type)) => {
            Ok(VariantInput {
                release_id,
                variant_id,
                variant_uid,
                variant_name,
                variant_type,
                arches,
            })
        }
        _ => Err(PdcError::Internal(anyhow::anyhow!(
            "variant fields missing without a recorded error"
        ))),
    }
}

/// Resolve release and arch names, collecting every failure.
async fn resolve(
    tx: &mut dyn CatalogTx,
    input: &VariantInput,
) -> Result<(VariantFields, Vec<Arch>)> {
    let mut errors = FieldErrors::new();
    let release = tx.find_release(&input.release_id).await?;
    if release.is_none() {
        errors.add(
            "release",
            format!("Object with release_id={} does not exist.", input.release_id),
        );
    }
    let mut arches = Vec::with_capacity(input.arches.len());
    for name in &input.arches {
        match tx.find_arch(name).await? {
            Some(arch) => arches.push(arch),
            None => errors.add("arches", format!("Arch '{name}' does not exist.")),
        }
    }
    errors.into_result()?;

    let release_pk = release.map(|r| r.pk).unwrap_or_default();
    Ok((
        VariantFields {
            release_pk,
            variant_id: input.variant_id.clone(),
            variant_uid: input.variant_uid.clone(),
            variant_name: input.variant_name.clone(),
            variant_type: input.variant_type,
        },
        arches,
    ))
}

async fn ensure_unique(tx: &mut dyn CatalogTx, input: &VariantInput, own_pk: Option<i64>) -> Result<()> {
    if let Some(existing) = tx.find_variant(&input.release_id, &input.variant_uid).await? {
        if Some(existing.pk) != own_pk {
            return Err(Conflict::Variant.error());
        }
    }
    Ok(())
}

async fn reload(tx: &mut dyn CatalogTx, release_id: &str, variant_uid: &str) -> Result<Variant> {
    tx.find_variant(release_id, variant_uid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("variant {release_id}/{variant_uid} vanished").into())
}

pub(crate) async fn create(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    body: &Value,
) -> Result<Variant> {
    let map = as_object(body)?;
    ensure_known_fields(map, FIELDS)?;
    let input = read_input(map, None)?;
    let (fields, arches) = resolve(tx, &input).await?;
    ensure_unique(tx, &input, None).await?;

    let variant = tx.insert_variant(&fields).await?;
    rec.created(&variant);
    for arch in &arches {
        let va = tx.insert_variant_arch(variant.pk, arch).await?;
        rec.created(&va);
    }
    reload(tx, &input.release_id, &input.variant_uid).await
}

pub(crate) async fn update(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    release_id: &str,
    variant_uid: &str,
    body: &Value,
    partial: bool,
) -> Result<Variant> {
    let current = tx
        .find_variant(release_id, variant_uid)
        .await?
        .ok_or_else(PdcError::not_found)?;
    let map = as_object(body)?;
    ensure_known_fields(map, if partial { PATCH_FIELDS } else { FIELDS })?;

    let input = if partial {
        let mut merged = match json!(current) {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        for (k, v) in map {
            if k != "add_arches" && k != "remove_arches" {
                merged.insert(k.clone(), v.clone());
            }
        }
        read_input(&merged, Some(map))?
    } else {
        read_input(map, None)?
    };
    let (fields, arches) = resolve(tx, &input).await?;
    ensure_unique(tx, &input, Some(current.pk)).await?;

    // Check every removal before touching anything.
    let existing = tx.list_variant_arches(current.pk).await?;
    let mut removed = Vec::new();
    for va in existing.iter().filter(|va| !input.arches.contains(&va.arch)) {
        if tx.count_repos(va.pk).await? > 0 {
            return Err(FieldErrors::non_field(format!(
                "Can not remove arch {} from variant {}: it has repositories attached.",
                va.arch,
                current.key()
            ))
            .into());
        }
        removed.push(va.clone());
    }

    if fields != current.fields() {
        let updated = tx.update_variant(current.pk, &fields).await?;
        rec.updated(&current, &updated);
    }
    for va in &removed {
        tx.delete_variant_arch(va.pk).await?;
        rec.deleted(va);
    }
    for arch in arches
        .iter()
        .filter(|a| !existing.iter().any(|va| va.arch_pk == a.pk))
    {
        let va = tx.insert_variant_arch(current.pk, arch).await?;
        rec.created(&va);
    }
    reload(tx, &input.release_id, &input.variant_uid).await
}

pub(crate) async fn delete(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    release_id: &str,
    variant_uid: &str,
) -> Result<()> {
    let current = tx
        .find_variant(release_id, variant_uid)
        .await?
        .ok_or_else(PdcError::not_found)?;
    let arches = tx.list_variant_arches(current.pk).await?;
    for va in &arches {
        if tx.count_repos(va.pk).await? > 0 {
            return Err(PdcError::InvalidInput(format!(
                "Variant {} has repositories attached and can not be deleted.",
                current.key()
            )));
        }
    }
    for va in &arches {
        tx.delete_variant_arch(va.pk).await?;
        rec.deleted(va);
    }
    tx.delete_variant(current.pk).await?;
    rec.deleted(&current);
    Ok(())
}

/// Split a `{release_id}/{variant_uid}` key.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('/')
        .filter(|(release, uid)| !release.is_empty() && !uid.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(source: Value, edits: Option<Value>) -> Result<VariantInput> {
        let edits = edits.map(|e| e.as_object().unwrap().clone());
        read_input(source.as_object().unwrap(), edits.as_ref())
    }

    fn base() -> Value {
        json!({
            "release": "release-1.0", "id": "Server", "uid": "Server-UID",
            "name": "Server name", "type": "variant", "arches": ["ppc64", "x86_64"]
        })
    }

    #[test]
    fn add_and_remove_edit_the_set() {
        let input = read(
            base(),
            Some(json!({ "add_arches": ["ia64"], "remove_arches": ["ppc64"] })),
        )
        .unwrap();
        let arches: Vec<&str> = input.arches.iter().map(String::as_str).collect();
        assert_eq!(arches, vec!["ia64", "x86_64"]);
    }

    #[test]
    fn removing_absent_arch_fails() {
        let err = read(base(), Some(json!({ "remove_arches": ["s390x"] })))
            .err()
            .unwrap();
        assert!(err.body().get("remove_arches").is_some());
    }

    #[test]
    fn arches_and_edits_are_exclusive() {
        let err = read(
            base(),
            Some(json!({ "arches": ["x86_64"], "add_arches": ["ia64"] })),
        )
        .err()
        .unwrap();
        assert!(err.body().get("non_field_errors").is_some());
    }

    #[test]
    fn empty_arch_set_fails() {
        let err = read(base(), Some(json!({ "remove_arches": ["ppc64", "x86_64"] })))
            .err()
            .unwrap();
        assert_eq!(
            err.body(),
            json!({ "arches": ["Variant must have at least one arch."] })
        );
    }

    #[test]
    fn split_variant_key() {
        assert_eq!(
            split_key("release-1.0/Server-UID"),
            Some(("release-1.0", "Server-UID"))
        );
        assert_eq!(split_key("release-1.0"), None);
        assert_eq!(split_key("/Server"), None);
    }
}
