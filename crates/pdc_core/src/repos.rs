//! Repo validation chain and writes.
//!
//! Checks run in a fixed order and the first failing stage wins:
//! unknown fields, per-field conversion, VariantArch resolution, name rules,
//! then uniqueness.

use serde_json::{Map, Value};

use crate::changes::ChangeRecorder;
use crate::error::{Conflict, FieldErrors, PdcError};
use crate::lookups::{ContentCategory, ContentFormat, RepoFamily, Service};
use crate::ports::{CatalogTx, Result};
use crate::types::{Repo, RepoFields};
use crate::validate::{as_object, ensure_known_fields, FieldReader};

/// `id` is read-only and ignored on input.
const FIELDS: &[&str] = &[
    "id",
    "release_id",
    "variant_uid",
    "arch",
    "service",
    "repo_family",
    "content_format",
    "content_category",
    "name",
    "shadow",
    "product_id",
];

struct RepoInput {
    release_id: String,
    variant_uid: String,
    arch: String,
    service: Service,
    repo_family: RepoFamily,
    content_format: ContentFormat,
    content_category: ContentCategory,
    name: String,
    shadow: bool,
    product_id: Option<i64>,
}

/// `product_id` falls back to `current_product_id` when absent.
fn read_input(map: &Map<String, Value>, current_product_id: Option<i64>) -> Result<RepoInput> {
    let mut reader = FieldReader::over(map);
    let release_id = reader.string("release_id");
    let variant_uid = reader.string("variant_uid");
    let arch = reader.string("arch");
    let service = reader.choice::<Service>("service");
    let repo_family = reader.choice::<RepoFamily>("repo_family");
    let content_format = reader.choice::<ContentFormat>("content_format");
    let content_category = reader.choice::<ContentCategory>("content_category");
    let name = reader.string("name");
    let shadow = reader.boolean_or("shadow", false);
    let product_id = reader.nullable_integer("product_id");
    reader.finish()?;

    match (
        release_id,
        variant_uid,
        arch,
        service,
        repo_family,
        content_format,
        content_category,
        name,
    ) {
        (
            Some(release_id),
            Some(variant_uid),
            Some(arch),
            Some(service),
            Some(repo_family),
            Some(content_format),
            Some(content_category),
            Some(name),
        ) => Ok(RepoInput {
            release_id,
            variant_uid,
            arch,
            service,
            repo_family,
            content_format,
            content_category,
            name,
            shadow,
            product_id: product_id.unwrap_or(current_product_id),
        }),
        _ => Err(PdcError::Internal(anyhow::anyhow!(
            "repo fields missing without a recorded error"
        ))),
    }
}

fn check_name(category: ContentCategory, name: &str) -> Result<()> {
    let message = match category {
        ContentCategory::Debug if !name.contains("debug") => {
            format!("Missing 'debug' in repo name '{name}'")
        }
        ContentCategory::Binary | ContentCategory::Source if name.contains("debug") => {
            format!("Only 'debug' repositories can have 'debug' in name '{name}'")
        }
        ContentCategory::Source if !name.contains("source") => {
            format!("Missing 'source' in repo name '{name}'")
        }
        _ => return Ok(()),
    };
    Err(FieldErrors::non_field(message).into())
}

/// Run resolution, name and uniqueness checks; `own_id` is the repo being
/// updated, which may keep its own key.
async fn validate(
    tx: &mut dyn CatalogTx,
    input: RepoInput,
    own_id: Option<i64>,
) -> Result<RepoFields> {
    let variant_arch = tx
        .find_variant_arch(&input.release_id, &input.variant_uid, &input.arch)
        .await?
        .ok_or_else(|| {
            PdcError::from(FieldErrors::non_field(format!(
                "No VariantArch for release_id={}, variant_uid={}, arch={}",
                input.release_id, input.variant_uid, input.arch
            )))
        })?;

    check_name(input.content_category, &input.name)?;

    let fields = RepoFields {
        variant_arch_pk: variant_arch.pk,
        service: input.service,
        repo_family: input.repo_family,
        content_format: input.content_format,
        content_category: input.content_category,
        name: input.name,
        shadow: input.shadow,
        product_id: input.product_id,
    };
    if let Some(existing) = tx.find_repo(&fields).await? {
        if Some(existing) != own_id {
            return Err(Conflict::Repo.error());
        }
    }
    Ok(fields)
}

/// Validate a wire-shaped object and insert it. Shared by create and clone.
pub(crate) async fn insert_checked(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    map: &Map<String, Value>,
) -> Result<Repo> {
    ensure_known_fields(map, FIELDS)?;
    let input = read_input(map, None)?;
    let fields = validate(tx, input, None).await?;
    let repo = tx.insert_repo(&fields).await?;
    rec.created(&repo);
    Ok(repo)
}

pub(crate) async fn create(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    body: &Value,
) -> Result<Repo> {
    let map = as_object(body)?;
    insert_checked(tx, rec, map).await
}

pub(crate) async fn update(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    id: i64,
    body: &Value,
    partial: bool,
) -> Result<Repo> {
    let current = tx.get_repo(id).await?.ok_or_else(PdcError::not_found)?;
    let map = as_object(body)?;
    ensure_known_fields(map, FIELDS)?;

    let input = if partial {
        let mut merged = current.writable_view();
        merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        read_input(&merged, current.product_id)?
    } else {
        read_input(map, current.product_id)?
    };
    let fields = validate(tx, input, Some(current.id)).await?;
    if fields == current.fields() {
        return Ok(current);
    }
    let updated = tx.update_repo(current.id, &fields).await?;
    rec.updated(&current, &updated);
    Ok(updated)
}

pub(crate) async fn delete(tx: &mut dyn CatalogTx, rec: &mut ChangeRecorder, id: i64) -> Result<()> {
    let current = tx.get_repo(id).await?.ok_or_else(PdcError::not_found)?;
    tx.delete_repo(current.id).await?;
    rec.deleted(&current);
    Ok(())
}
