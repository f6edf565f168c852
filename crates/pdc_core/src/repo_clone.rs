//! Copy repos from one release to another.
//!
//! Source repos are visited in id order. A repo whose variant/arch pair has
//! no VariantArch in the target release is skipped; every other copy goes
//! through the normal repo validation chain, and any failure aborts the
//! whole clone.

use serde_json::{Map, Value};
use tracing::debug;

use crate::changes::ChangeRecorder;
use crate::error::PdcError;
use crate::filter::RepoFilter;
use crate::ports::{CatalogTx, Result};
use crate::repos;
use crate::types::Repo;
use crate::validate::{as_object, display_value, ensure_known_fields, FieldReader};

const FIELDS: &[&str] = &[
    "release_id_from",
    "release_id_to",
    "include_service",
    "include_repo_family",
    "include_content_format",
    "include_content_category",
    "include_shadow",
    "include_product_id",
];

const LIST_FIELDS: &[&str] = &[
    "include_service",
    "include_repo_family",
    "include_content_format",
    "include_content_category",
];

/// Parsed clone request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneRequest {
    pub release_id_from: String,
    pub release_id_to: String,
    pub include_service: Option<Vec<String>>,
    pub include_repo_family: Option<Vec<String>>,
    pub include_content_format: Option<Vec<String>>,
    pub include_content_category: Option<Vec<String>>,
    pub include_shadow: Option<bool>,
    pub include_product_id: Option<i64>,
}

fn include_list(map: &Map<String, Value>, key: &str) -> Result<Option<Vec<String>>> {
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    let Some(items) = value.as_array() else {
        return Err(PdcError::InvalidInput(format!(
            "{key}: {value} is not a list"
        )));
    };
    Ok(Some(items.iter().map(display_value).collect()))
}

fn include_shadow(map: &Map<String, Value>) -> Result<Option<bool>> {
    match map.get("include_shadow") {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(other) => Err(PdcError::InvalidInput(format!(
            "include_shadow: {other} is not a boolean"
        ))),
    }
}

impl CloneRequest {
    pub fn parse(body: &Value) -> Result<Self> {
        let map = as_object(body)?;
        ensure_known_fields(map, FIELDS)?;

        let mut reader = FieldReader::over(map);
        let release_id_from = reader.string("release_id_from");
        let release_id_to = reader.string("release_id_to");
        let include_product_id = reader.nullable_integer("include_product_id");
        reader.finish()?;

        let mut lists = Vec::with_capacity(LIST_FIELDS.len());
        for key in LIST_FIELDS {
            lists.push(include_list(map, key)?);
        }
        let mut lists = lists.into_iter();

        Ok(Self {
            release_id_from: release_id_from.unwrap_or_default(),
            release_id_to: release_id_to.unwrap_or_default(),
            include_service: lists.next().flatten(),
            include_repo_family: lists.next().flatten(),
            include_content_format: lists.next().flatten(),
            include_content_category: lists.next().flatten(),
            include_shadow: include_shadow(map)?,
            include_product_id: include_product_id.flatten(),
        })
    }

    /// Whether a source repo passes every include filter.
    pub fn includes(&self, repo: &Repo) -> bool {
        fn allowed(list: &Option<Vec<String>>, value: &str) -> bool {
            list.as_ref().map_or(true, |l| l.iter().any(|v| v == value))
        }
        allowed(&self.include_service, repo.service.as_ref())
            && allowed(&self.include_repo_family, repo.repo_family.as_ref())
            && allowed(&self.include_content_format, repo.content_format.as_ref())
            && allowed(&self.include_content_category, repo.content_category.as_ref())
            && self.include_shadow.map_or(true, |s| s == repo.shadow)
            && self
                .include_product_id
                .map_or(true, |p| repo.product_id == Some(p))
    }
}

pub(crate) async fn clone_repos(
    tx: &mut dyn CatalogTx,
    rec: &mut ChangeRecorder,
    request: &CloneRequest,
) -> Result<Vec<Repo>> {
    tx.find_release(&request.release_id_from)
        .await?
        .ok_or_else(PdcError::not_found)?;
    tx.find_release(&request.release_id_to)
        .await?
        .ok_or_else(PdcError::not_found)?;

    let sources = tx
        .list_repos(&RepoFilter::for_release(&request.release_id_from), None)
        .await?
        .items;
    let mut created = Vec::new();
    for repo in sources.iter().filter(|r| request.includes(r)) {
        let target = tx
            .find_variant_arch(&request.release_id_to, &repo.variant_uid, &repo.arch)
            .await?;
        if target.is_none() {
            debug!(
                repo = repo.id,
                variant_uid = %repo.variant_uid,
                arch = %repo.arch,
                "no matching variant arch in target release, skipping"
            );
            continue;
        }
        let mut copy = repo.writable_view();
        copy.insert(
            "release_id".into(),
            Value::String(request.release_id_to.clone()),
        );
        created.push(repos::insert_checked(tx, rec, &copy).await?);
    }
    Ok(created)
}
