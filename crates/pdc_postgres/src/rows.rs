//! sqlx row shapes and their conversion into core types.
//!
//! Lookup columns are stored as their wire names and parsed back here.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use pdc_core::types::{Arch, Change, Release, Repo, Variant, VariantArch};

fn parse<T: FromStr>(column: &str, raw: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("unexpected {column} value '{raw}' in database"))
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgArchRow {
    pub id: i64,
    pub name: String,
}

impl From<PgArchRow> for Arch {
    fn from(r: PgArchRow) -> Self {
        Arch {
            pk: r.id,
            name: r.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgReleaseRow {
    pub id: i64,
    pub release_id: String,
    pub short: String,
    pub version: String,
    pub name: String,
    pub release_type: String,
    pub base_product: Option<String>,
    pub active: bool,
}

impl TryFrom<PgReleaseRow> for Release {
    type Error = String;

    fn try_from(r: PgReleaseRow) -> Result<Self, Self::Error> {
        Ok(Release {
            pk: r.id,
            release_type: parse("release_type", &r.release_type)?,
            release_id: r.release_id,
            short: r.short,
            version: r.version,
            name: r.name,
            base_product: r.base_product,
            active: r.active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgVariantRow {
    pub id: i64,
    pub release_pk: i64,
    pub release_id: String,
    pub variant_id: String,
    pub variant_uid: String,
    pub variant_name: String,
    pub variant_type: String,
    pub arches: Vec<String>,
}

impl TryFrom<PgVariantRow> for Variant {
    type Error = String;

    fn try_from(r: PgVariantRow) -> Result<Self, Self::Error> {
        Ok(Variant {
            pk: r.id,
            release_pk: r.release_pk,
            variant_type: parse("variant_type", &r.variant_type)?,
            release_id: r.release_id,
            variant_id: r.variant_id,
            variant_uid: r.variant_uid,
            variant_name: r.variant_name,
            arches: r.arches,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgVariantArchRow {
    pub id: i64,
    pub variant_pk: i64,
    pub arch_pk: i64,
    pub arch: String,
    pub variant_key: String,
}

impl From<PgVariantArchRow> for VariantArch {
    fn from(r: PgVariantArchRow) -> Self {
        VariantArch {
            pk: r.id,
            variant_pk: r.variant_pk,
            arch_pk: r.arch_pk,
            arch: r.arch,
            variant_key: r.variant_key,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgRepoRow {
    pub id: i64,
    pub variant_arch_pk: i64,
    pub release_id: String,
    pub variant_uid: String,
    pub arch: String,
    pub service: String,
    pub repo_family: String,
    pub content_format: String,
    pub content_category: String,
    pub name: String,
    pub shadow: bool,
    pub product_id: Option<i64>,
}

impl TryFrom<PgRepoRow> for Repo {
    type Error = String;

    fn try_from(r: PgRepoRow) -> Result<Self, Self::Error> {
        Ok(Repo {
            id: r.id,
            variant_arch_pk: r.variant_arch_pk,
            service: parse("service", &r.service)?,
            repo_family: parse("repo_family", &r.repo_family)?,
            content_format: parse("content_format", &r.content_format)?,
            content_category: parse("content_category", &r.content_category)?,
            release_id: r.release_id,
            variant_uid: r.variant_uid,
            arch: r.arch,
            name: r.name,
            shadow: r.shadow,
            product_id: r.product_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgChangesetRow {
    pub id: i64,
    pub author: String,
    pub committed_on: DateTime<Utc>,
    pub comment: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgChangeRow {
    pub changeset_pk: i64,
    pub resource: String,
    pub resource_id: i64,
    pub old_value: String,
    pub new_value: String,
}

impl From<PgChangeRow> for Change {
    fn from(r: PgChangeRow) -> Self {
        Change {
            resource: r.resource,
            resource_id: r.resource_id,
            old_value: r.old_value,
            new_value: r.new_value,
        }
    }
}
