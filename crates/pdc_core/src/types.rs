//! Core catalog rows. Pure value types, no DB dependencies.
//!
//! Serialization gives the REST wire shape; storage keys that are not part of
//! the wire shape are `#[serde(skip)]`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::changes::Tracked;
use crate::lookups::{ContentCategory, ContentFormat, ReleaseType, RepoFamily, Service, VariantType};

// ── Arch ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arch {
    #[serde(skip)]
    pub pk: i64,
    pub name: String,
}

impl Tracked for Arch {
    const RESOURCE: &'static str = "arch";

    fn resource_id(&self) -> i64 {
        self.pk
    }

    fn export(&self) -> Value {
        json!({ "name": self.name })
    }
}

// ── Release ───────────────────────────────────────────────────

/// Writable release attributes; `release_id` is derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFields {
    pub short: String,
    pub version: String,
    pub name: String,
    pub release_type: ReleaseType,
    pub base_product: Option<String>,
    pub active: bool,
}

impl ReleaseFields {
    /// `{short}-{version}[-{type}][@{base_product}]`, the type suffix omitted for GA.
    pub fn release_id(&self) -> String {
        let mut id = format!("{}-{}", self.short, self.version);
        if self.release_type != ReleaseType::Ga {
            id.push('-');
            id.push_str(self.release_type.as_ref());
        }
        if let Some(base) = &self.base_product {
            id.push('@');
            id.push_str(base);
        }
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    #[serde(skip)]
    pub pk: i64,
    pub release_id: String,
    pub short: String,
    pub version: String,
    pub name: String,
    pub release_type: ReleaseType,
    pub base_product: Option<String>,
    pub active: bool,
}

impl Release {
    pub fn from_fields(pk: i64, fields: &ReleaseFields) -> Self {
        Self {
            pk,
            release_id: fields.release_id(),
            short: fields.short.clone(),
            version: fields.version.clone(),
            name: fields.name.clone(),
            release_type: fields.release_type,
            base_product: fields.base_product.clone(),
            active: fields.active,
        }
    }

    pub fn fields(&self) -> ReleaseFields {
        ReleaseFields {
            short: self.short.clone(),
            version: self.version.clone(),
            name: self.name.clone(),
            release_type: self.release_type,
            base_product: self.base_product.clone(),
            active: self.active,
        }
    }
}

impl Tracked for Release {
    const RESOURCE: &'static str = "release";

    fn resource_id(&self) -> i64 {
        self.pk
    }

    fn export(&self) -> Value {
        json!(self)
    }
}

// ── Variant ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFields {
    pub release_pk: i64,
    pub variant_id: String,
    pub variant_uid: String,
    pub variant_name: String,
    pub variant_type: VariantType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    #[serde(skip)]
    pub pk: i64,
    #[serde(skip)]
    pub release_pk: i64,
    #[serde(rename = "release")]
    pub release_id: String,
    #[serde(rename = "id")]
    pub variant_id: String,
    #[serde(rename = "uid")]
    pub variant_uid: String,
    #[serde(rename = "name")]
    pub variant_name: String,
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    /// Arch names, sorted.
    pub arches: Vec<String>,
}

impl Variant {
    /// URL key, `{release_id}/{variant_uid}`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.release_id, self.variant_uid)
    }

    pub fn fields(&self) -> VariantFields {
        VariantFields {
            release_pk: self.release_pk,
            variant_id: self.variant_id.clone(),
            variant_uid: self.variant_uid.clone(),
            variant_name: self.variant_name.clone(),
            variant_type: self.variant_type,
        }
    }
}

impl Tracked for Variant {
    const RESOURCE: &'static str = "variant";

    fn resource_id(&self) -> i64 {
        self.pk
    }

    // Arches are tracked through their own VariantArch rows.
    fn export(&self) -> Value {
        json!({
            "release": self.release_id,
            "variant_id": self.variant_id,
            "variant_uid": self.variant_uid,
            "variant_name": self.variant_name,
            "variant_type": self.variant_type,
        })
    }
}

/// Link between a variant and one of its arches; repos hang off these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantArch {
    pub pk: i64,
    pub variant_pk: i64,
    pub arch_pk: i64,
    pub arch: String,
    /// Key of the owning variant, `{release_id}/{variant_uid}`.
    pub variant_key: String,
}

impl Tracked for VariantArch {
    const RESOURCE: &'static str = "variantarch";

    fn resource_id(&self) -> i64 {
        self.pk
    }

    fn export(&self) -> Value {
        json!({ "variant": self.variant_key, "arch": self.arch })
    }
}

// ── Repo ──────────────────────────────────────────────────────

/// Stored repo attributes; `(variant_arch_pk, service, repo_family,
/// content_format, content_category, name, shadow)` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFields {
    pub variant_arch_pk: i64,
    pub service: Service,
    pub repo_family: RepoFamily,
    pub content_format: ContentFormat,
    pub content_category: ContentCategory,
    pub name: String,
    pub shadow: bool,
    pub product_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repo {
    pub id: i64,
    #[serde(skip)]
    pub variant_arch_pk: i64,
    pub release_id: String,
    pub variant_uid: String,
    pub arch: String,
    pub service: Service,
    pub repo_family: RepoFamily,
    pub content_format: ContentFormat,
    pub content_category: ContentCategory,
    pub name: String,
    pub shadow: bool,
    pub product_id: Option<i64>,
}

impl Repo {
    pub fn fields(&self) -> RepoFields {
        RepoFields {
            variant_arch_pk: self.variant_arch_pk,
            service: self.service,
            repo_family: self.repo_family,
            content_format: self.content_format,
            content_category: self.content_category,
            name: self.name.clone(),
            shadow: self.shadow,
            product_id: self.product_id,
        }
    }

    /// Wire shape without `id`, the base a partial update is merged onto.
    pub fn writable_view(&self) -> serde_json::Map<String, Value> {
        let mut view = match json!(self) {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        view.remove("id");
        view
    }
}

impl Tracked for Repo {
    const RESOURCE: &'static str = "repo";

    fn resource_id(&self) -> i64 {
        self.id
    }

    fn export(&self) -> Value {
        json!(self)
    }
}

// ── Changeset ─────────────────────────────────────────────────

/// One row-level before/after record. Values are JSON exports encoded as
/// strings; `"null"` marks the missing side of a create or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub resource: String,
    pub resource_id: i64,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Changeset {
    pub id: i64,
    pub author: String,
    pub committed_on: DateTime<Utc>,
    pub comment: Option<String>,
    pub changes: Vec<Change>,
}

/// A changeset about to be written at commit time.
#[derive(Debug, Clone)]
pub struct NewChangeset {
    pub author: String,
    pub comment: Option<String>,
    pub committed_on: DateTime<Utc>,
    pub changes: Vec<Change>,
}
