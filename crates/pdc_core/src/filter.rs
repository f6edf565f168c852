//! List filters built from strict query parameters.
//!
//! Multiple values of one parameter are OR-ed, different parameters AND-ed.
//! Unknown parameters are rejected before any filter is built.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::PdcError;
use crate::types::{Arch, Changeset, Release, Repo, Variant};

/// Parameters accepted by every list endpoint.
pub const PAGINATION_PARAMS: &[&str] = &["page", "page_size", "format"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Raw `key=value` pairs of a query string, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Reject parameters outside `allowed` and the pagination parameters.
    pub fn ensure_known(&self, allowed: &[&str]) -> Result<(), PdcError> {
        let mut unknown: Vec<&str> = self
            .0
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| !allowed.contains(k) && !PAGINATION_PARAMS.contains(k))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        unknown.dedup();
        Err(PdcError::InvalidInput(format!(
            "Unknown query params: {}.",
            unknown.join(", ")
        )))
    }

    fn bool_param(&self, key: &str) -> Result<Option<bool>, PdcError> {
        self.first(key)
            .map(|raw| {
                parse_bool_param(raw).ok_or_else(|| {
                    PdcError::InvalidInput(format!("{key}: \"{raw}\" is not a valid boolean"))
                })
            })
            .transpose()
    }

    fn int_params(&self, key: &str) -> Result<Vec<i64>, PdcError> {
        self.all(key)
            .into_iter()
            .map(|raw| {
                raw.parse::<i64>().map_err(|_| {
                    PdcError::InvalidInput(format!("{key}: \"{raw}\" is not a valid integer"))
                })
            })
            .collect()
    }

    fn datetime_param(&self, key: &str) -> Result<Option<DateTime<Utc>>, PdcError> {
        self.first(key)
            .map(|raw| {
                parse_datetime(raw).ok_or_else(|| {
                    PdcError::InvalidQuery(vec![format!(
                        "'{raw}' value has an invalid format. It must be in \
                         YYYY-MM-DD HH:MM[:ss[.uuuuuu]] format."
                    )])
                })
            })
            .transpose()
    }
}

fn parse_bool_param(raw: &str) -> Option<bool> {
    match raw {
        "true" | "True" | "1" => Some(true),
        "false" | "False" | "0" => Some(false),
        _ => None,
    }
}

/// Parse one of the accepted datetime inputs; naive values are taken as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn any_eq(wanted: &[String], value: &str) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| w == value)
}

// ── Name filter (arches, lookups) ─────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    pub name: Vec<String>,
    /// Substring, case-insensitive match instead of equality.
    pub contains: bool,
}

impl NameFilter {
    pub const PARAMS: &'static [&'static str] = &["name"];

    pub fn exact(params: &QueryParams) -> Result<Self, PdcError> {
        params.ensure_known(Self::PARAMS)?;
        Ok(Self {
            name: params.all("name"),
            contains: false,
        })
    }

    pub fn icontains(params: &QueryParams) -> Result<Self, PdcError> {
        params.ensure_known(Self::PARAMS)?;
        Ok(Self {
            name: params.all("name"),
            contains: true,
        })
    }

    pub fn matches_name(&self, value: &str) -> bool {
        if !self.contains {
            return any_eq(&self.name, value);
        }
        let value = value.to_lowercase();
        self.name.is_empty()
            || self
                .name
                .iter()
                .any(|n| value.contains(&n.to_lowercase()))
    }

    pub fn matches(&self, arch: &Arch) -> bool {
        self.matches_name(&arch.name)
    }
}

// ── Releases ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ReleaseFilter {
    pub release_id: Vec<String>,
    pub short: Vec<String>,
    pub version: Vec<String>,
    pub name: Vec<String>,
    pub release_type: Vec<String>,
    pub base_product: Vec<String>,
    pub active: Option<bool>,
}

impl ReleaseFilter {
    pub const PARAMS: &'static [&'static str] = &[
        "release_id",
        "short",
        "version",
        "name",
        "release_type",
        "base_product",
        "active",
    ];

    pub fn from_query(params: &QueryParams) -> Result<Self, PdcError> {
        params.ensure_known(Self::PARAMS)?;
        Ok(Self {
            release_id: params.all("release_id"),
            short: params.all("short"),
            version: params.all("version"),
            name: params.all("name"),
            release_type: params.all("release_type"),
            base_product: params.all("base_product"),
            active: params.bool_param("active")?,
        })
    }

    pub fn matches(&self, release: &Release) -> bool {
        any_eq(&self.release_id, &release.release_id)
            && any_eq(&self.short, &release.short)
            && any_eq(&self.version, &release.version)
            && any_eq(&self.name, &release.name)
            && any_eq(&self.release_type, release.release_type.as_ref())
            && (self.base_product.is_empty()
                || release
                    .base_product
                    .as_deref()
                    .map_or(false, |b| any_eq(&self.base_product, b)))
            && self.active.map_or(true, |a| a == release.active)
    }
}

// ── Variants ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct VariantFilter {
    pub release: Vec<String>,
    pub variant_id: Vec<String>,
    pub variant_uid: Vec<String>,
    pub variant_name: Vec<String>,
    pub variant_type: Vec<String>,
    pub arch: Vec<String>,
}

impl VariantFilter {
    pub const PARAMS: &'static [&'static str] = &["release", "id", "uid", "name", "type", "arch"];

    pub fn from_query(params: &QueryParams) -> Result<Self, PdcError> {
        params.ensure_known(Self::PARAMS)?;
        Ok(Self {
            release: params.all("release"),
            variant_id: params.all("id"),
            variant_uid: params.all("uid"),
            variant_name: params.all("name"),
            variant_type: params.all("type"),
            arch: params.all("arch"),
        })
    }

    pub fn matches(&self, variant: &Variant) -> bool {
        any_eq(&self.release, &variant.release_id)
            && any_eq(&self.variant_id, &variant.variant_id)
            && any_eq(&self.variant_uid, &variant.variant_uid)
            && any_eq(&self.variant_name, &variant.variant_name)
            && any_eq(&self.variant_type, variant.variant_type.as_ref())
            && (self.arch.is_empty() || variant.arches.iter().any(|a| self.arch.contains(a)))
    }
}

// ── Repos ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RepoFilter {
    pub release_id: Vec<String>,
    pub variant_uid: Vec<String>,
    pub arch: Vec<String>,
    pub service: Vec<String>,
    pub repo_family: Vec<String>,
    pub content_format: Vec<String>,
    pub content_category: Vec<String>,
    pub name: Vec<String>,
    pub shadow: Option<bool>,
    pub product_id: Vec<i64>,
}

impl RepoFilter {
    pub const PARAMS: &'static [&'static str] = &[
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

    pub fn from_query(params: &QueryParams) -> Result<Self, PdcError> {
        params.ensure_known(Self::PARAMS)?;
        Ok(Self {
            release_id: params.all("release_id"),
            variant_uid: params.all("variant_uid"),
            arch: params.all("arch"),
            service: params.all("service"),
            repo_family: params.all("repo_family"),
            content_format: params.all("content_format"),
            content_category: params.all("content_category"),
            name: params.all("name"),
            shadow: params.bool_param("shadow")?,
            product_id: params.int_params("product_id")?,
        })
    }

    /// All repos of one release.
    pub fn for_release(release_id: &str) -> Self {
        Self {
            release_id: vec![release_id.to_string()],
            ..Self::default()
        }
    }

    pub fn matches(&self, repo: &Repo) -> bool {
        any_eq(&self.release_id, &repo.release_id)
            && any_eq(&self.variant_uid, &repo.variant_uid)
            && any_eq(&self.arch, &repo.arch)
            && any_eq(&self.service, repo.service.as_ref())
            && any_eq(&self.repo_family, repo.repo_family.as_ref())
            && any_eq(&self.content_format, repo.content_format.as_ref())
            && any_eq(&self.content_category, repo.content_category.as_ref())
            && any_eq(&self.name, &repo.name)
            && self.shadow.map_or(true, |s| s == repo.shadow)
            && (self.product_id.is_empty()
                || repo
                    .product_id
                    .map_or(false, |p| self.product_id.contains(&p)))
    }
}

// ── Changesets ────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ChangesetFilter {
    pub author: Vec<String>,
    pub resource: Vec<String>,
    pub changed_since: Option<DateTime<Utc>>,
    pub changed_until: Option<DateTime<Utc>>,
}

impl ChangesetFilter {
    pub const PARAMS: &'static [&'static str] =
        &["author", "resource", "changed_since", "changed_until"];

    pub fn from_query(params: &QueryParams) -> Result<Self, PdcError> {
        params.ensure_known(Self::PARAMS)?;
        Ok(Self {
            author: params.all("author"),
            resource: params.all("resource"),
            changed_since: params.datetime_param("changed_since")?,
            changed_until: params.datetime_param("changed_until")?,
        })
    }

    pub fn matches(&self, changeset: &Changeset) -> bool {
        any_eq(&self.author, &changeset.author)
            && (self.resource.is_empty()
                || changeset
                    .changes
                    .iter()
                    .any(|c| self.resource.contains(&c.resource)))
            && self
                .changed_since
                .map_or(true, |since| changeset.committed_on >= since)
            && self
                .changed_until
                .map_or(true, |until| changeset.committed_on <= until)
    }
}
