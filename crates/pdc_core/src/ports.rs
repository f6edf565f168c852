//! Storage port traits.
//! Implemented by `pdc_postgres` and [`crate::memory::MemoryStore`]; the catalog
//! service depends only on these traits.

use async_trait::async_trait;

use crate::error::PdcError;
use crate::filter::{ChangesetFilter, NameFilter, ReleaseFilter, RepoFilter, VariantFilter};
use crate::page::{Page, Paged};
use crate::types::*;

pub type Result<T> = std::result::Result<T, PdcError>;

/// Entry point of a backend: every request runs inside one transaction.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>>;
}

/// One unit of work. Nothing is visible to other transactions until
/// [`CatalogTx::commit`]; dropping the transaction rolls it back.
///
/// Lists come back ordered by primary key, changesets newest first. A list
/// call with `Some(page)` returns only that window, `None` returns every
/// matching row; `count` is always the size of the whole filtered list.
#[async_trait]
pub trait CatalogTx: Send {
    // ── Arches ─────────────────────────────────────────────────

    async fn list_arches(
        &mut self,
        filter: &NameFilter,
        page: Option<Page>,
    ) -> Result<Paged<Arch>>;
    async fn find_arch(&mut self, name: &str) -> Result<Option<Arch>>;
    async fn insert_arch(&mut self, name: &str) -> Result<Arch>;

    // ── Releases ───────────────────────────────────────────────

    async fn list_releases(
        &mut self,
        filter: &ReleaseFilter,
        page: Option<Page>,
    ) -> Result<Paged<Release>>;
    async fn find_release(&mut self, release_id: &str) -> Result<Option<Release>>;
    async fn insert_release(&mut self, fields: &ReleaseFields) -> Result<Release>;
    async fn update_release(&mut self, pk: i64, fields: &ReleaseFields) -> Result<Release>;

    // ── Variants ───────────────────────────────────────────────

    async fn list_variants(
        &mut self,
        filter: &VariantFilter,
        page: Option<Page>,
    ) -> Result<Paged<Variant>>;
    async fn find_variant(&mut self, release_id: &str, variant_uid: &str)
        -> Result<Option<Variant>>;
    async fn insert_variant(&mut self, fields: &VariantFields) -> Result<Variant>;
    async fn update_variant(&mut self, pk: i64, fields: &VariantFields) -> Result<Variant>;
    /// Deletes the variant row only; callers remove its arches first.
    async fn delete_variant(&mut self, pk: i64) -> Result<()>;

    // ── Variant arches ─────────────────────────────────────────

    async fn list_variant_arches(&mut self, variant_pk: i64) -> Result<Vec<VariantArch>>;
    async fn find_variant_arch(
        &mut self,
        release_id: &str,
        variant_uid: &str,
        arch: &str,
    ) -> Result<Option<VariantArch>>;
    async fn insert_variant_arch(&mut self, variant_pk: i64, arch: &Arch) -> Result<VariantArch>;
    async fn delete_variant_arch(&mut self, pk: i64) -> Result<()>;

    // ── Repos ──────────────────────────────────────────────────

    async fn list_repos(
        &mut self,
        filter: &RepoFilter,
        page: Option<Page>,
    ) -> Result<Paged<Repo>>;
    async fn get_repo(&mut self, id: i64) -> Result<Option<Repo>>;
    /// Id of the repo holding the unique key of `fields`, if any.
    async fn find_repo(&mut self, fields: &RepoFields) -> Result<Option<i64>>;
    async fn insert_repo(&mut self, fields: &RepoFields) -> Result<Repo>;
    async fn update_repo(&mut self, id: i64, fields: &RepoFields) -> Result<Repo>;
    async fn delete_repo(&mut self, id: i64) -> Result<()>;
    async fn count_repos(&mut self, variant_arch_pk: i64) -> Result<i64>;

    // ── Changesets ─────────────────────────────────────────────

    async fn insert_changeset(&mut self, changeset: &NewChangeset) -> Result<i64>;
    async fn list_changesets(
        &mut self,
        filter: &ChangesetFilter,
        page: Option<Page>,
    ) -> Result<Paged<Changeset>>;
    async fn get_changeset(&mut self, id: i64) -> Result<Option<Changeset>>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
