//! The central domain service of the catalog.
//!
//! Holds the storage port via `Arc<dyn CatalogStore>` so the same logic runs
//! against Postgres or the in-memory store. Every call runs in one
//! transaction; writes collect their changes in a [`ChangeRecorder`] and
//! store them as one changeset right before commit.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{
    changes::ChangeRecorder,
    error::{Conflict, PdcError},
    filter::{ChangesetFilter, NameFilter, ReleaseFilter, RepoFilter, VariantFilter},
    page::{Page, Paged},
    ports::{CatalogStore, CatalogTx, Result},
    principal::Principal,
    releases,
    repo_clone::{self, CloneRequest},
    repos, variants,
    types::*,
    validate::FieldReader,
};

/// Who is writing and why; becomes the changeset author and comment.
#[derive(Debug, Clone)]
pub struct WriteContext {
    pub principal: Principal,
    pub comment: Option<String>,
}

impl WriteContext {
    pub fn new(principal: Principal, comment: Option<String>) -> Self {
        Self { principal, comment }
    }
}

// ── CatalogService trait ──────────────────────────────────────

/// All methods that change data take a [`WriteContext`]; reads are anonymous.
///
/// `partial` selects PATCH semantics: the body is merged onto the current
/// wire shape before validation. List calls return one [`Page`] window and
/// the count of all matches; `None` returns everything.
#[async_trait]
pub trait CatalogService: Send + Sync {
    // Arches
    async fn list_arches(&self, filter: NameFilter, page: Option<Page>) -> Result<Paged<Arch>>;
    async fn create_arch(&self, ctx: &WriteContext, body: Value) -> Result<Arch>;

    // Releases
    async fn list_releases(
        &self,
        filter: ReleaseFilter,
        page: Option<Page>,
    ) -> Result<Paged<Release>>;
    async fn get_release(&self, release_id: &str) -> Result<Release>;
    async fn create_release(&self, ctx: &WriteContext, body: Value) -> Result<Release>;
    async fn create_releases(&self, ctx: &WriteContext, items: Vec<Value>) -> Result<Vec<Release>>;
    async fn update_release(
        &self,
        ctx: &WriteContext,
        release_id: &str,
        body: Value,
        partial: bool,
    ) -> Result<Release>;

    // Variants
    async fn list_variants(
        &self,
        filter: VariantFilter,
        page: Option<Page>,
    ) -> Result<Paged<Variant>>;
    async fn get_variant(&self, release_id: &str, variant_uid: &str) -> Result<Variant>;
    async fn create_variant(&self, ctx: &WriteContext, body: Value) -> Result<Variant>;
    async fn create_variants(&self, ctx: &WriteContext, items: Vec<Value>) -> Result<Vec<Variant>>;
    async fn update_variant(
        &self,
        ctx: &WriteContext,
        release_id: &str,
        variant_uid: &str,
        body: Value,
        partial: bool,
    ) -> Result<Variant>;
    async fn delete_variant(&self, ctx: &WriteContext, release_id: &str, variant_uid: &str)
        -> Result<()>;
    /// Delete by `{release_id}/{variant_uid}` keys, all or nothing.
    async fn delete_variants(&self, ctx: &WriteContext, keys: Vec<Value>) -> Result<()>;

    // Repos
    async fn list_repos(&self, filter: RepoFilter, page: Option<Page>) -> Result<Paged<Repo>>;
    async fn get_repo(&self, id: i64) -> Result<Repo>;
    async fn create_repo(&self, ctx: &WriteContext, body: Value) -> Result<Repo>;
    async fn create_repos(&self, ctx: &WriteContext, items: Vec<Value>) -> Result<Vec<Repo>>;
    async fn update_repo(
        &self,
        ctx: &WriteContext,
        id: i64,
        body: Value,
        partial: bool,
    ) -> Result<Repo>;
    async fn delete_repo(&self, ctx: &WriteContext, id: i64) -> Result<()>;
    /// Delete by ids, all or nothing.
    async fn delete_repos(&self, ctx: &WriteContext, ids: Vec<Value>) -> Result<()>;
    async fn clone_repos(&self, ctx: &WriteContext, body: Value) -> Result<Vec<Repo>>;

    // Changesets
    async fn list_changesets(
        &self,
        filter: ChangesetFilter,
        page: Option<Page>,
    ) -> Result<Paged<Changeset>>;
    async fn get_changeset(&self, id: i64) -> Result<Changeset>;
}

// ── CatalogServiceImpl ────────────────────────────────────────

pub struct CatalogServiceImpl {
    pub store: Arc<dyn CatalogStore>,
}

impl CatalogServiceImpl {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Store the collected changes, if any, and commit.
    async fn finish(
        &self,
        mut tx: Box<dyn CatalogTx>,
        rec: ChangeRecorder,
        ctx: &WriteContext,
    ) -> Result<()> {
        let count = rec.len();
        if let Some(changeset) =
            rec.into_changeset(&ctx.principal.actor_id, ctx.comment.as_deref())
        {
            let id = tx.insert_changeset(&changeset).await?;
            debug!(
                changeset = id,
                author = %ctx.principal.actor_id,
                changes = count,
                "changeset recorded"
            );
        }
        tx.commit().await
    }
}

fn not_found_in_bulk(index: usize, item: &Value) -> PdcError {
    PdcError::not_found().in_bulk(index, item.clone())
}

#[async_trait]
impl CatalogService for CatalogServiceImpl {
    // ── Arches ─────────────────────────────────────────────────

    async fn list_arches(&self, filter: NameFilter, page: Option<Page>) -> Result<Paged<Arch>> {
        let mut tx = self.store.begin().await?;
        tx.list_arches(&filter, page).await
    }

    async fn create_arch(&self, ctx: &WriteContext, body: Value) -> Result<Arch> {
        let mut reader = FieldReader::new(&body, &["name"])?;
        let name = reader.string("name");
        reader.finish()?;
        let name = name.unwrap_or_default();

        let mut tx = self.store.begin().await?;
        if tx.find_arch(&name).await?.is_some() {
            return Err(Conflict::Arch.error());
        }
        let mut rec = ChangeRecorder::new();
        let arch = tx.insert_arch(&name).await?;
        rec.created(&arch);
        self.finish(tx, rec, ctx).await?;
        Ok(arch)
    }

    // ── Releases ───────────────────────────────────────────────

    async fn list_releases(
        &self,
        filter: ReleaseFilter,
        page: Option<Page>,
    ) -> Result<Paged<Release>> {
        let mut tx = self.store.begin().await?;
        tx.list_releases(&filter, page).await
    }

    async fn get_release(&self, release_id: &str) -> Result<Release> {
        let mut tx = self.store.begin().await?;
        tx.find_release(release_id)
            .await?
            .ok_or_else(PdcError::not_found)
    }

    async fn create_release(&self, ctx: &WriteContext, body: Value) -> Result<Release> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let release = releases::create(tx.as_mut(), &mut rec, &body).await?;
        self.finish(tx, rec, ctx).await?;
        Ok(release)
    }

    async fn create_releases(&self, ctx: &WriteContext, items: Vec<Value>) -> Result<Vec<Release>> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let mut created = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let release = releases::create(tx.as_mut(), &mut rec, item)
                .await
                .map_err(|e| e.in_bulk(index, item.clone()))?;
            created.push(release);
        }
        self.finish(tx, rec, ctx).await?;
        Ok(created)
    }

    async fn update_release(
        &self,
        ctx: &WriteContext,
        release_id: &str,
        body: Value,
        partial: bool,
    ) -> Result<Release> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let release = releases::update(tx.as_mut(), &mut rec, release_id, &body, partial).await?;
        self.finish(tx, rec, ctx).await?;
        Ok(release)
    }

    // ── Variants ───────────────────────────────────────────────

    async fn list_variants(
        &self,
        filter: VariantFilter,
        page: Option<Page>,
    ) -> Result<Paged<Variant>> {
        let mut tx = self.store.begin().await?;
        tx.list_variants(&filter, page).await
    }

    async fn get_variant(&self, release_id: &str, variant_uid: &str) -> Result<Variant> {
        let mut tx = self.store.begin().await?;
        tx.find_variant(release_id, variant_uid)
            .await?
            .ok_or_else(PdcError::not_found)
    }

    async fn create_variant(&self, ctx: &WriteContext, body: Value) -> Result<Variant> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let variant = variants::create(tx.as_mut(), &mut rec, &body).await?;
        self.finish(tx, rec, ctx).await?;
        Ok(variant)
    }

    async fn create_variants(&self, ctx: &WriteContext, items: Vec<Value>) -> Result<Vec<Variant>> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let mut created = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let variant = variants::create(tx.as_mut(), &mut rec, item)
                .await
                .map_err(|e| e.in_bulk(index, item.clone()))?;
            created.push(variant);
        }
        self.finish(tx, rec, ctx).await?;
        Ok(created)
    }

    async fn update_variant(
        &self,
        ctx: &WriteContext,
        release_id: &str,
        variant_uid: &str,
        body: Value,
        partial: bool,
    ) -> Result<Variant> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let variant =
            variants::update(tx.as_mut(), &mut rec, release_id, variant_uid, &body, partial)
                .await?;
        self.finish(tx, rec, ctx).await?;
        Ok(variant)
    }

    async fn delete_variant(
        &self,
        ctx: &WriteContext,
        release_id: &str,
        variant_uid: &str,
    ) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        variants::delete(tx.as_mut(), &mut rec, release_id, variant_uid).await?;
        self.finish(tx, rec, ctx).await
    }

    async fn delete_variants(&self, ctx: &WriteContext, keys: Vec<Value>) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        for (index, item) in keys.iter().enumerate() {
            let (release_id, variant_uid) = item
                .as_str()
                .and_then(variants::split_key)
                .ok_or_else(|| not_found_in_bulk(index, item))?;
            variants::delete(tx.as_mut(), &mut rec, release_id, variant_uid)
                .await
                .map_err(|e| e.in_bulk(index, item.clone()))?;
        }
        self.finish(tx, rec, ctx).await
    }

    // ── Repos ──────────────────────────────────────────────────

    async fn list_repos(&self, filter: RepoFilter, page: Option<Page>) -> Result<Paged<Repo>> {
        let mut tx = self.store.begin().await?;
        tx.list_repos(&filter, page).await
    }

    async fn get_repo(&self, id: i64) -> Result<Repo> {
        let mut tx = self.store.begin().await?;
        tx.get_repo(id).await?.ok_or_else(PdcError::not_found)
    }

    async fn create_repo(&self, ctx: &WriteContext, body: Value) -> Result<Repo> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let repo = repos::create(tx.as_mut(), &mut rec, &body).await?;
        self.finish(tx, rec, ctx).await?;
        Ok(repo)
    }

    async fn create_repos(&self, ctx: &WriteContext, items: Vec<Value>) -> Result<Vec<Repo>> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let mut created = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let repo = repos::create(tx.as_mut(), &mut rec, item)
                .await
                .map_err(|e| e.in_bulk(index, item.clone()))?;
            created.push(repo);
        }
        self.finish(tx, rec, ctx).await?;
        Ok(created)
    }

    async fn update_repo(
        &self,
        ctx: &WriteContext,
        id: i64,
        body: Value,
        partial: bool,
    ) -> Result<Repo> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let repo = repos::update(tx.as_mut(), &mut rec, id, &body, partial).await?;
        self.finish(tx, rec, ctx).await?;
        Ok(repo)
    }

    async fn delete_repo(&self, ctx: &WriteContext, id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        repos::delete(tx.as_mut(), &mut rec, id).await?;
        self.finish(tx, rec, ctx).await
    }

    async fn delete_repos(&self, ctx: &WriteContext, ids: Vec<Value>) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        for (index, item) in ids.iter().enumerate() {
            let id = item
                .as_i64()
                .ok_or_else(|| not_found_in_bulk(index, item))?;
            repos::delete(tx.as_mut(), &mut rec, id)
                .await
                .map_err(|e| e.in_bulk(index, item.clone()))?;
        }
        self.finish(tx, rec, ctx).await
    }

    async fn clone_repos(&self, ctx: &WriteContext, body: Value) -> Result<Vec<Repo>> {
        let request = CloneRequest::parse(&body)?;
        let mut tx = self.store.begin().await?;
        let mut rec = ChangeRecorder::new();
        let created = repo_clone::clone_repos(tx.as_mut(), &mut rec, &request).await?;
        self.finish(tx, rec, ctx).await?;
        Ok(created)
    }

    // ── Changesets ─────────────────────────────────────────────

    async fn list_changesets(
        &self,
        filter: ChangesetFilter,
        page: Option<Page>,
    ) -> Result<Paged<Changeset>> {
        let mut tx = self.store.begin().await?;
        tx.list_changesets(&filter, page).await
    }

    async fn get_changeset(&self, id: i64) -> Result<Changeset> {
        let mut tx = self.store.begin().await?;
        tx.get_changeset(id).await?.ok_or_else(PdcError::not_found)
    }
}
