//! In-memory catalog backend.
//!
//! A transaction holds the store lock for its whole lifetime. Reads see the
//! locked tables directly; the first write takes a private copy, commit swaps
//! that copy in and drop discards it.
//! Used by tests and by the server when no database is configured.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::filter::{ChangesetFilter, NameFilter, ReleaseFilter, RepoFilter, VariantFilter};
use crate::page::{Page, Paged};
use crate::ports::{CatalogStore, CatalogTx, Result};
use crate::seeds;
use crate::types::*;

#[derive(Debug, Clone, Default)]
struct Sequences {
    arch: i64,
    release: i64,
    variant: i64,
    variant_arch: i64,
    repo: i64,
    changeset: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone)]
struct VariantArchRow {
    variant_pk: i64,
    arch_pk: i64,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    seq: Sequences,
    arches: BTreeMap<i64, Arch>,
    releases: BTreeMap<i64, Release>,
    variants: BTreeMap<i64, VariantFields>,
    variant_arches: BTreeMap<i64, VariantArchRow>,
    repos: BTreeMap<i64, RepoFields>,
    changesets: BTreeMap<i64, Changeset>,
}

impl Tables {
    fn seeded() -> Self {
        let mut tables = Self::default();
        for name in seeds::ARCHES {
            let pk = next(&mut tables.seq.arch);
            tables.arches.insert(
                pk,
                Arch {
                    pk,
                    name: (*name).to_string(),
                },
            );
        }
        tables
    }

    fn release(&self, pk: i64) -> Result<&Release> {
        self.releases
            .get(&pk)
            .ok_or_else(|| anyhow!("dangling release reference {pk}").into())
    }

    fn variant(&self, pk: i64) -> Result<Variant> {
        let fields = self
            .variants
            .get(&pk)
            .ok_or_else(|| anyhow!("dangling variant reference {pk}"))?;
        let release = self.release(fields.release_pk)?;
        let mut arches: Vec<String> = self
            .variant_arches
            .values()
            .filter(|va| va.variant_pk == pk)
            .filter_map(|va| self.arches.get(&va.arch_pk).map(|a| a.name.clone()))
            .collect();
        arches.sort();
        Ok(Variant {
            pk,
            release_pk: fields.release_pk,
            release_id: release.release_id.clone(),
            variant_id: fields.variant_id.clone(),
            variant_uid: fields.variant_uid.clone(),
            variant_name: fields.variant_name.clone(),
            variant_type: fields.variant_type,
            arches,
        })
    }

    fn variant_arch(&self, pk: i64) -> Result<VariantArch> {
        let row = self
            .variant_arches
            .get(&pk)
            .ok_or_else(|| anyhow!("dangling variant arch reference {pk}"))?;
        let variant = self.variant(row.variant_pk)?;
        let arch = self
            .arches
            .get(&row.arch_pk)
            .ok_or_else(|| anyhow!("dangling arch reference {}", row.arch_pk))?;
        Ok(VariantArch {
            pk,
            variant_pk: row.variant_pk,
            arch_pk: row.arch_pk,
            arch: arch.name.clone(),
            variant_key: variant.key(),
        })
    }

    fn repo(&self, id: i64) -> Result<Repo> {
        let fields = self
            .repos
            .get(&id)
            .ok_or_else(|| anyhow!("dangling repo reference {id}"))?;
        let va = self.variant_arch(fields.variant_arch_pk)?;
        let variant = self.variant(va.variant_pk)?;
        Ok(Repo {
            id,
            variant_arch_pk: fields.variant_arch_pk,
            release_id: variant.release_id,
            variant_uid: variant.variant_uid,
            arch: va.arch,
            service: fields.service,
            repo_family: fields.repo_family,
            content_format: fields.content_format,
            content_category: fields.content_category,
            name: fields.name.clone(),
            shadow: fields.shadow,
            product_id: fields.product_id,
        })
    }
}

/// Process-local catalog, seeded with the reference arches.
#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::seeded())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        Ok(Box::new(MemoryTx { guard, work: None }))
    }
}

/// Reads go to the locked tables until the first write copies them.
struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Option<Tables>,
}

impl MemoryTx {
    fn tables(&self) -> &Tables {
        self.work.as_ref().unwrap_or(&*self.guard)
    }

    fn tables_mut(&mut self) -> &mut Tables {
        let guard = &self.guard;
        self.work.get_or_insert_with(|| Tables::clone(guard))
    }
}

#[async_trait]
impl CatalogTx for MemoryTx {
    async fn list_arches(
        &mut self,
        filter: &NameFilter,
        page: Option<Page>,
    ) -> Result<Paged<Arch>> {
        let arches = self
            .tables()
            .arches
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(Paged::slice(arches, page))
    }

    async fn find_arch(&mut self, name: &str) -> Result<Option<Arch>> {
        Ok(self.tables().arches.values().find(|a| a.name == name).cloned())
    }

    async fn insert_arch(&mut self, name: &str) -> Result<Arch> {
        let tables = self.tables_mut();
        let pk = next(&mut tables.seq.arch);
        let arch = Arch {
            pk,
            name: name.to_string(),
        };
        tables.arches.insert(pk, arch.clone());
        Ok(arch)
    }

    async fn list_releases(
        &mut self,
        filter: &ReleaseFilter,
        page: Option<Page>,
    ) -> Result<Paged<Release>> {
        let releases = self
            .tables()
            .releases
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(Paged::slice(releases, page))
    }

    async fn find_release(&mut self, release_id: &str) -> Result<Option<Release>> {
        Ok(self
            .tables()
            .releases
            .values()
            .find(|r| r.release_id == release_id)
            .cloned())
    }

    async fn insert_release(&mut self, fields: &ReleaseFields) -> Result<Release> {
        let tables = self.tables_mut();
        let pk = next(&mut tables.seq.release);
        let release = Release::from_fields(pk, fields);
        tables.releases.insert(pk, release.clone());
        Ok(release)
    }

    async fn update_release(&mut self, pk: i64, fields: &ReleaseFields) -> Result<Release> {
        let release = Release::from_fields(pk, fields);
        self.tables_mut().releases.insert(pk, release.clone());
        Ok(release)
    }

    async fn list_variants(
        &mut self,
        filter: &VariantFilter,
        page: Option<Page>,
    ) -> Result<Paged<Variant>> {
        let tables = self.tables();
        let mut out = Vec::new();
        for pk in tables.variants.keys() {
            let variant = tables.variant(*pk)?;
            if filter.matches(&variant) {
                out.push(variant);
            }
        }
        Ok(Paged::slice(out, page))
    }

    async fn find_variant(
        &mut self,
        release_id: &str,
        variant_uid: &str,
    ) -> Result<Option<Variant>> {
        let Some(release) = self.find_release(release_id).await? else {
            return Ok(None);
        };
        let tables = self.tables();
        let pk = tables
            .variants
            .iter()
            .find(|(_, v)| v.release_pk == release.pk && v.variant_uid == variant_uid)
            .map(|(pk, _)| *pk);
        pk.map(|pk| tables.variant(pk)).transpose()
    }

    async fn insert_variant(&mut self, fields: &VariantFields) -> Result<Variant> {
        let tables = self.tables_mut();
        let pk = next(&mut tables.seq.variant);
        tables.variants.insert(pk, fields.clone());
        tables.variant(pk)
    }

    async fn update_variant(&mut self, pk: i64, fields: &VariantFields) -> Result<Variant> {
        let tables = self.tables_mut();
        tables.variants.insert(pk, fields.clone());
        tables.variant(pk)
    }

    async fn delete_variant(&mut self, pk: i64) -> Result<()> {
        self.tables_mut().variants.remove(&pk);
        Ok(())
    }

    async fn list_variant_arches(&mut self, variant_pk: i64) -> Result<Vec<VariantArch>> {
        let tables = self.tables();
        tables
            .variant_arches
            .iter()
            .filter(|(_, va)| va.variant_pk == variant_pk)
            .map(|(pk, _)| tables.variant_arch(*pk))
            .collect()
    }

    async fn find_variant_arch(
        &mut self,
        release_id: &str,
        variant_uid: &str,
        arch: &str,
    ) -> Result<Option<VariantArch>> {
        let Some(variant) = self.find_variant(release_id, variant_uid).await? else {
            return Ok(None);
        };
        let arches = self.list_variant_arches(variant.pk).await?;
        Ok(arches.into_iter().find(|va| va.arch == arch))
    }

    async fn insert_variant_arch(&mut self, variant_pk: i64, arch: &Arch) -> Result<VariantArch> {
        let tables = self.tables_mut();
        let pk = next(&mut tables.seq.variant_arch);
        tables.variant_arches.insert(
            pk,
            VariantArchRow {
                variant_pk,
                arch_pk: arch.pk,
            },
        );
        tables.variant_arch(pk)
    }

    async fn delete_variant_arch(&mut self, pk: i64) -> Result<()> {
        self.tables_mut().variant_arches.remove(&pk);
        Ok(())
    }

    async fn list_repos(&mut self, filter: &RepoFilter, page: Option<Page>) -> Result<Paged<Repo>> {
        let tables = self.tables();
        let mut out = Vec::new();
        for id in tables.repos.keys() {
            let repo = tables.repo(*id)?;
            if filter.matches(&repo) {
                out.push(repo);
            }
        }
        Ok(Paged::slice(out, page))
    }

    async fn get_repo(&mut self, id: i64) -> Result<Option<Repo>> {
        let tables = self.tables();
        if !tables.repos.contains_key(&id) {
            return Ok(None);
        }
        tables.repo(id).map(Some)
    }

    async fn find_repo(&mut self, fields: &RepoFields) -> Result<Option<i64>> {
        Ok(self
            .tables()
            .repos
            .iter()
            .find(|(_, r)| {
                r.variant_arch_pk == fields.variant_arch_pk
                    && r.service == fields.service
                    && r.repo_family == fields.repo_family
                    && r.content_format == fields.content_format
                    && r.content_category == fields.content_category
                    && r.name == fields.name
                    && r.shadow == fields.shadow
            })
            .map(|(id, _)| *id))
    }

    async fn insert_repo(&mut self, fields: &RepoFields) -> Result<Repo> {
        let tables = self.tables_mut();
        let id = next(&mut tables.seq.repo);
        tables.repos.insert(id, fields.clone());
        tables.repo(id)
    }

    async fn update_repo(&mut self, id: i64, fields: &RepoFields) -> Result<Repo> {
        let tables = self.tables_mut();
        tables.repos.insert(id, fields.clone());
        tables.repo(id)
    }

    async fn delete_repo(&mut self, id: i64) -> Result<()> {
        self.tables_mut().repos.remove(&id);
        Ok(())
    }

    async fn count_repos(&mut self, variant_arch_pk: i64) -> Result<i64> {
        let count = self
            .tables()
            .repos
            .values()
            .filter(|r| r.variant_arch_pk == variant_arch_pk)
            .count();
        Ok(count as i64)
    }

    async fn insert_changeset(&mut self, changeset: &NewChangeset) -> Result<i64> {
        let tables = self.tables_mut();
        let id = next(&mut tables.seq.changeset);
        tables.changesets.insert(
            id,
            Changeset {
                id,
                author: changeset.author.clone(),
                committed_on: changeset.committed_on,
                comment: changeset.comment.clone(),
                changes: changeset.changes.clone(),
            },
        );
        Ok(id)
    }

    async fn list_changesets(
        &mut self,
        filter: &ChangesetFilter,
        page: Option<Page>,
    ) -> Result<Paged<Changeset>> {
        let mut out: Vec<Changeset> = self
            .tables()
            .changesets
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.committed_on
                .cmp(&a.committed_on)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(Paged::slice(out, page))
    }

    async fn get_changeset(&mut self, id: i64) -> Result<Option<Changeset>> {
        Ok(self.tables().changesets.get(&id).cloned())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work } = *self;
        if let Some(work) = work {
            *guard = work;
        }
        Ok(())
    }
}
