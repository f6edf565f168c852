//! Postgres implementation of the catalog port traits.
//!
//! `PgStore` wraps a PgPool; every `begin()` opens one `sqlx::Transaction`
//! that all calls of the request share. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid a compile-time DB requirement.
//!
//! List queries share one `WHERE` fragment between the windowed select and
//! its `COUNT(*)`.

use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres, Transaction};

use pdc_core::error::{Conflict, PdcError};
use pdc_core::filter::{ChangesetFilter, NameFilter, ReleaseFilter, RepoFilter, VariantFilter};
use pdc_core::page::{Page, Paged};
use pdc_core::ports::{CatalogStore, CatalogTx, Result};
use pdc_core::types::*;

use crate::rows::*;

const RELEASE_SELECT: &str = r#"
    SELECT id, release_id, short, version, name, release_type, base_product, active
    FROM pdc.release
"#;

const RELEASE_WHERE: &str = r#"
    WHERE (cardinality($1::text[]) = 0 OR release_id = ANY($1))
      AND (cardinality($2::text[]) = 0 OR short = ANY($2))
      AND (cardinality($3::text[]) = 0 OR version = ANY($3))
      AND (cardinality($4::text[]) = 0 OR name = ANY($4))
      AND (cardinality($5::text[]) = 0 OR release_type = ANY($5))
      AND (cardinality($6::text[]) = 0 OR base_product = ANY($6))
      AND ($7::boolean IS NULL OR active = $7)
"#;

const VARIANT_COLUMNS: &str = r#"
    SELECT v.id, v.release_pk, r.release_id, v.variant_id, v.variant_uid,
           v.variant_name, v.variant_type,
           ARRAY(
               SELECT a.name
               FROM pdc.variant_arch va
               JOIN pdc.arch a ON a.id = va.arch_pk
               WHERE va.variant_pk = v.id
               ORDER BY a.name COLLATE "C"
           ) AS arches
"#;

const VARIANT_FROM: &str = r#"
    FROM pdc.variant v
    JOIN pdc.release r ON r.id = v.release_pk
"#;

const VARIANT_WHERE: &str = r#"
    WHERE (cardinality($1::text[]) = 0 OR r.release_id = ANY($1))
      AND (cardinality($2::text[]) = 0 OR v.variant_id = ANY($2))
      AND (cardinality($3::text[]) = 0 OR v.variant_uid = ANY($3))
      AND (cardinality($4::text[]) = 0 OR v.variant_name = ANY($4))
      AND (cardinality($5::text[]) = 0 OR v.variant_type = ANY($5))
      AND (cardinality($6::text[]) = 0 OR EXISTS (
            SELECT 1
            FROM pdc.variant_arch fva
            JOIN pdc.arch fa ON fa.id = fva.arch_pk
            WHERE fva.variant_pk = v.id AND fa.name = ANY($6)))
"#;

const VARIANT_ARCH_SELECT: &str = r#"
    SELECT va.id, va.variant_pk, va.arch_pk, a.name AS arch,
           r.release_id || '/' || v.variant_uid AS variant_key
    FROM pdc.variant_arch va
    JOIN pdc.arch a ON a.id = va.arch_pk
    JOIN pdc.variant v ON v.id = va.variant_pk
    JOIN pdc.release r ON r.id = v.release_pk
"#;

const REPO_COLUMNS: &str = r#"
    SELECT p.id, p.variant_arch_pk, r.release_id, v.variant_uid, a.name AS arch,
           p.service, p.repo_family, p.content_format, p.content_category,
           p.name, p.shadow, p.product_id
"#;

const REPO_FROM: &str = r#"
    FROM pdc.repo p
    JOIN pdc.variant_arch va ON va.id = p.variant_arch_pk
    JOIN pdc.arch a ON a.id = va.arch_pk
    JOIN pdc.variant v ON v.id = va.variant_pk
    JOIN pdc.release r ON r.id = v.release_pk
"#;

const REPO_WHERE: &str = r#"
    WHERE (cardinality($1::text[]) = 0 OR r.release_id = ANY($1))
      AND (cardinality($2::text[]) = 0 OR v.variant_uid = ANY($2))
      AND (cardinality($3::text[]) = 0 OR a.name = ANY($3))
      AND (cardinality($4::text[]) = 0 OR p.service = ANY($4))
      AND (cardinality($5::text[]) = 0 OR p.repo_family = ANY($5))
      AND (cardinality($6::text[]) = 0 OR p.content_format = ANY($6))
      AND (cardinality($7::text[]) = 0 OR p.content_category = ANY($7))
      AND (cardinality($8::text[]) = 0 OR p.name = ANY($8))
      AND ($9::boolean IS NULL OR p.shadow = $9)
      AND (cardinality($10::bigint[]) = 0 OR p.product_id = ANY($10))
"#;

/// `$2` switches between exact names and case-insensitive substrings.
const ARCH_WHERE: &str = r#"
    WHERE cardinality($1::text[]) = 0
       OR (NOT $2 AND name = ANY($1))
       OR ($2 AND EXISTS (
            SELECT 1 FROM unnest($1::text[]) AS wanted(n)
            WHERE strpos(lower(name), lower(wanted.n)) > 0))
"#;

const CHANGESET_WHERE: &str = r#"
    WHERE (cardinality($1::text[]) = 0 OR c.author = ANY($1))
      AND (cardinality($2::text[]) = 0 OR EXISTS (
            SELECT 1 FROM pdc.change ch
            WHERE ch.changeset_pk = c.id AND ch.resource = ANY($2)))
      AND ($3::timestamptz IS NULL OR c.committed_on >= $3)
      AND ($4::timestamptz IS NULL OR c.committed_on <= $4)
"#;

type PgQueryAs<'q, O> = QueryAs<'q, Postgres, O, PgArguments>;

fn bind_arch_filter<'q, O>(query: PgQueryAs<'q, O>, filter: &'q NameFilter) -> PgQueryAs<'q, O> {
    query.bind(filter.name.as_slice()).bind(filter.contains)
}

fn bind_release_filter<'q, O>(
    query: PgQueryAs<'q, O>,
    filter: &'q ReleaseFilter,
) -> PgQueryAs<'q, O> {
    query
        .bind(filter.release_id.as_slice())
        .bind(filter.short.as_slice())
        .bind(filter.version.as_slice())
        .bind(filter.name.as_slice())
        .bind(filter.release_type.as_slice())
        .bind(filter.base_product.as_slice())
        .bind(filter.active)
}

fn bind_variant_filter<'q, O>(
    query: PgQueryAs<'q, O>,
    filter: &'q VariantFilter,
) -> PgQueryAs<'q, O> {
    query
        .bind(filter.release.as_slice())
        .bind(filter.variant_id.as_slice())
        .bind(filter.variant_uid.as_slice())
        .bind(filter.variant_name.as_slice())
        .bind(filter.variant_type.as_slice())
        .bind(filter.arch.as_slice())
}

fn bind_repo_filter<'q, O>(query: PgQueryAs<'q, O>, filter: &'q RepoFilter) -> PgQueryAs<'q, O> {
    query
        .bind(filter.release_id.as_slice())
        .bind(filter.variant_uid.as_slice())
        .bind(filter.arch.as_slice())
        .bind(filter.service.as_slice())
        .bind(filter.repo_family.as_slice())
        .bind(filter.content_format.as_slice())
        .bind(filter.content_category.as_slice())
        .bind(filter.name.as_slice())
        .bind(filter.shadow)
        .bind(filter.product_id.as_slice())
}

fn bind_changeset_filter<'q, O>(
    query: PgQueryAs<'q, O>,
    filter: &'q ChangesetFilter,
) -> PgQueryAs<'q, O> {
    query
        .bind(filter.author.as_slice())
        .bind(filter.resource.as_slice())
        .bind(filter.changed_since)
        .bind(filter.changed_until)
}

/// `LIMIT`/`OFFSET` arguments; a NULL limit returns every row.
fn window(page: Option<Page>) -> (Option<i64>, i64) {
    match page {
        Some(page) => (Some(page.limit as i64), page.offset as i64),
        None => (None, 0),
    }
}

/// The total is known without a `COUNT(*)` when the window ends inside the list.
fn known_count(page: Option<Page>, fetched: usize) -> Option<usize> {
    match page {
        None => Some(fetched),
        Some(page) if fetched < page.limit && (fetched > 0 || page.offset == 0) => {
            Some(page.offset + fetched)
        }
        Some(_) => None,
    }
}

/// Unique-key violations from a concurrent writer surface as the same
/// validation error the service raises for a duplicate it can see.
fn write_error(err: sqlx::Error, conflict: Conflict) -> PdcError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict.error(),
        _ => PdcError::Internal(anyhow!(err)),
    }
}

fn convert<R, T>(row: R) -> Result<T>
where
    T: TryFrom<R, Error = String>,
{
    T::try_from(row).map_err(|e| PdcError::Internal(anyhow!(e)))
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = String>,
{
    rows.into_iter().map(convert).collect()
}

// ── PgStore ───────────────────────────────────────────────────

/// Postgres-backed catalog store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>> {
        let tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        Ok(Box::new(PgTx { tx }))
    }
}

// ── PgTx ──────────────────────────────────────────────────────

/// One database transaction; dropped without commit it rolls back.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    async fn load_variant(&mut self, pk: i64) -> Result<Variant> {
        let sql = format!("{VARIANT_COLUMNS} {VARIANT_FROM} WHERE v.id = $1");
        let row = sqlx::query_as::<_, PgVariantRow>(&sql)
            .bind(pk)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        convert(row)
    }

    async fn load_variant_arch(&mut self, pk: i64) -> Result<VariantArch> {
        let sql = format!("{VARIANT_ARCH_SELECT} WHERE va.id = $1");
        let row = sqlx::query_as::<_, PgVariantArchRow>(&sql)
            .bind(pk)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn load_repo(&mut self, id: i64) -> Result<Option<Repo>> {
        let sql = format!("{REPO_COLUMNS} {REPO_FROM} WHERE p.id = $1");
        let row = sqlx::query_as::<_, PgRepoRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        row.map(convert).transpose()
    }

    async fn load_changes(&mut self, ids: &[i64]) -> Result<BTreeMap<i64, Vec<Change>>> {
        let rows = sqlx::query_as::<_, PgChangeRow>(
            r#"
            SELECT changeset_pk, resource, resource_id, old_value, new_value
            FROM pdc.change
            WHERE changeset_pk = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        let mut grouped: BTreeMap<i64, Vec<Change>> = BTreeMap::new();
        for row in rows {
            grouped.entry(row.changeset_pk).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn count(&mut self, query: PgQueryAs<'_, (i64,)>) -> Result<usize> {
        let (count,) = query
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(count as usize)
    }

    async fn changesets_from_rows(&mut self, rows: Vec<PgChangesetRow>) -> Result<Vec<Changeset>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut changes = self.load_changes(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|r| Changeset {
                changes: changes.remove(&r.id).unwrap_or_default(),
                id: r.id,
                author: r.author,
                committed_on: r.committed_on,
                comment: r.comment,
            })
            .collect())
    }
}

#[async_trait]
impl CatalogTx for PgTx {
    // ── Arches ─────────────────────────────────────────────────

    async fn list_arches(
        &mut self,
        filter: &NameFilter,
        page: Option<Page>,
    ) -> Result<Paged<Arch>> {
        let (limit, offset) = window(page);
        let sql =
            format!("SELECT id, name FROM pdc.arch {ARCH_WHERE} ORDER BY id LIMIT $3 OFFSET $4");
        let rows = bind_arch_filter(sqlx::query_as::<_, PgArchRow>(&sql), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        let items: Vec<Arch> = rows.into_iter().map(Arch::from).collect();
        let count = match known_count(page, items.len()) {
            Some(count) => count,
            None => {
                let sql = format!("SELECT COUNT(*) FROM pdc.arch {ARCH_WHERE}");
                self.count(bind_arch_filter(sqlx::query_as(&sql), filter))
                    .await?
            }
        };
        Ok(Paged { count, items })
    }

    async fn find_arch(&mut self, name: &str) -> Result<Option<Arch>> {
        let row = sqlx::query_as::<_, PgArchRow>("SELECT id, name FROM pdc.arch WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Arch::from))
    }

    async fn insert_arch(&mut self, name: &str) -> Result<Arch> {
        let row = sqlx::query_as::<_, PgArchRow>(
            "INSERT INTO pdc.arch (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::Arch))?;
        Ok(row.into())
    }

    // ── Releases ───────────────────────────────────────────────

    async fn list_releases(
        &mut self,
        filter: &ReleaseFilter,
        page: Option<Page>,
    ) -> Result<Paged<Release>> {
        let (limit, offset) = window(page);
        let sql = format!("{RELEASE_SELECT} {RELEASE_WHERE} ORDER BY id LIMIT $8 OFFSET $9");
        let rows = bind_release_filter(sqlx::query_as::<_, PgReleaseRow>(&sql), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        let items: Vec<Release> = convert_all(rows)?;
        let count = match known_count(page, items.len()) {
            Some(count) => count,
            None => {
                let sql = format!("SELECT COUNT(*) FROM pdc.release {RELEASE_WHERE}");
                self.count(bind_release_filter(sqlx::query_as(&sql), filter))
                    .await?
            }
        };
        Ok(Paged { count, items })
    }

    async fn find_release(&mut self, release_id: &str) -> Result<Option<Release>> {
        let sql = format!("{RELEASE_SELECT} WHERE release_id = $1");
        let row = sqlx::query_as::<_, PgReleaseRow>(&sql)
            .bind(release_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        row.map(convert).transpose()
    }

    async fn insert_release(&mut self, fields: &ReleaseFields) -> Result<Release> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO pdc.release
                (release_id, short, version, name, release_type, base_product, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(fields.release_id())
        .bind(&fields.short)
        .bind(&fields.version)
        .bind(&fields.name)
        .bind(fields.release_type.as_ref())
        .bind(&fields.base_product)
        .bind(fields.active)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::Release))?;
        Ok(Release::from_fields(id, fields))
    }

    async fn update_release(&mut self, pk: i64, fields: &ReleaseFields) -> Result<Release> {
        sqlx::query(
            r#"
            UPDATE pdc.release
            SET release_id = $2, short = $3, version = $4, name = $5,
                release_type = $6, base_product = $7, active = $8
            WHERE id = $1
            "#,
        )
        .bind(pk)
        .bind(fields.release_id())
        .bind(&fields.short)
        .bind(&fields.version)
        .bind(&fields.name)
        .bind(fields.release_type.as_ref())
        .bind(&fields.base_product)
        .bind(fields.active)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::Release))?;
        Ok(Release::from_fields(pk, fields))
    }

    // ── Variants ───────────────────────────────────────────────

    async fn list_variants(
        &mut self,
        filter: &VariantFilter,
        page: Option<Page>,
    ) -> Result<Paged<Variant>> {
        let (limit, offset) = window(page);
        let sql = format!(
            "{VARIANT_COLUMNS} {VARIANT_FROM} {VARIANT_WHERE} ORDER BY v.id LIMIT $7 OFFSET $8"
        );
        let rows = bind_variant_filter(sqlx::query_as::<_, PgVariantRow>(&sql), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        let items: Vec<Variant> = convert_all(rows)?;
        let count = match known_count(page, items.len()) {
            Some(count) => count,
            None => {
                let sql = format!("SELECT COUNT(*) {VARIANT_FROM} {VARIANT_WHERE}");
                self.count(bind_variant_filter(sqlx::query_as(&sql), filter))
                    .await?
            }
        };
        Ok(Paged { count, items })
    }

    async fn find_variant(
        &mut self,
        release_id: &str,
        variant_uid: &str,
    ) -> Result<Option<Variant>> {
        let sql = format!(
            "{VARIANT_COLUMNS} {VARIANT_FROM} WHERE r.release_id = $1 AND v.variant_uid = $2"
        );
        let row = sqlx::query_as::<_, PgVariantRow>(&sql)
            .bind(release_id)
            .bind(variant_uid)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        row.map(convert).transpose()
    }

    async fn insert_variant(&mut self, fields: &VariantFields) -> Result<Variant> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO pdc.variant
                (release_pk, variant_id, variant_uid, variant_name, variant_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(fields.release_pk)
        .bind(&fields.variant_id)
        .bind(&fields.variant_uid)
        .bind(&fields.variant_name)
        .bind(fields.variant_type.as_ref())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::Variant))?;
        self.load_variant(id).await
    }

    async fn update_variant(&mut self, pk: i64, fields: &VariantFields) -> Result<Variant> {
        sqlx::query(
            r#"
            UPDATE pdc.variant
            SET release_pk = $2, variant_id = $3, variant_uid = $4,
                variant_name = $5, variant_type = $6
            WHERE id = $1
            "#,
        )
        .bind(pk)
        .bind(fields.release_pk)
        .bind(&fields.variant_id)
        .bind(&fields.variant_uid)
        .bind(&fields.variant_name)
        .bind(fields.variant_type.as_ref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::Variant))?;
        self.load_variant(pk).await
    }

    async fn delete_variant(&mut self, pk: i64) -> Result<()> {
        sqlx::query("DELETE FROM pdc.variant WHERE id = $1")
            .bind(pk)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    // ── Variant arches ─────────────────────────────────────────

    async fn list_variant_arches(&mut self, variant_pk: i64) -> Result<Vec<VariantArch>> {
        let sql = format!("{VARIANT_ARCH_SELECT} WHERE va.variant_pk = $1 ORDER BY va.id");
        let rows = sqlx::query_as::<_, PgVariantArchRow>(&sql)
            .bind(variant_pk)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(VariantArch::from).collect())
    }

    async fn find_variant_arch(
        &mut self,
        release_id: &str,
        variant_uid: &str,
        arch: &str,
    ) -> Result<Option<VariantArch>> {
        let sql = format!(
            "{VARIANT_ARCH_SELECT} WHERE r.release_id = $1 AND v.variant_uid = $2 AND a.name = $3"
        );
        let row = sqlx::query_as::<_, PgVariantArchRow>(&sql)
            .bind(release_id)
            .bind(variant_uid)
            .bind(arch)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(VariantArch::from))
    }

    async fn insert_variant_arch(&mut self, variant_pk: i64, arch: &Arch) -> Result<VariantArch> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO pdc.variant_arch (variant_pk, arch_pk) VALUES ($1, $2) RETURNING id",
        )
        .bind(variant_pk)
        .bind(arch.pk)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::VariantArch))?;
        self.load_variant_arch(id).await
    }

    async fn delete_variant_arch(&mut self, pk: i64) -> Result<()> {
        sqlx::query("DELETE FROM pdc.variant_arch WHERE id = $1")
            .bind(pk)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    // ── Repos ──────────────────────────────────────────────────

    async fn list_repos(&mut self, filter: &RepoFilter, page: Option<Page>) -> Result<Paged<Repo>> {
        let (limit, offset) = window(page);
        let sql = format!(
            "{REPO_COLUMNS} {REPO_FROM} {REPO_WHERE} ORDER BY p.id LIMIT $11 OFFSET $12"
        );
        let rows = bind_repo_filter(sqlx::query_as::<_, PgRepoRow>(&sql), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        let items: Vec<Repo> = convert_all(rows)?;
        let count = match known_count(page, items.len()) {
            Some(count) => count,
            None => {
                let sql = format!("SELECT COUNT(*) {REPO_FROM} {REPO_WHERE}");
                self.count(bind_repo_filter(sqlx::query_as(&sql), filter))
                    .await?
            }
        };
        Ok(Paged { count, items })
    }

    async fn get_repo(&mut self, id: i64) -> Result<Option<Repo>> {
        self.load_repo(id).await
    }

    async fn find_repo(&mut self, fields: &RepoFields) -> Result<Option<i64>> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT id FROM pdc.repo
            WHERE variant_arch_pk = $1 AND service = $2 AND repo_family = $3
              AND content_format = $4 AND content_category = $5
              AND name = $6 AND shadow = $7
            "#,
        )
        .bind(fields.variant_arch_pk)
        .bind(fields.service.as_ref())
        .bind(fields.repo_family.as_ref())
        .bind(fields.content_format.as_ref())
        .bind(fields.content_category.as_ref())
        .bind(&fields.name)
        .bind(fields.shadow)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|(id,)| id))
    }

    async fn insert_repo(&mut self, fields: &RepoFields) -> Result<Repo> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO pdc.repo
                (variant_arch_pk, service, repo_family, content_format,
                 content_category, name, shadow, product_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(fields.variant_arch_pk)
        .bind(fields.service.as_ref())
        .bind(fields.repo_family.as_ref())
        .bind(fields.content_format.as_ref())
        .bind(fields.content_category.as_ref())
        .bind(&fields.name)
        .bind(fields.shadow)
        .bind(fields.product_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::Repo))?;
        self.load_repo(id)
            .await?
            .ok_or_else(|| anyhow!("repo {id} missing right after insert").into())
    }

    async fn update_repo(&mut self, id: i64, fields: &RepoFields) -> Result<Repo> {
        sqlx::query(
            r#"
            UPDATE pdc.repo
            SET variant_arch_pk = $2, service = $3, repo_family = $4,
                content_format = $5, content_category = $6, name = $7,
                shadow = $8, product_id = $9
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fields.variant_arch_pk)
        .bind(fields.service.as_ref())
        .bind(fields.repo_family.as_ref())
        .bind(fields.content_format.as_ref())
        .bind(fields.content_category.as_ref())
        .bind(&fields.name)
        .bind(fields.shadow)
        .bind(fields.product_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, Conflict::Repo))?;
        self.load_repo(id)
            .await?
            .ok_or_else(|| anyhow!("repo {id} missing right after update").into())
    }

    async fn delete_repo(&mut self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM pdc.repo WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn count_repos(&mut self, variant_arch_pk: i64) -> Result<i64> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM pdc.repo WHERE variant_arch_pk = $1",
        )
        .bind(variant_arch_pk)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(count)
    }

    // ── Changesets ─────────────────────────────────────────────

    async fn insert_changeset(&mut self, changeset: &NewChangeset) -> Result<i64> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO pdc.changeset (author, committed_on, comment)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&changeset.author)
        .bind(changeset.committed_on)
        .bind(&changeset.comment)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;

        for change in &changeset.changes {
            sqlx::query(
                r#"
                INSERT INTO pdc.change
                    (changeset_pk, resource, resource_id, old_value, new_value)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(&change.resource)
            .bind(change.resource_id)
            .bind(&change.old_value)
            .bind(&change.new_value)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        }
        Ok(id)
    }

    async fn list_changesets(
        &mut self,
        filter: &ChangesetFilter,
        page: Option<Page>,
    ) -> Result<Paged<Changeset>> {
        let (limit, offset) = window(page);
        let sql = format!(
            r#"
            SELECT c.id, c.author, c.committed_on, c.comment
            FROM pdc.changeset c
            {CHANGESET_WHERE}
            ORDER BY c.committed_on DESC, c.id DESC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = bind_changeset_filter(sqlx::query_as::<_, PgChangesetRow>(&sql), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        let count = match known_count(page, rows.len()) {
            Some(count) => count,
            None => {
                let sql = format!("SELECT COUNT(*) FROM pdc.changeset c {CHANGESET_WHERE}");
                self.count(bind_changeset_filter(sqlx::query_as(&sql), filter))
                    .await?
            }
        };
        // Changes are loaded for the window only.
        let items = self.changesets_from_rows(rows).await?;
        Ok(Paged { count, items })
    }

    async fn get_changeset(&mut self, id: i64) -> Result<Option<Changeset>> {
        let row = sqlx::query_as::<_, PgChangesetRow>(
            "SELECT id, author, committed_on, comment FROM pdc.changeset WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        match row {
            Some(row) => Ok(self.changesets_from_rows(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
