//! Variant handlers. A variant is addressed as `{release_id}/{variant_uid}`.
//!
//! GET    /variants/                         list variants (filters: release, id, uid,
//!                                              name, type, arch)
//! POST   /variants/                         create one variant or a list
//! DELETE /variants/                         bulk delete by list of keys
//! GET    /variants/:release_id/:uid/        retrieve
//! PUT    /variants/:release_id/:uid/        update, `arches` replaces the set
//! PATCH  /variants/:release_id/:uid/        partial update, also `add_arches`
//!                                              and `remove_arches`
//! DELETE /variants/:release_id/:uid/        delete

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, RawQuery},
    http::StatusCode,
    Extension, Json,
};
use pdc_core::{filter::VariantFilter, service::CatalogService, types::Variant, WriteContext};
use serde_json::Value;

use super::{id_list, json_body, Created};
use crate::error::AppError;
use crate::pagination::{paginate, query_params, Listing, PageConfig, PageRequest};

pub async fn list_variants(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(pages): Extension<PageConfig>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Listing<Variant>>, AppError> {
    let params = query_params(query.as_deref());
    let filter = VariantFilter::from_query(&params)?;
    let request = PageRequest::from_query(&params, &pages)?;
    let variants = service.list_variants(filter, request.window()).await?;
    Ok(Json(paginate(variants, request, &params, &uri, &pages)?))
}

pub async fn create_variant(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Created<Variant>>), AppError> {
    let created = match json_body(&body)? {
        Value::Array(items) => Created::Many(service.create_variants(&ctx, items).await?),
        single => Created::One(service.create_variant(&ctx, single).await?),
    };
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn bulk_delete_variants(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let keys = id_list(json_body(&body)?)?;
    service.delete_variants(&ctx, keys).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_variant(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Path((release_id, variant_uid)): Path<(String, String)>,
) -> Result<Json<Variant>, AppError> {
    let variant = service.get_variant(&release_id, &variant_uid).await?;
    Ok(Json(variant))
}

pub async fn update_variant(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path((release_id, variant_uid)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Variant>, AppError> {
    let variant = service
        .update_variant(&ctx, &release_id, &variant_uid, json_body(&body)?, false)
        .await?;
    Ok(Json(variant))
}

pub async fn patch_variant(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path((release_id, variant_uid)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Variant>, AppError> {
    let variant = service
        .update_variant(&ctx, &release_id, &variant_uid, json_body(&body)?, true)
        .await?;
    Ok(Json(variant))
}

pub async fn delete_variant(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path((release_id, variant_uid)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    service
        .delete_variant(&ctx, &release_id, &variant_uid)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
