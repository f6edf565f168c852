//! Release handlers.
//!
//! GET   /releases/              list releases (filters: release_id, short, version,
//!                                  name, release_type, base_product, active)
//! POST  /releases/              create one release or a list of releases
//! GET   /releases/:release_id/  retrieve
//! PUT   /releases/:release_id/  update
//! PATCH /releases/:release_id/  partial update

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, RawQuery},
    http::StatusCode,
    Extension, Json,
};
use pdc_core::{filter::ReleaseFilter, service::CatalogService, types::Release, WriteContext};
use serde_json::Value;

use super::{json_body, Created};
use crate::error::AppError;
use crate::pagination::{paginate, query_params, Listing, PageConfig, PageRequest};

pub async fn list_releases(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(pages): Extension<PageConfig>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Listing<Release>>, AppError> {
    let params = query_params(query.as_deref());
    let filter = ReleaseFilter::from_query(&params)?;
    let request = PageRequest::from_query(&params, &pages)?;
    let releases = service.list_releases(filter, request.window()).await?;
    Ok(Json(paginate(releases, request, &params, &uri, &pages)?))
}

pub async fn create_release(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Created<Release>>), AppError> {
    let created = match json_body(&body)? {
        Value::Array(items) => Created::Many(service.create_releases(&ctx, items).await?),
        single => Created::One(service.create_release(&ctx, single).await?),
    };
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_release(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Path(release_id): Path<String>,
) -> Result<Json<Release>, AppError> {
    let release = service.get_release(&release_id).await?;
    Ok(Json(release))
}

pub async fn update_release(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path(release_id): Path<String>,
    body: Bytes,
) -> Result<Json<Release>, AppError> {
    let release = service
        .update_release(&ctx, &release_id, json_body(&body)?, false)
        .await?;
    Ok(Json(release))
}

pub async fn patch_release(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path(release_id): Path<String>,
    body: Bytes,
) -> Result<Json<Release>, AppError> {
    let release = service
        .update_release(&ctx, &release_id, json_body(&body)?, true)
        .await?;
    Ok(Json(release))
}
