//! Repo handlers.
//!
//! GET    /repos/      list repos (filters: release_id, variant_uid, arch, service,
//!                       repo_family, content_format, content_category, name,
//!                       shadow, product_id)
//! POST   /repos/      create one repo or a list
//! DELETE /repos/      bulk delete by list of ids
//! GET    /repos/:id/  retrieve
//! PUT    /repos/:id/  update
//! PATCH  /repos/:id/  partial update
//! DELETE /repos/:id/  delete

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, RawQuery},
    http::StatusCode,
    Extension, Json,
};
use pdc_core::{filter::RepoFilter, service::CatalogService, types::Repo, WriteContext};
use serde_json::Value;

use super::{id_list, json_body, path_id, Created};
use crate::error::AppError;
use crate::pagination::{paginate, query_params, Listing, PageConfig, PageRequest};

pub async fn list_repos(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(pages): Extension<PageConfig>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Listing<Repo>>, AppError> {
    let params = query_params(query.as_deref());
    let filter = RepoFilter::from_query(&params)?;
    let request = PageRequest::from_query(&params, &pages)?;
    let repos = service.list_repos(filter, request.window()).await?;
    Ok(Json(paginate(repos, request, &params, &uri, &pages)?))
}

pub async fn create_repo(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Created<Repo>>), AppError> {
    let created = match json_body(&body)? {
        Value::Array(items) => Created::Many(service.create_repos(&ctx, items).await?),
        single => Created::One(service.create_repo(&ctx, single).await?),
    };
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn bulk_delete_repos(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let ids = id_list(json_body(&body)?)?;
    service.delete_repos(&ctx, ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_repo(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Path(id): Path<String>,
) -> Result<Json<Repo>, AppError> {
    let repo = service.get_repo(path_id(&id)?).await?;
    Ok(Json(repo))
}

pub async fn update_repo(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Repo>, AppError> {
    let repo = service
        .update_repo(&ctx, path_id(&id)?, json_body(&body)?, false)
        .await?;
    Ok(Json(repo))
}

pub async fn patch_repo(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Repo>, AppError> {
    let repo = service
        .update_repo(&ctx, path_id(&id)?, json_body(&body)?, true)
        .await?;
    Ok(Json(repo))
}

pub async fn delete_repo(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete_repo(&ctx, path_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
