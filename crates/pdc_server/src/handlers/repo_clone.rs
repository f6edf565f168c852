//! POST /rpc/repos/clone/: copy repos from one release to another.

use std::sync::Arc;

use axum::{body::Bytes, Extension, Json};
use pdc_core::{service::CatalogService, types::Repo, WriteContext};

use super::json_body;
use crate::error::AppError;

pub async fn clone_repos(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    body: Bytes,
) -> Result<Json<Vec<Repo>>, AppError> {
    let created = service.clone_repos(&ctx, json_body(&body)?).await?;
    tracing::info!(count = created.len(), "repos cloned");
    Ok(Json(created))
}
