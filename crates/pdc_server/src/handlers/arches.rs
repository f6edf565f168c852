//! Arch handlers.
//!
//! GET  /arches/ list arches (filter: name)
//! POST /arches/ create an arch

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, RawQuery},
    http::StatusCode,
    Extension, Json,
};
use pdc_core::{filter::NameFilter, service::CatalogService, types::Arch, WriteContext};

use super::json_body;
use crate::error::AppError;
use crate::pagination::{paginate, query_params, Listing, PageConfig, PageRequest};

pub async fn list_arches(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(pages): Extension<PageConfig>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Listing<Arch>>, AppError> {
    let params = query_params(query.as_deref());
    let filter = NameFilter::exact(&params)?;
    let request = PageRequest::from_query(&params, &pages)?;
    let arches = service.list_arches(filter, request.window()).await?;
    Ok(Json(paginate(arches, request, &params, &uri, &pages)?))
}

pub async fn create_arch(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(ctx): Extension<WriteContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Arch>), AppError> {
    let arch = service.create_arch(&ctx, json_body(&body)?).await?;
    Ok((StatusCode::CREATED, Json(arch)))
}
