//! Changeset audit log, read-only.
//!
//! GET /changesets/     list changesets, newest first (filters: author, resource,
//!                        changed_since, changed_until)
//! GET /changesets/:id/ retrieve one changeset with its changes

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, RawQuery},
    Extension, Json,
};
use pdc_core::{filter::ChangesetFilter, service::CatalogService, types::Changeset};

use super::path_id;
use crate::error::AppError;
use crate::pagination::{paginate, query_params, Listing, PageConfig, PageRequest};

pub async fn list_changesets(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Extension(pages): Extension<PageConfig>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Listing<Changeset>>, AppError> {
    let params = query_params(query.as_deref());
    let filter = ChangesetFilter::from_query(&params)?;
    let request = PageRequest::from_query(&params, &pages)?;
    let changesets = service.list_changesets(filter, request.window()).await?;
    Ok(Json(paginate(changesets, request, &params, &uri, &pages)?))
}

pub async fn get_changeset(
    Extension(service): Extension<Arc<dyn CatalogService>>,
    Path(id): Path<String>,
) -> Result<Json<Changeset>, AppError> {
    let changeset = service.get_changeset(path_id(&id)?).await?;
    Ok(Json(changeset))
}
