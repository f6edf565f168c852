//! Read-only lookup tables.
//!
//! GET /repo-families/      repo families (filter: name, substring)
//! GET /services/           repo services
//! GET /content-formats/    repo content formats
//! GET /content-categories/ repo content categories
//! GET /variant-types/      variant types
//! GET /release-types/      release types

use axum::{
    extract::{OriginalUri, RawQuery},
    http::Uri,
    Extension, Json,
};
use pdc_core::filter::{NameFilter, QueryParams};
use pdc_core::lookups::{
    ContentCategory, ContentFormat, Lookup, LookupEntry, ReleaseType, RepoFamily, Service,
    VariantType,
};
use pdc_core::page::Paged;

use crate::error::AppError;
use crate::pagination::{paginate, query_params, Listing, PageConfig, PageRequest};

fn list<L: Lookup>(
    params: &QueryParams,
    filter: NameFilter,
    uri: &Uri,
    pages: &PageConfig,
) -> Result<Json<Listing<LookupEntry>>, AppError> {
    let request = PageRequest::from_query(params, pages)?;
    let entries: Vec<_> = L::entries()
        .into_iter()
        .filter(|e| filter.matches_name(&e.name))
        .collect();
    let paged = Paged::slice(entries, request.window());
    Ok(Json(paginate(paged, request, params, uri, pages)?))
}

macro_rules! plain_lookup {
    ($handler:ident, $lookup:ty) => {
        pub async fn $handler(
            Extension(pages): Extension<PageConfig>,
            OriginalUri(uri): OriginalUri,
            RawQuery(query): RawQuery,
        ) -> Result<Json<Listing<LookupEntry>>, AppError> {
            let params = query_params(query.as_deref());
            params.ensure_known(&[])?;
            list::<$lookup>(&params, NameFilter::default(), &uri, &pages)
        }
    };
}

pub async fn list_repo_families(
    Extension(pages): Extension<PageConfig>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Listing<LookupEntry>>, AppError> {
    let params = query_params(query.as_deref());
    let filter = NameFilter::icontains(&params)?;
    list::<RepoFamily>(&params, filter, &uri, &pages)
}

plain_lookup!(list_services, Service);
plain_lookup!(list_content_formats, ContentFormat);
plain_lookup!(list_content_categories, ContentCategory);
plain_lookup!(list_variant_types, VariantType);
plain_lookup!(list_release_types, ReleaseType);
