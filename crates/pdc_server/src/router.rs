//! Router construction for the PDC server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use pdc_core::service::CatalogService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};
use crate::pagination::PageConfig;

pub const API_PREFIX: &str = "/rest_api/v1";

/// Build the full axum router with all routes and middleware.
pub fn build_router(
    service: Arc<dyn CatalogService>,
    jwt_config: JwtConfig,
    pages: PageConfig,
) -> Router {
    // Reads pass the auth layer anonymously, writes need a token
    let api = Router::new()
        .route(
            "/arches/",
            get(handlers::arches::list_arches).post(handlers::arches::create_arch),
        )
        .route(
            "/releases/",
            get(handlers::releases::list_releases).post(handlers::releases::create_release),
        )
        .route(
            "/releases/:release_id/",
            get(handlers::releases::get_release)
                .put(handlers::releases::update_release)
                .patch(handlers::releases::patch_release),
        )
        .route(
            "/variants/",
            get(handlers::variants::list_variants)
                .post(handlers::variants::create_variant)
                .delete(handlers::variants::bulk_delete_variants),
        )
        .route(
            "/variants/:release_id/:variant_uid/",
            get(handlers::variants::get_variant)
                .put(handlers::variants::update_variant)
                .patch(handlers::variants::patch_variant)
                .delete(handlers::variants::delete_variant),
        )
        .route(
            "/repos/",
            get(handlers::repos::list_repos)
                .post(handlers::repos::create_repo)
                .delete(handlers::repos::bulk_delete_repos),
        )
        .route(
            "/repos/:id/",
            get(handlers::repos::get_repo)
                .put(handlers::repos::update_repo)
                .patch(handlers::repos::patch_repo)
                .delete(handlers::repos::delete_repo),
        )
        .route(
            "/rpc/repos/clone/",
            post(handlers::repo_clone::clone_repos),
        )
        // Lookups
        .route(
            "/repo-families/",
            get(handlers::lookups::list_repo_families),
        )
        .route("/services/", get(handlers::lookups::list_services))
        .route(
            "/content-formats/",
            get(handlers::lookups::list_content_formats),
        )
        .route(
            "/content-categories/",
            get(handlers::lookups::list_content_categories),
        )
        .route(
            "/variant-types/",
            get(handlers::lookups::list_variant_types),
        )
        .route(
            "/release-types/",
            get(handlers::lookups::list_release_types),
        )
        // Audit log
        .route("/changesets/", get(handlers::changesets::list_changesets))
        .route(
            "/changesets/:id/",
            get(handlers::changesets::get_changeset),
        )
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    public
        .nest(API_PREFIX, api)
        .fallback(handlers::not_found)
        .layer(Extension(pages))
        .layer(Extension(service))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
