//! Plubin server library logic.

pub mod api;
pub mod api_assets;
pub mod api_materials;
pub mod config;
pub mod middleware;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, put},
    Extension, Json, Router,
};
use config::{AuthConfig, StorageConfig};
use plubin_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Maximum request body size for JSON endpoints (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Maximum model file upload size (50 MiB).
const MAX_SKP_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Accepted API keys.
    pub auth: Arc<AuthConfig>,
    /// External object storage settings.
    pub storage: Arc<StorageConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, auth: AuthConfig, storage: StorageConfig) -> Self {
        Self {
            pool,
            auth: Arc::new(auth),
            storage: Arc::new(storage),
        }
    }
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by load balancers,
/// monitoring, and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/assets",
            get(api_assets::list_assets_handler).post(api_assets::create_asset_handler),
        )
        .route(
            "/api/assets/{id}",
            get(api_assets::get_asset_handler)
                .patch(api_assets::update_asset_handler)
                .delete(api_assets::delete_asset_handler),
        )
        .route(
            "/api/assets/{id}/materials",
            get(api_assets::list_asset_materials_handler).post(api_assets::link_material_handler),
        )
        .route(
            "/api/assets/{id}/materials/{material_id}",
            patch(api_assets::update_link_handler).delete(api_assets::unlink_material_handler),
        )
        .route(
            "/api/materials",
            get(api_materials::list_materials_handler)
                .post(api_materials::create_material_handler),
        )
        .route(
            "/api/materials/{id}",
            get(api_materials::get_material_handler)
                .patch(api_materials::update_material_handler)
                .delete(api_materials::delete_material_handler),
        )
        .route("/api/policies", get(api::list_policies_handler))
        .route("/api/storage/{*path}", get(api::storage_url_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::principal_middleware));

    let upload_routes = Router::new()
        .route("/api/assets/{id}/skp", put(api_assets::upload_skp_handler))
        .layer(DefaultBodyLimit::max(MAX_SKP_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn(middleware::principal_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .merge(upload_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
