//! Material handlers.

use crate::{
    api::{with_conn, ApiError},
    middleware::Principal,
    AppState,
};
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use plubin_catalog::{create_material, delete_material, get_material, list_materials, update_material};
use plubin_types::{Material, MaterialPatch, NewMaterial};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Query parameters for `GET /api/materials`.
#[derive(Debug, Default, Deserialize)]
pub struct ListMaterialsQuery {
    pub limit: Option<i64>,
}

/// Handler for `GET /api/materials`.
pub async fn list_materials_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Query(query): Query<ListMaterialsQuery>,
) -> Result<Json<Vec<Material>>, ApiError> {
    let materials =
        with_conn(&state, move |conn| Ok(list_materials(conn, role, query.limit)?)).await?;
    Ok(Json(materials))
}

/// Handler for `GET /api/materials/{id}`.
pub async fn get_material_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Material>, ApiError> {
    let material = with_conn(&state, move |conn| Ok(get_material(conn, role, id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("material not found: {id}")))?;
    Ok(Json(material))
}

/// Handler for `POST /api/materials`.
pub async fn create_material_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Json(payload): Json<NewMaterial>,
) -> Result<impl IntoResponse, ApiError> {
    let material =
        with_conn(&state, move |conn| Ok(create_material(conn, role, &payload)?)).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// Handler for `PATCH /api/materials/{id}`.
pub async fn update_material_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(patch): Json<MaterialPatch>,
) -> Result<Json<Material>, ApiError> {
    let material =
        with_conn(&state, move |conn| Ok(update_material(conn, role, id, &patch)?)).await?;
    Ok(Json(material))
}

/// Handler for `DELETE /api/materials/{id}`.
///
/// Materials carry no delete policy, so this answers 403 under row security.
pub async fn delete_material_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state, move |conn| Ok(delete_material(conn, role, id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
