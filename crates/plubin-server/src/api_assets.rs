//! Asset and asset-material link handlers.

use crate::{
    api::{with_conn, ApiError},
    middleware::Principal,
    AppState,
};
use axum::{
    body::Bytes,
    extract::{Extension, Json, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use plubin_catalog::{
    attach_skp, create_asset, delete_asset, get_asset, link_material, list_asset_materials,
    list_assets, unlink_material, update_asset, update_link_role, AssetFilter,
};
use plubin_types::{Asset, AssetMaterial, AssetPatch, NewAsset, NewAssetMaterial};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Header carrying the original file name of an uploaded model.
pub const SKP_FILENAME_HEADER: &str = "x-skp-filename";

/// Query parameters for `GET /api/assets`.
#[derive(Debug, Default, Deserialize)]
pub struct ListAssetsQuery {
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub tag: Option<String>,
    pub name: Option<String>,
    pub limit: Option<i64>,
}

/// Request body for changing a link's role.
#[derive(Debug, Deserialize)]
pub struct LinkRoleRequest {
    pub role: Option<String>,
}

/// Handler for `GET /api/assets`.
pub async fn list_assets_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Query(query): Query<ListAssetsQuery>,
) -> Result<Json<Vec<Asset>>, ApiError> {
    let filter = AssetFilter {
        asset_type: query.asset_type,
        tag: query.tag,
        name: query.name,
        limit: query.limit,
    };
    let assets = with_conn(&state, move |conn| Ok(list_assets(conn, role, &filter)?)).await?;
    Ok(Json(assets))
}

/// Handler for `GET /api/assets/{id}`.
pub async fn get_asset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Asset>, ApiError> {
    let asset = with_conn(&state, move |conn| Ok(get_asset(conn, role, id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("asset not found: {id}")))?;
    Ok(Json(asset))
}

/// Handler for `POST /api/assets`.
pub async fn create_asset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Json(payload): Json<NewAsset>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = with_conn(&state, move |conn| Ok(create_asset(conn, role, &payload)?)).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// Handler for `PATCH /api/assets/{id}`.
pub async fn update_asset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AssetPatch>,
) -> Result<Json<Asset>, ApiError> {
    let asset = with_conn(&state, move |conn| Ok(update_asset(conn, role, id, &patch)?)).await?;
    Ok(Json(asset))
}

/// Handler for `DELETE /api/assets/{id}`.
pub async fn delete_asset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state, move |conn| Ok(delete_asset(conn, role, id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `PUT /api/assets/{id}/skp`.
///
/// Takes the raw model file as the request body and stores it base64-encoded
/// on the asset. The file name comes from the `X-Skp-Filename` header and
/// defaults to `<id>.skp`.
pub async fn upload_skp_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Asset>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty model file".to_string()));
    }

    let filename = match headers.get(SKP_FILENAME_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::BadRequest("invalid file name header".to_string()))?
            .trim()
            .to_string(),
        None => format!("{id}.skp"),
    };
    if filename.is_empty() || filename.contains(['/', '\\']) {
        return Err(ApiError::BadRequest(format!("invalid file name: {filename}")));
    }

    let asset = with_conn(&state, move |conn| {
        Ok(attach_skp(conn, role, id, &filename, &body)?)
    })
    .await?;
    Ok(Json(asset))
}

/// Handler for `GET /api/assets/{id}/materials`.
pub async fn list_asset_materials_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AssetMaterial>>, ApiError> {
    let links = with_conn(&state, move |conn| Ok(list_asset_materials(conn, role, id)?)).await?;
    Ok(Json(links))
}

/// Handler for `POST /api/assets/{id}/materials`.
pub async fn link_material_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewAssetMaterial>,
) -> Result<impl IntoResponse, ApiError> {
    let link = with_conn(&state, move |conn| Ok(link_material(conn, role, id, &payload)?)).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// Handler for `PATCH /api/assets/{id}/materials/{material_id}`.
pub async fn update_link_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path((id, material_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<LinkRoleRequest>,
) -> Result<Json<AssetMaterial>, ApiError> {
    let link = with_conn(&state, move |conn| {
        Ok(update_link_role(
            conn,
            role,
            id,
            material_id,
            payload.role.as_deref(),
        )?)
    })
    .await?;
    Ok(Json(link))
}

/// Handler for `DELETE /api/assets/{id}/materials/{material_id}`.
pub async fn unlink_material_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Principal(role)): Extension<Principal>,
    Path((id, material_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state, move |conn| {
        Ok(unlink_material(conn, role, id, material_id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
