//! Policy-gated operations on the `assets` table.

use base64::Engine as _;
use plubin_types::{Asset, AssetPatch, NewAsset, Operation, Role, Table, DEFAULT_ASSET_VERSION};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::columns::{json_at, json_text, now_timestamp, tags_at, uuid_at};
use crate::error::CatalogError;
use crate::policy::authorize;

/// Default page size for [`list_assets`].
pub const DEFAULT_LIST_LIMIT: i64 = 100;
/// Upper bound on the page size for [`list_assets`].
pub const MAX_LIST_LIMIT: i64 = 1000;

const ASSET_COLUMNS: &str = "id, name, type, version, json_spec, skp_url, skp_base64, \
     skp_filename, default_params, tags, created_at, updated_at";

fn map_asset(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        asset_type: row.get(2)?,
        version: row.get(3)?,
        json_spec: json_at(row, 4)?,
        skp_url: row.get(5)?,
        skp_base64: row.get(6)?,
        skp_filename: row.get(7)?,
        default_params: json_at(row, 8)?,
        tags: tags_at(row, 9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Filter criteria for [`list_assets`].
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    /// Only assets of this type classification.
    pub asset_type: Option<String>,
    /// Only assets carrying this tag.
    pub tag: Option<String>,
    /// Only assets with exactly this name.
    pub name: Option<String>,
    /// Maximum number of assets to return (default 100, capped at 1000).
    pub limit: Option<i64>,
}

/// Inserts an asset and returns the stored row.
///
/// The id is generated here; `version` defaults to `"1.0"`, timestamps are
/// assigned by the database.
///
/// # Errors
///
/// `PermissionDenied` without an insert policy, `NotNullViolation` when
/// `name` or `type` is missing, `Serialization` for unencodable JSON.
pub fn create_asset(
    conn: &Connection,
    principal: Role,
    asset: &NewAsset,
) -> Result<Asset, CatalogError> {
    authorize(conn, principal, Table::Assets, Operation::Insert)?;

    let id = Uuid::new_v4();
    let json_spec = json_text(asset.json_spec.as_ref())?;
    let default_params = json_text(asset.default_params.as_ref())?;
    let tags = serde_json::to_string(&asset.tags)?;
    let version = asset.version.as_deref().unwrap_or(DEFAULT_ASSET_VERSION);

    let created = conn.query_row(
        &format!(
            "INSERT INTO assets
                (id, name, type, version, json_spec, skp_url, skp_base64,
                 skp_filename, default_params, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {ASSET_COLUMNS}"
        ),
        params![
            id.to_string(),
            asset.name,
            asset.asset_type,
            version,
            json_spec,
            asset.skp_url,
            asset.skp_base64,
            asset.skp_filename,
            default_params,
            tags,
        ],
        map_asset,
    )?;

    tracing::info!(asset_id = %created.id, name = %created.name, "asset created");
    Ok(created)
}

/// Fetches one asset by id.
///
/// # Errors
///
/// `PermissionDenied` without a select policy, `Database` on SQL failure.
pub fn get_asset(
    conn: &Connection,
    principal: Role,
    id: Uuid,
) -> Result<Option<Asset>, CatalogError> {
    authorize(conn, principal, Table::Assets, Operation::Select)?;

    let asset = conn
        .query_row(
            &format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ?1"),
            [id.to_string()],
            map_asset,
        )
        .optional()?;
    Ok(asset)
}

/// Returns the oldest asset with the given name, if any.
///
/// Names are not unique; upload tooling uses this to find the row to
/// refresh instead of inserting a duplicate.
///
/// # Errors
///
/// `PermissionDenied` without a select policy, `Database` on SQL failure.
pub fn find_asset_by_name(
    conn: &Connection,
    principal: Role,
    name: &str,
) -> Result<Option<Asset>, CatalogError> {
    let filter = AssetFilter {
        name: Some(name.to_string()),
        limit: Some(1),
        ..AssetFilter::default()
    };
    Ok(list_assets(conn, principal, &filter)?.into_iter().next())
}

/// Lists assets in creation order.
///
/// # Errors
///
/// `PermissionDenied` without a select policy, `InvalidInput` for a
/// non-positive limit, `Database` on SQL failure.
pub fn list_assets(
    conn: &Connection,
    principal: Role,
    filter: &AssetFilter,
) -> Result<Vec<Asset>, CatalogError> {
    authorize(conn, principal, Table::Assets, Operation::Select)?;

    let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit <= 0 {
        return Err(CatalogError::InvalidInput(format!(
            "limit must be positive, got {limit}"
        )));
    }
    let limit = limit.min(MAX_LIST_LIMIT);

    // Clauses and bind values are collected separately so nothing from
    // the filter is interpolated into the SQL text.
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(ref asset_type) = filter.asset_type {
        values.push(Box::new(asset_type.clone()));
        clauses.push(format!("type = ?{}", values.len()));
    }
    if let Some(ref tag) = filter.tag {
        values.push(Box::new(tag.clone()));
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(assets.tags) WHERE json_each.value = ?{})",
            values.len()
        ));
    }
    if let Some(ref name) = filter.name {
        values.push(Box::new(name.clone()));
        clauses.push(format!("name = ?{}", values.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    values.push(Box::new(limit));
    let sql = format!(
        "SELECT {ASSET_COLUMNS} FROM assets {where_clause}
         ORDER BY created_at ASC, id ASC
         LIMIT ?{}",
        values.len()
    );

    let params_refs: Vec<&dyn ToSql> = values.iter().map(|v| &**v).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), map_asset)?;

    let mut assets = Vec::new();
    for row in rows {
        assets.push(row?);
    }
    Ok(assets)
}

/// Applies a partial update and returns the new row.
///
/// `updated_at` is refreshed on every update; the schema has no trigger
/// for it. Nullable columns set to `Some(None)` are cleared.
///
/// # Errors
///
/// `PermissionDenied` without an update policy, `InvalidInput` for an
/// empty patch, `NotFound` if no row has this id.
pub fn update_asset(
    conn: &Connection,
    principal: Role,
    id: Uuid,
    patch: &AssetPatch,
) -> Result<Asset, CatalogError> {
    authorize(conn, principal, Table::Assets, Operation::Update)?;

    if patch.is_empty() {
        return Err(CatalogError::InvalidInput(
            "update must change at least one column".to_string(),
        ));
    }

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    let mut set = |column: &str, value: Box<dyn ToSql>| {
        values.push(value);
        sets.push(format!("{column} = ?{}", values.len()));
    };

    if let Some(ref name) = patch.name {
        set("name", Box::new(name.clone()));
    }
    if let Some(ref asset_type) = patch.asset_type {
        set("type", Box::new(asset_type.clone()));
    }
    if let Some(ref version) = patch.version {
        set("version", Box::new(version.clone()));
    }
    // Inner `None` binds NULL and clears the column.
    if let Some(ref spec) = patch.json_spec {
        set("json_spec", Box::new(json_text(spec.as_ref())?));
    }
    if let Some(ref url) = patch.skp_url {
        set("skp_url", Box::new(url.clone()));
    }
    if let Some(ref encoded) = patch.skp_base64 {
        set("skp_base64", Box::new(encoded.clone()));
    }
    if let Some(ref filename) = patch.skp_filename {
        set("skp_filename", Box::new(filename.clone()));
    }
    if let Some(ref params) = patch.default_params {
        set("default_params", Box::new(json_text(params.as_ref())?));
    }
    if let Some(ref tags) = patch.tags {
        set("tags", Box::new(serde_json::to_string(tags)?));
    }
    set("updated_at", Box::new(now_timestamp()));

    values.push(Box::new(id.to_string()));
    let sql = format!(
        "UPDATE assets SET {} WHERE id = ?{} RETURNING {ASSET_COLUMNS}",
        sets.join(", "),
        values.len()
    );

    let params_refs: Vec<&dyn ToSql> = values.iter().map(|v| &**v).collect();
    let updated = conn
        .query_row(&sql, params_refs.as_slice(), map_asset)
        .optional()?
        .ok_or(CatalogError::NotFound { entity: "asset", id })?;

    tracing::info!(asset_id = %id, "asset updated");
    Ok(updated)
}

/// Stores an uploaded model file inline on the asset.
///
/// The bytes are base64-encoded into `skp_base64` and the original file
/// name is kept in `skp_filename`.
///
/// # Errors
///
/// Same as [`update_asset`].
pub fn attach_skp(
    conn: &Connection,
    principal: Role,
    id: Uuid,
    filename: &str,
    bytes: &[u8],
) -> Result<Asset, CatalogError> {
    let patch = AssetPatch {
        skp_base64: Some(Some(base64::engine::general_purpose::STANDARD.encode(bytes))),
        skp_filename: Some(Some(filename.to_string())),
        ..AssetPatch::default()
    };
    let asset = update_asset(conn, principal, id, &patch)?;
    tracing::info!(asset_id = %id, filename, size = bytes.len(), "model file attached");
    Ok(asset)
}

/// Deletes an asset. Its material links go with it; the materials stay.
///
/// # Errors
///
/// `PermissionDenied` without a delete policy, `NotFound` if no row has
/// this id.
pub fn delete_asset(conn: &Connection, principal: Role, id: Uuid) -> Result<(), CatalogError> {
    authorize(conn, principal, Table::Assets, Operation::Delete)?;

    let deleted = conn.execute("DELETE FROM assets WHERE id = ?1", [id.to_string()])?;
    if deleted == 0 {
        return Err(CatalogError::NotFound { entity: "asset", id });
    }

    tracing::info!(asset_id = %id, "asset deleted");
    Ok(())
}
