//! Policy-gated operations on the `asset_materials` association.

use plubin_types::{AssetMaterial, NewAssetMaterial, Operation, Role, Table};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::columns::uuid_at;
use crate::error::CatalogError;
use crate::policy::authorize;

fn map_link(row: &Row<'_>) -> rusqlite::Result<AssetMaterial> {
    Ok(AssetMaterial {
        asset_id: uuid_at(row, 0)?,
        material_id: uuid_at(row, 1)?,
        role: row.get(2)?,
    })
}

/// Links a material to an asset.
///
/// # Errors
///
/// `PermissionDenied` without an insert policy, `ForeignKeyViolation` if
/// either side does not exist, `Duplicate` if the pair is already linked
/// (whatever its role).
pub fn link_material(
    conn: &Connection,
    principal: Role,
    asset_id: Uuid,
    link: &NewAssetMaterial,
) -> Result<AssetMaterial, CatalogError> {
    authorize(conn, principal, Table::AssetMaterials, Operation::Insert)?;

    let created = conn.query_row(
        "INSERT INTO asset_materials (asset_id, material_id, role)
         VALUES (?1, ?2, ?3)
         RETURNING asset_id, material_id, role",
        params![asset_id.to_string(), link.material_id.to_string(), link.role],
        map_link,
    )?;

    tracing::info!(
        asset_id = %asset_id,
        material_id = %link.material_id,
        role = link.role.as_deref().unwrap_or(""),
        "material linked"
    );
    Ok(created)
}

/// Lists the material links of one asset.
pub fn list_asset_materials(
    conn: &Connection,
    principal: Role,
    asset_id: Uuid,
) -> Result<Vec<AssetMaterial>, CatalogError> {
    authorize(conn, principal, Table::AssetMaterials, Operation::Select)?;

    let mut stmt = conn.prepare(
        "SELECT asset_id, material_id, role FROM asset_materials
         WHERE asset_id = ?1
         ORDER BY material_id",
    )?;
    let rows = stmt.query_map([asset_id.to_string()], map_link)?;

    let mut links = Vec::new();
    for row in rows {
        links.push(row?);
    }
    Ok(links)
}

/// Changes (or clears) the role label of an existing link.
///
/// # Errors
///
/// `PermissionDenied` without an update policy, `NotFound` (keyed by the
/// material id) if the pair is not linked.
pub fn update_link_role(
    conn: &Connection,
    principal: Role,
    asset_id: Uuid,
    material_id: Uuid,
    role: Option<&str>,
) -> Result<AssetMaterial, CatalogError> {
    authorize(conn, principal, Table::AssetMaterials, Operation::Update)?;

    conn.query_row(
        "UPDATE asset_materials SET role = ?3
         WHERE asset_id = ?1 AND material_id = ?2
         RETURNING asset_id, material_id, role",
        params![asset_id.to_string(), material_id.to_string(), role],
        map_link,
    )
    .optional()?
    .ok_or(CatalogError::NotFound {
        entity: "asset material link",
        id: material_id,
    })
}

/// Removes a link between an asset and a material.
///
/// No delete policy is installed for `asset_materials`; links disappear
/// through cascades when either side is deleted.
///
/// # Errors
///
/// `PermissionDenied` without a delete policy, `NotFound` if the pair is
/// not linked.
pub fn unlink_material(
    conn: &Connection,
    principal: Role,
    asset_id: Uuid,
    material_id: Uuid,
) -> Result<(), CatalogError> {
    authorize(conn, principal, Table::AssetMaterials, Operation::Delete)?;

    let deleted = conn.execute(
        "DELETE FROM asset_materials WHERE asset_id = ?1 AND material_id = ?2",
        params![asset_id.to_string(), material_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(CatalogError::NotFound {
            entity: "asset material link",
            id: material_id,
        });
    }
    Ok(())
}
