//! Policy-gated operations on the `materials` table.

use plubin_types::{Material, MaterialPatch, NewMaterial, Operation, Role, Table};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::assets::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::columns::{json_at, json_text, uuid_at};
use crate::error::CatalogError;
use crate::policy::authorize;

const MATERIAL_COLUMNS: &str = "id, name, color, texture_url, metadata, created_at";

fn map_material(row: &Row<'_>) -> rusqlite::Result<Material> {
    Ok(Material {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        texture_url: row.get(3)?,
        metadata: json_at(row, 4)?,
        created_at: row.get(5)?,
    })
}

/// Inserts a material and returns the stored row.
///
/// # Errors
///
/// `PermissionDenied` without an insert policy, `NotNullViolation` when
/// `name` is missing.
pub fn create_material(
    conn: &Connection,
    principal: Role,
    material: &NewMaterial,
) -> Result<Material, CatalogError> {
    authorize(conn, principal, Table::Materials, Operation::Insert)?;

    let id = Uuid::new_v4();
    let metadata = json_text(material.metadata.as_ref())?;
    let created = conn.query_row(
        &format!(
            "INSERT INTO materials (id, name, color, texture_url, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {MATERIAL_COLUMNS}"
        ),
        params![
            id.to_string(),
            material.name,
            material.color,
            material.texture_url,
            metadata,
        ],
        map_material,
    )?;

    tracing::info!(material_id = %created.id, name = %created.name, "material created");
    Ok(created)
}

/// Fetches one material by id.
pub fn get_material(
    conn: &Connection,
    principal: Role,
    id: Uuid,
) -> Result<Option<Material>, CatalogError> {
    authorize(conn, principal, Table::Materials, Operation::Select)?;

    let material = conn
        .query_row(
            &format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?1"),
            [id.to_string()],
            map_material,
        )
        .optional()?;
    Ok(material)
}

/// Lists materials in creation order, at most `limit` of them.
pub fn list_materials(
    conn: &Connection,
    principal: Role,
    limit: Option<i64>,
) -> Result<Vec<Material>, CatalogError> {
    authorize(conn, principal, Table::Materials, Operation::Select)?;

    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit <= 0 {
        return Err(CatalogError::InvalidInput(format!(
            "limit must be positive, got {limit}"
        )));
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY created_at ASC, id ASC LIMIT ?1"
    ))?;
    let rows = stmt.query_map([limit.min(MAX_LIST_LIMIT)], map_material)?;

    let mut materials = Vec::new();
    for row in rows {
        materials.push(row?);
    }
    Ok(materials)
}

/// Applies a partial update and returns the new row.
///
/// # Errors
///
/// `PermissionDenied` without an update policy, `InvalidInput` for an
/// empty patch, `NotFound` if no row has this id.
pub fn update_material(
    conn: &Connection,
    principal: Role,
    id: Uuid,
    patch: &MaterialPatch,
) -> Result<Material, CatalogError> {
    authorize(conn, principal, Table::Materials, Operation::Update)?;

    if patch.is_empty() {
        return Err(CatalogError::InvalidInput(
            "update must change at least one column".to_string(),
        ));
    }

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(ref name) = patch.name {
        values.push(Box::new(name.clone()));
        sets.push(format!("name = ?{}", values.len()));
    }
    if let Some(ref color) = patch.color {
        values.push(Box::new(color.clone()));
        sets.push(format!("color = ?{}", values.len()));
    }
    if let Some(ref url) = patch.texture_url {
        values.push(Box::new(url.clone()));
        sets.push(format!("texture_url = ?{}", values.len()));
    }
    if let Some(ref metadata) = patch.metadata {
        values.push(Box::new(json_text(metadata.as_ref())?));
        sets.push(format!("metadata = ?{}", values.len()));
    }

    values.push(Box::new(id.to_string()));
    let sql = format!(
        "UPDATE materials SET {} WHERE id = ?{} RETURNING {MATERIAL_COLUMNS}",
        sets.join(", "),
        values.len()
    );

    let params_refs: Vec<&dyn ToSql> = values.iter().map(|v| &**v).collect();
    let updated = conn
        .query_row(&sql, params_refs.as_slice(), map_material)
        .optional()?
        .ok_or(CatalogError::NotFound {
            entity: "material",
            id,
        })?;

    tracing::info!(material_id = %id, "material updated");
    Ok(updated)
}

/// Deletes a material and, by cascade, its asset links.
///
/// No delete policy is installed for `materials`, so under row security
/// this fails with `PermissionDenied` for every principal.
///
/// # Errors
///
/// `PermissionDenied` without a delete policy, `NotFound` if no row has
/// this id.
pub fn delete_material(conn: &Connection, principal: Role, id: Uuid) -> Result<(), CatalogError> {
    authorize(conn, principal, Table::Materials, Operation::Delete)?;

    let deleted = conn.execute("DELETE FROM materials WHERE id = ?1", [id.to_string()])?;
    if deleted == 0 {
        return Err(CatalogError::NotFound {
            entity: "material",
            id,
        });
    }

    tracing::info!(material_id = %id, "material deleted");
    Ok(())
}
