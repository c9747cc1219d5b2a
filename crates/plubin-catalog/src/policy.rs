//! Row-level access checks against the installed policy rows.
//!
//! A table with row security enabled permits an operation only when
//! `_plubin_policies` holds a row for that (table, operation, role). A table
//! with row security disabled, or absent from `_plubin_row_security`,
//! permits everything.

use plubin_types::{Operation, Role, Table};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::columns::conversion_failure;
use crate::error::CatalogError;

/// One installed access policy row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRule {
    pub policy_name: String,
    pub table: Table,
    pub operation: Operation,
    pub role: Role,
}

/// Returns whether `role` may perform `operation` on `table`.
///
/// # Errors
///
/// Returns `CatalogError::Database` if the policy tables cannot be read.
pub fn is_permitted(
    conn: &Connection,
    role: Role,
    table: Table,
    operation: Operation,
) -> Result<bool, CatalogError> {
    let enabled: Option<bool> = conn
        .query_row(
            "SELECT enabled FROM _plubin_row_security WHERE table_name = ?1",
            [table.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    if !enabled.unwrap_or(false) {
        return Ok(true);
    }

    let permitted = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM _plubin_policies
            WHERE table_name = ?1 AND operation = ?2 AND role = ?3
        )",
        params![table.as_str(), operation.as_str(), role.as_str()],
        |row| row.get(0),
    )?;
    Ok(permitted)
}

/// Fails with `CatalogError::PermissionDenied` unless a policy permits the
/// operation.
///
/// # Errors
///
/// Returns `CatalogError::PermissionDenied` when no policy matches, or
/// `CatalogError::Database` if the policy tables cannot be read.
pub fn authorize(
    conn: &Connection,
    role: Role,
    table: Table,
    operation: Operation,
) -> Result<(), CatalogError> {
    if is_permitted(conn, role, table, operation)? {
        return Ok(());
    }

    tracing::debug!(
        role = role.as_str(),
        table = table.as_str(),
        operation = operation.as_str(),
        "policy check denied"
    );
    Err(CatalogError::PermissionDenied {
        role,
        table,
        operation,
    })
}

/// Lists every installed policy, ordered by table, operation and role.
///
/// # Errors
///
/// Returns `CatalogError::Database` on SQL failure or if a stored label is
/// not part of the policy vocabulary.
pub fn list_policies(conn: &Connection) -> Result<Vec<PolicyRule>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT policy_name, table_name, operation, role
         FROM _plubin_policies
         ORDER BY table_name, operation, role",
    )?;
    let rows = stmt.query_map([], |row| {
        let table: String = row.get(1)?;
        let operation: String = row.get(2)?;
        let role: String = row.get(3)?;
        Ok(PolicyRule {
            policy_name: row.get(0)?,
            table: table.parse().map_err(|e| conversion_failure(1, e))?,
            operation: operation.parse().map_err(|e| conversion_failure(2, e))?,
            role: role.parse().map_err(|e| conversion_failure(3, e))?,
        })
    })?;

    let mut policies = Vec::new();
    for row in rows {
        policies.push(row?);
    }
    Ok(policies)
}
