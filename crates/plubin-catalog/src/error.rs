//! Error types for the catalog layer.

use plubin_types::{Operation, Role, Table};
use rusqlite::ffi;
use uuid::Uuid;

/// Errors that can occur during catalog operations.
///
/// Constraint failures reported by the database are classified into their
/// own variants so callers can tell bad input from engine trouble.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No policy permits this principal to perform the operation.
    #[error("permission denied: {role} may not {operation} on {table}")]
    PermissionDenied {
        role: Role,
        table: Table,
        operation: Operation,
    },

    /// A required column was left empty.
    #[error("null value in column \"{column}\" violates not-null constraint")]
    NotNullViolation { column: String },

    /// A link references a row that does not exist.
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A row with the same key already exists.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The addressed row does not exist (or is not visible).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The request could not be turned into a valid statement.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Any other database failure.
    #[error("catalog database error: {0}")]
    Database(rusqlite::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("catalog serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_NOTNULL => {
                    // "NOT NULL constraint failed: assets.name"
                    let column = detail
                        .rsplit_once(": ")
                        .map(|(_, qualified)| qualified)
                        .and_then(|qualified| qualified.rsplit('.').next())
                        .unwrap_or(detail.as_str())
                        .to_string();
                    return Self::NotNullViolation { column };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::ForeignKeyViolation(detail),
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    return Self::Duplicate(detail)
                }
                ffi::SQLITE_CONSTRAINT_CHECK => return Self::InvalidInput(detail),
                _ => {}
            }
        }
        Self::Database(err)
    }
}
