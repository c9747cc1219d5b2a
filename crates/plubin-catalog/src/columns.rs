//! Conversions between SQLite text columns and typed values.

use rusqlite::types::Type;
use rusqlite::Row;
use serde_json::Value;
use uuid::Uuid;

pub(crate) fn conversion_failure(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Reads a hyphenated uuid stored as text.
pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_failure(idx, e))
}

/// Reads an optional JSON document stored as text.
pub(crate) fn json_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| serde_json::from_str(&text).map_err(|e| conversion_failure(idx, e)))
        .transpose()
}

/// Reads a JSON array of strings stored as text.
pub(crate) fn tags_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_failure(idx, e))
}

/// Encodes an optional JSON document for binding.
pub(crate) fn json_text(value: Option<&Value>) -> serde_json::Result<Option<String>> {
    value.map(serde_json::to_string).transpose()
}

/// Current time in the same format the schema's column defaults produce.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
