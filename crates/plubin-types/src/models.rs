//! Record and payload shapes for the catalog tables.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Version string assigned to assets created without one.
pub const DEFAULT_ASSET_VERSION: &str = "1.0";

/// A row of the `assets` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    /// Type classification (`furniture`, `hardware`, `component`, ...).
    #[serde(rename = "type")]
    pub asset_type: String,
    pub version: String,
    pub json_spec: Option<Value>,
    /// Location of the model file in object storage.
    pub skp_url: Option<String>,
    /// Inline base64 copy of the model file.
    pub skp_base64: Option<String>,
    pub skp_filename: Option<String>,
    pub default_params: Option<Value>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for inserting an asset. `id` and timestamps are server-assigned.
///
/// `name` and `asset_type` are required by the schema but optional here, as
/// in any insert payload: omitting one reaches the database and fails there
/// with a not-null violation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub asset_type: Option<String>,
    /// Falls back to [`DEFAULT_ASSET_VERSION`].
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub json_spec: Option<Value>,
    #[serde(default)]
    pub skp_url: Option<String>,
    #[serde(default)]
    pub skp_base64: Option<String>,
    #[serde(default)]
    pub skp_filename: Option<String>,
    #[serde(default)]
    pub default_params: Option<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewAsset {
    /// Creates a payload with only the required columns set.
    pub fn new(name: impl Into<String>, asset_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            asset_type: Some(asset_type.into()),
            ..Self::default()
        }
    }
}

/// Reads a present field, `null` included, as `Some`. Paired with
/// `#[serde(default)]` an absent field stays `None`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of an asset. `None` leaves the column untouched.
///
/// Nullable columns are doubly optional: `Some(None)` (a JSON `null`)
/// clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub json_spec: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub skp_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub skp_base64: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub skp_filename: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub default_params: Option<Option<Value>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl AssetPatch {
    /// Returns `true` if the patch would not change any column.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A row of the `materials` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    /// Display color, usually `#RRGGBB`.
    pub color: Option<String>,
    pub texture_url: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: String,
}

/// Payload for inserting a material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMaterial {
    /// Required by the schema, see [`NewAsset`].
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub texture_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Partial update of a material, with the same `null` handling as
/// [`AssetPatch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub texture_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Option<Value>>,
}

impl NewMaterial {
    /// Creates a payload with only the name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl MaterialPatch {
    /// Returns `true` if the patch would not change any column.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A row of the `asset_materials` association table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMaterial {
    pub asset_id: Uuid,
    pub material_id: Uuid,
    /// What the material is used for on the asset (`carcass`, `door`, ...).
    pub role: Option<String>,
}

/// Payload for linking a material to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssetMaterial {
    pub material_id: Uuid,
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_asset_reads_type_field() {
        let payload: NewAsset = serde_json::from_value(json!({
            "name": "balcao_simples",
            "type": "furniture",
            "default_params": {"width": 1200}
        }))
        .unwrap();

        assert_eq!(payload.asset_type.as_deref(), Some("furniture"));
        assert_eq!(payload.version, None);
        assert!(payload.tags.is_empty());
        assert_eq!(payload.default_params, Some(json!({"width": 1200})));
    }

    #[test]
    fn new_asset_without_type_leaves_it_unset() {
        let payload: NewAsset = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(payload.name.as_deref(), Some("x"));
        assert_eq!(payload.asset_type, None);
    }

    #[test]
    fn patch_null_clears_and_absent_keeps() {
        let patch: AssetPatch =
            serde_json::from_value(json!({"skp_url": null, "json_spec": {"a": 1}})).unwrap();
        assert_eq!(patch.skp_url, Some(None));
        assert_eq!(patch.json_spec, Some(Some(json!({"a": 1}))));
        assert_eq!(patch.default_params, None);
        assert!(!patch.is_empty());

        let patch: MaterialPatch = serde_json::from_value(json!({"metadata": null})).unwrap();
        assert_eq!(patch.metadata, Some(None));
        assert_eq!(patch.color, None);

        let patch: AssetPatch = serde_json::from_value(json!({})).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn empty_patches() {
        assert!(AssetPatch::default().is_empty());
        assert!(MaterialPatch::default().is_empty());

        let patch = AssetPatch {
            tags: Some(vec![]),
            ..AssetPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
