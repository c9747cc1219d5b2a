//! Shared types for the Plubin asset catalog.
//!
//! This crate holds the record shapes of the three catalog tables
//! (`assets`, `materials`, `asset_materials`), the write payloads accepted
//! by the catalog layer, and the vocabulary of the access policies:
//! principal [`Role`], policy [`Operation`] and catalog [`Table`].
//!
//! Every other crate in the workspace depends on `plubin-types` for these
//! definitions, and `plubin-types` depends on nothing internal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod models;

pub use models::{
    Asset, AssetMaterial, AssetPatch, Material, MaterialPatch, NewAsset, NewAssetMaterial,
    NewMaterial, DEFAULT_ASSET_VERSION,
};

/// Error returned when a policy vocabulary label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseLabelError {
    /// Unknown principal role label.
    #[error("unknown role: {0}")]
    Role(String),
    /// Unknown policy operation label.
    #[error("unknown operation: {0}")]
    Operation(String),
    /// Unknown catalog table name.
    #[error("unknown table: {0}")]
    Table(String),
}

/// Classification of the caller used to gate catalog operations.
///
/// Labels match the role names of a managed Postgres backend so the same
/// policy rows read the same in both renditions of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Caller presented no key, or the public anon key.
    #[serde(rename = "anon")]
    Anonymous,
    /// A signed-in end user.
    Authenticated,
    /// A trusted backend holding the service key.
    #[serde(rename = "service_role")]
    Service,
}

impl Role {
    /// Returns the policy label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anon",
            Self::Authenticated => "authenticated",
            Self::Service => "service_role",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anon" => Ok(Self::Anonymous),
            "authenticated" => Ok(Self::Authenticated),
            "service_role" => Ok(Self::Service),
            _ => Err(ParseLabelError::Role(s.to_string())),
        }
    }
}

/// Row operation a policy can permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Returns the policy label for this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select" => Ok(Self::Select),
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(ParseLabelError::Operation(s.to_string())),
        }
    }
}

/// The catalog tables under row-level access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Assets,
    Materials,
    AssetMaterials,
}

impl Table {
    /// Returns the SQL table name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Materials => "materials",
            Self::AssetMaterials => "asset_materials",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Table {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assets" => Ok(Self::Assets),
            "materials" => Ok(Self::Materials),
            "asset_materials" => Ok(Self::AssetMaterials),
            _ => Err(ParseLabelError::Table(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels_parse_back() {
        for role in [Role::Anonymous, Role::Authenticated, Role::Service] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn role_serializes_as_policy_label() {
        let json = serde_json::to_string(&Role::Service).unwrap();
        assert_eq!(json, "\"service_role\"");
        let json = serde_json::to_string(&Role::Anonymous).unwrap();
        assert_eq!(json, "\"anon\"");
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert_eq!(
            "admin".parse::<Role>(),
            Err(ParseLabelError::Role("admin".to_string()))
        );
        assert!("truncate".parse::<Operation>().is_err());
        assert!("users".parse::<Table>().is_err());
    }

    #[test]
    fn table_names() {
        assert_eq!(Table::Assets.as_str(), "assets");
        assert_eq!(Table::Materials.as_str(), "materials");
        assert_eq!(Table::AssetMaterials.to_string(), "asset_materials");
    }
}
