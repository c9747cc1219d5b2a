//! Catalog layer for the Plubin asset catalog.
//!
//! Every read and write of the `assets`, `materials` and `asset_materials`
//! tables goes through this crate. Each operation takes the calling
//! principal's [`Role`](plubin_types::Role), checks it against the policy
//! rows installed by `plubin-db`, and only then touches the table. Database
//! constraint failures come back classified as [`CatalogError`] variants.
//!
//! # Access policies
//!
//! | Table | select | insert / update | delete |
//! |-------|--------|-----------------|--------|
//! | `assets` | anon, authenticated | authenticated, service_role | authenticated, service_role |
//! | `materials` | anon, authenticated | authenticated, service_role | nobody |
//! | `asset_materials` | anon, authenticated | authenticated, service_role | nobody |
//!
//! # Usage
//!
//! ```rust,ignore
//! use plubin_catalog::{create_asset, list_assets, AssetFilter};
//! use plubin_types::{NewAsset, Role};
//!
//! let asset = create_asset(&conn, Role::Service, &NewAsset::new("gaveteiro", "furniture"))?;
//! let furniture = list_assets(
//!     &conn,
//!     Role::Anonymous,
//!     &AssetFilter { asset_type: Some("furniture".into()), ..Default::default() },
//! )?;
//! ```

mod assets;
mod columns;
mod error;
mod links;
mod materials;
mod policy;

pub use assets::{
    attach_skp, create_asset, delete_asset, find_asset_by_name, get_asset, list_assets,
    update_asset, AssetFilter, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
pub use error::CatalogError;
pub use links::{link_material, list_asset_materials, unlink_material, update_link_role};
pub use materials::{create_material, delete_material, get_material, list_materials, update_material};
pub use policy::{authorize, is_permitted, list_policies, PolicyRule};
