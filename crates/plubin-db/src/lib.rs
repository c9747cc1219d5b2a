//! Database layer for the Plubin asset catalog.
//!
//! This crate is the schema and policy definition of the catalog. It
//! provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and the embedded migrations that create the `assets`, `materials` and
//! `asset_materials` tables, switch on row-level access control for each,
//! install the access policies and insert the baseline sample rows.
//!
//! # Design decisions
//!
//! - **Guarded SQL**: every statement is safe to execute again, so the
//!   schema can be re-applied wholesale ([`apply_schema`]) as well as
//!   incrementally ([`run_migrations`]).
//! - **Policies as rows**: SQLite has no native row-level security, so the
//!   policies live in `_plubin_policies` and are enforced by the catalog
//!   layer. The Postgres rendition ([`POSTGRES_SCHEMA`]) declares the same
//!   policies natively.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema cannot drift from the code reading it.

mod migrations;
mod pool;
mod postgres;

pub use migrations::{apply_schema, migration_names, run_migrations, MigrationError};
pub use pool::{create_pool, open_catalog, DbPool, DbRuntimeSettings, PoolError, IN_MEMORY};
pub use postgres::{POSTGRES_SCHEMA, SEED_ASSET_ID, SEED_MATERIAL_ID};
