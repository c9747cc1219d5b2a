//! Connection pool creation and configuration.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;
use thiserror::Error;

use crate::migrations::{run_migrations, MigrationError};

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when opening the catalog database.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),

    /// The schema could not be applied.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Applies the per-connection pragmas every catalog connection needs.
///
/// Foreign keys must be on for the association table's cascades to fire.
fn init_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    // Set first so the WAL switch below waits out a concurrent opener.
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;

    // In-memory databases report "memory" instead of "wal".
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("failed to set WAL journal mode, got: {journal_mode}")),
        ));
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

/// How the pool sizes and recycles connections to one database path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PoolShape {
    max_size: u32,
    /// Whether r2d2 may retire connections on its lifetime and idle timers.
    recycle: bool,
}

/// Every `:memory:` connection is its own database: an in-memory pool holds
/// exactly one connection and never replaces it, or the schema would be lost
/// with it.
fn pool_shape(db_path: &str, settings: DbRuntimeSettings) -> PoolShape {
    if db_path == IN_MEMORY {
        PoolShape {
            max_size: 1,
            recycle: false,
        }
    } else {
        PoolShape {
            max_size: settings.pool_max_size,
            recycle: true,
        }
    }
}

/// Creates a new SQLite connection pool with WAL mode and foreign keys enabled.
///
/// An in-memory pool is pinned to a single connection that r2d2 never
/// retires.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the connection pool cannot be created.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let busy_timeout_ms = settings.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| init_connection(conn, busy_timeout_ms));

    let shape = pool_shape(db_path, settings);
    if shape.max_size != settings.pool_max_size {
        tracing::debug!(
            requested = settings.pool_max_size,
            "in-memory database, limiting pool to one connection"
        );
    }

    let mut builder = Pool::builder().max_size(shape.max_size);
    if !shape.recycle {
        builder = builder.max_lifetime(None).idle_timeout(None);
    }
    let pool = builder.build(manager)?;
    Ok(pool)
}

/// Opens the catalog database: builds the pool and applies pending migrations.
///
/// Returns the pool and the number of migrations applied.
///
/// # Errors
///
/// Returns `PoolError` if the pool cannot be built, a connection cannot be
/// checked out, or a migration fails.
pub fn open_catalog(db_path: &str, settings: DbRuntimeSettings) -> Result<(DbPool, usize), PoolError> {
    let pool = create_pool(db_path, settings)?;
    let applied = {
        let conn = pool.get()?;
        run_migrations(&conn)?
    };
    if applied > 0 {
        tracing::info!(count = applied, path = db_path, "applied database migrations");
    }
    Ok((pool, applied))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_file_pool_configures_connections() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("catalog.db");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 2_500,
            pool_max_size: 3,
        };

        let pool = create_pool(path.to_str().unwrap(), settings)
            .expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");

        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .expect("should query journal_mode");
        assert_eq!(mode, "wal");

        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .expect("should query foreign_keys");
        assert_eq!(fk, 1, "foreign keys should be enabled");

        let busy_timeout: i32 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("should query busy_timeout");
        assert_eq!(busy_timeout, 2_500, "busy timeout should match settings");

        assert_eq!(pool.max_size(), 3, "pool max size should match settings");
    }

    #[test]
    fn in_memory_pool_is_single_connection() {
        let pool = create_pool(IN_MEMORY, DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn in_memory_pool_never_recycles_its_connection() {
        let settings = DbRuntimeSettings::default();
        assert_eq!(
            pool_shape(IN_MEMORY, settings),
            PoolShape {
                max_size: 1,
                recycle: false,
            }
        );
        assert_eq!(
            pool_shape("catalog.db", settings),
            PoolShape {
                max_size: settings.pool_max_size,
                recycle: true,
            }
        );
    }

    #[test]
    fn in_memory_schema_survives_checkouts() {
        let (pool, applied) =
            open_catalog(IN_MEMORY, DbRuntimeSettings::default()).expect("open should succeed");
        assert_eq!(applied, 5);

        for _ in 0..3 {
            let conn = pool.get().expect("should get a connection");
            let assets: i64 = conn
                .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))
                .expect("schema should still be present");
            assert_eq!(assets, 1);
        }
    }

    #[test]
    fn open_catalog_applies_once() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("catalog.db");
        let path = path.to_str().unwrap();

        let (_, first) = open_catalog(path, DbRuntimeSettings::default()).expect("first open");
        assert_eq!(first, 5);

        let (pool, second) = open_catalog(path, DbRuntimeSettings::default()).expect("second open");
        assert_eq!(second, 0);

        let conn = pool.get().expect("should get a connection");
        let assets: i64 = conn
            .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))
            .expect("should count assets");
        assert_eq!(assets, 1);
    }
}
