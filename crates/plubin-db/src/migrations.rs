//! Embedded SQL migration runner.
//!
//! The catalog schema ships as SQL files embedded at compile time. Every
//! statement in them is guarded (`IF NOT EXISTS`, `OR IGNORE`,
//! `ON CONFLICT DO NOTHING`), so the files can be re-executed against a
//! provisioned database without error. On top of that, applied migration
//! names are tracked in `_plubin_migrations` so startup only runs new ones.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

/// A single embedded migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_assets",
        sql: include_str!("migrations/000_assets.sql"),
    },
    Migration {
        name: "001_materials",
        sql: include_str!("migrations/001_materials.sql"),
    },
    Migration {
        name: "002_asset_materials",
        sql: include_str!("migrations/002_asset_materials.sql"),
    },
    Migration {
        name: "003_row_policies",
        sql: include_str!("migrations/003_row_policies.sql"),
    },
    Migration {
        name: "004_seed",
        sql: include_str!("migrations/004_seed.sql"),
    },
];

const TRACKING_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS _plubin_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);";

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The name of the migration that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

impl MigrationError {
    fn failed(name: &str) -> impl FnOnce(rusqlite::Error) -> Self + '_ {
        move |source| Self::ExecutionFailed {
            name: name.to_string(),
            source,
        }
    }
}

/// Names of every embedded migration, in application order.
pub fn migration_names() -> Vec<&'static str> {
    MIGRATIONS.iter().map(|m| m.name).collect()
}

/// Runs all pending migrations against the given connection.
///
/// Migrations that have already been applied (tracked in `_plubin_migrations`)
/// are skipped. New migrations are applied in order, each in its own
/// `IMMEDIATE` transaction together with its tracking row, so concurrent
/// callers serialize on the write lock and later ones skip what earlier
/// ones applied.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails to execute or if the
/// migration tracking table cannot be queried.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    let mut applied = 0;

    for migration in migrations {
        // The write lock is held before the tracking check; concurrent
        // appliers queue on busy_timeout.
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .map_err(MigrationError::failed(migration.name))?;
        tx.execute_batch(TRACKING_TABLE_SQL)
            .map_err(MigrationError::failed("_plubin_migrations_bootstrap"))?;

        let already_applied: bool = tx
            .query_row(
                "SELECT COUNT(*) > 0 FROM _plubin_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;

        if already_applied {
            tracing::debug!(
                migration = migration.name,
                "migration already applied, skipping"
            );
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        tx.execute_batch(migration.sql)
            .map_err(MigrationError::failed(migration.name))?;
        tx.execute(
            "INSERT INTO _plubin_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(MigrationError::failed(migration.name))?;
        tx.commit().map_err(MigrationError::failed(migration.name))?;

        applied += 1;
    }

    Ok(applied)
}

/// Re-executes the whole schema definition regardless of tracking state.
///
/// This is the "run the script again" apply: every migration body runs, in
/// order, inside a single `IMMEDIATE` transaction. Guard clauses make it a
/// no-op on a database that is already provisioned. Names missing from the tracking
/// table are recorded so a later [`run_migrations`] finds nothing pending.
///
/// # Errors
///
/// Returns `MigrationError::ExecutionFailed` naming the first migration
/// whose body fails; the transaction is rolled back.
pub fn apply_schema(conn: &Connection) -> Result<(), MigrationError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(MigrationError::failed("apply_schema"))?;
    tx.execute_batch(TRACKING_TABLE_SQL)
        .map_err(MigrationError::failed("_plubin_migrations_bootstrap"))?;

    for migration in MIGRATIONS {
        tx.execute_batch(migration.sql)
            .map_err(MigrationError::failed(migration.name))?;
        tx.execute(
            "INSERT OR IGNORE INTO _plubin_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(MigrationError::failed(migration.name))?;
    }

    tx.commit().map_err(MigrationError::failed("apply_schema"))?;
    tracing::info!(migrations = MIGRATIONS.len(), "schema applied");
    Ok(())
}
