//! Postgres rendition of the catalog schema.
//!
//! Managed Postgres deployments apply this script with any standard client
//! (`psql -f`). It declares the same tables, seed rows and access policies as
//! the embedded SQLite migrations, using native row-level security.

/// The full Postgres schema script.
pub const POSTGRES_SCHEMA: &str = include_str!("postgres/schema.sql");

/// Ids of the seed rows, shared by both renditions.
pub const SEED_ASSET_ID: &str = "0b6a7c52-3f1e-4d2a-9c4b-5e8f1a2d3c01";
pub const SEED_MATERIAL_ID: &str = "5d2e9f14-8a6b-4c3d-b7e1-0f4a6c8d2e02";

#[cfg(test)]
mod tests {
    use super::*;

    fn statements() -> Vec<String> {
        POSTGRES_SCHEMA
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n")
            .split(';')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    #[test]
    fn every_statement_is_guarded() {
        for stmt in statements() {
            if stmt.starts_with("CREATE TABLE") || stmt.starts_with("CREATE EXTENSION") {
                assert!(stmt.contains("IF NOT EXISTS"), "unguarded: {stmt}");
            }
            if stmt.starts_with("INSERT") {
                assert!(stmt.contains("ON CONFLICT DO NOTHING"), "unguarded: {stmt}");
            }
        }
    }

    #[test]
    fn every_policy_is_dropped_before_create() {
        let stmts = statements();
        for (i, stmt) in stmts.iter().enumerate() {
            if let Some(rest) = stmt.strip_prefix("CREATE POLICY ") {
                let name = rest.split_whitespace().next().unwrap();
                assert!(
                    stmts[i - 1].starts_with(&format!("DROP POLICY IF EXISTS {name} ")),
                    "policy {name} is not dropped first"
                );
            }
        }
    }

    #[test]
    fn only_assets_have_a_delete_policy() {
        let deletes: Vec<_> = statements()
            .into_iter()
            .filter(|s| s.starts_with("CREATE POLICY") && s.contains("FOR DELETE"))
            .collect();
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].contains(" ON assets"));
    }

    #[test]
    fn row_security_enabled_on_all_tables() {
        for table in ["assets", "materials", "asset_materials"] {
            let stmt = format!("ALTER TABLE {table} ENABLE ROW LEVEL SECURITY");
            assert!(POSTGRES_SCHEMA.contains(&stmt), "missing: {stmt}");
        }
    }

    #[test]
    fn header_notes_service_role_bypass() {
        let header: String = POSTGRES_SCHEMA
            .lines()
            .take_while(|line| line.starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(header.contains("service_role bypasses row level security"));
    }

    #[test]
    fn seed_ids_match_embedded_migrations() {
        let seed = include_str!("migrations/004_seed.sql");
        assert!(seed.contains(SEED_ASSET_ID));
        assert!(seed.contains(SEED_MATERIAL_ID));
        assert!(POSTGRES_SCHEMA.contains(SEED_ASSET_ID));
        assert!(POSTGRES_SCHEMA.contains(SEED_MATERIAL_ID));
    }
}
