//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints. Composite UNIQUE indexes double as the
//! store-level backstop for the uniqueness pre-checks in the
//! repository layer.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Applications (tenant boundary)
-- =======================================================================
DEFINE TABLE application SCHEMAFULL;
DEFINE FIELD name ON TABLE application TYPE string;
DEFINE FIELD description ON TABLE application TYPE string;
DEFINE FIELD color ON TABLE application TYPE string;
DEFINE FIELD icon ON TABLE application TYPE option<string>;
DEFINE FIELD created_at ON TABLE application TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE application TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Entites (organizational units, global scope)
-- =======================================================================
DEFINE TABLE entite SCHEMAFULL;
DEFINE FIELD name ON TABLE entite TYPE string;
DEFINE FIELD code ON TABLE entite TYPE string;
DEFINE FIELD email ON TABLE entite TYPE string;
DEFINE FIELD created_at ON TABLE entite TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE entite TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_entite_name ON TABLE entite COLUMNS name UNIQUE;
DEFINE INDEX idx_entite_code ON TABLE entite COLUMNS code UNIQUE;

-- =======================================================================
-- Utilisateurs (global scope, owned by an entite)
-- =======================================================================
DEFINE TABLE utilisateur SCHEMAFULL;
DEFINE FIELD last_name ON TABLE utilisateur TYPE string;
DEFINE FIELD first_name ON TABLE utilisateur TYPE string;
DEFINE FIELD login ON TABLE utilisateur TYPE string;
DEFINE FIELD email ON TABLE utilisateur TYPE string;
DEFINE FIELD status ON TABLE utilisateur TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Suspended', 'Pending'];
DEFINE FIELD expires_at ON TABLE utilisateur TYPE option<datetime>;
DEFINE FIELD profile ON TABLE utilisateur TYPE string;
DEFINE FIELD entite_id ON TABLE utilisateur TYPE string;
DEFINE FIELD created_at ON TABLE utilisateur TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE utilisateur TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_utilisateur_login ON TABLE utilisateur \
    COLUMNS login UNIQUE;
DEFINE INDEX idx_utilisateur_email ON TABLE utilisateur \
    COLUMNS email UNIQUE;
DEFINE INDEX idx_utilisateur_entite ON TABLE utilisateur \
    COLUMNS entite_id;

-- =======================================================================
-- Permissions (global scope — the only cross-application primitive)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_name ON TABLE permission COLUMNS name UNIQUE;

-- =======================================================================
-- Fonctions API (application scope — the protected operations)
-- =======================================================================
DEFINE TABLE fonction_api SCHEMAFULL;
DEFINE FIELD name ON TABLE fonction_api TYPE string;
DEFINE FIELD description ON TABLE fonction_api TYPE string;
DEFINE FIELD app_id ON TABLE fonction_api TYPE string;
DEFINE FIELD created_at ON TABLE fonction_api TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE fonction_api TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_fonction_app_name ON TABLE fonction_api \
    COLUMNS app_id, name UNIQUE;

-- =======================================================================
-- Fonction <-> Permission join
-- =======================================================================
DEFINE TABLE fonction_permission SCHEMAFULL;
DEFINE FIELD fonction_id ON TABLE fonction_permission TYPE string;
DEFINE FIELD permission_id ON TABLE fonction_permission TYPE string;
DEFINE FIELD created_at ON TABLE fonction_permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_fonction_permission_pair ON TABLE fonction_permission \
    COLUMNS fonction_id, permission_id UNIQUE;

-- =======================================================================
-- Roles (application scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD app_id ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_app_name ON TABLE role COLUMNS app_id, name UNIQUE;

-- =======================================================================
-- Role <-> Permission join
-- =======================================================================
DEFINE TABLE role_permission SCHEMAFULL;
DEFINE FIELD role_id ON TABLE role_permission TYPE string;
DEFINE FIELD permission_id ON TABLE role_permission TYPE string;
DEFINE FIELD created_at ON TABLE role_permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_permission_pair ON TABLE role_permission \
    COLUMNS role_id, permission_id UNIQUE;
DEFINE INDEX idx_role_permission_role ON TABLE role_permission \
    COLUMNS role_id;

-- =======================================================================
-- Utilisateur <-> Role grants (ternary, app_id denormalized)
-- =======================================================================
DEFINE TABLE utilisateur_role SCHEMAFULL;
DEFINE FIELD utilisateur_id ON TABLE utilisateur_role TYPE string;
DEFINE FIELD role_id ON TABLE utilisateur_role TYPE string;
DEFINE FIELD app_id ON TABLE utilisateur_role TYPE string;
DEFINE FIELD created_at ON TABLE utilisateur_role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_utilisateur_role_triple ON TABLE utilisateur_role \
    COLUMNS utilisateur_id, role_id, app_id UNIQUE;
DEFINE INDEX idx_utilisateur_role_user_app ON TABLE utilisateur_role \
    COLUMNS utilisateur_id, app_id;
DEFINE INDEX idx_utilisateur_role_role ON TABLE utilisateur_role \
    COLUMNS role_id;

-- =======================================================================
-- Codifications (reference data, global scope)
-- =======================================================================
DEFINE TABLE codification SCHEMAFULL;
DEFINE FIELD label ON TABLE codification TYPE string;
DEFINE FIELD param ON TABLE codification TYPE string;
DEFINE FIELD description ON TABLE codification TYPE string;
DEFINE FIELD created_at ON TABLE codification TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE codification TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_codification_param_label ON TABLE codification \
    COLUMNS param, label UNIQUE;

-- =======================================================================
-- Settings (user preferences, block codification deletion)
-- =======================================================================
DEFINE TABLE setting SCHEMAFULL;
DEFINE FIELD utilisateur_id ON TABLE setting TYPE string;
DEFINE FIELD codification_id ON TABLE setting TYPE string;
DEFINE FIELD created_at ON TABLE setting TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_setting_user ON TABLE setting COLUMNS utilisateur_id;
DEFINE INDEX idx_setting_codification ON TABLE setting \
    COLUMNS codification_id;

-- =======================================================================
-- Objectifs (delegation-scoped resource)
-- =======================================================================
DEFINE TABLE objectif SCHEMAFULL;
DEFINE FIELD title ON TABLE objectif TYPE string;
DEFINE FIELD description ON TABLE objectif TYPE string;
DEFINE FIELD kind ON TABLE objectif TYPE string;
DEFINE FIELD period ON TABLE objectif TYPE string;
DEFINE FIELD start_date ON TABLE objectif TYPE datetime;
DEFINE FIELD end_date ON TABLE objectif TYPE datetime;
DEFINE FIELD status ON TABLE objectif TYPE string;
DEFINE FIELD progression ON TABLE objectif TYPE float DEFAULT 0.0;
DEFINE FIELD target_value ON TABLE objectif TYPE option<float>;
DEFINE FIELD utilisateur_id ON TABLE objectif TYPE string;
DEFINE FIELD created_at ON TABLE objectif TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE objectif TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_objectif_owner ON TABLE objectif COLUMNS utilisateur_id;

-- =======================================================================
-- Traces (append-only audit stream)
-- =======================================================================
DEFINE TABLE trace SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD date ON TABLE trace TYPE datetime DEFAULT time::now();
DEFINE FIELD action ON TABLE trace TYPE string;
DEFINE FIELD detail ON TABLE trace TYPE option<string>;
DEFINE FIELD code ON TABLE trace TYPE option<string>;
DEFINE FIELD param ON TABLE trace TYPE option<string>;
DEFINE FIELD endpoint ON TABLE trace TYPE option<string>;
DEFINE FIELD utilisateur_id ON TABLE trace TYPE option<string>;
DEFINE INDEX idx_trace_date ON TABLE trace COLUMNS date;
DEFINE INDEX idx_trace_user ON TABLE trace COLUMNS utilisateur_id;
";

/// Applies any pending migrations, tracking the schema version in the
/// `_migration` table. Safe to call on every start-up.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
