//! Integration tests for schema initialization using in-memory
//! SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    habilit_db::run_migrations(&db).await.unwrap();

    // Verify that key tables exist by querying INFO FOR DB.
    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    // Spot-check representative tables from each category.
    assert!(
        info_str.contains("application"),
        "missing application table"
    );
    assert!(info_str.contains("entite"), "missing entite table");
    assert!(
        info_str.contains("utilisateur"),
        "missing utilisateur table"
    );
    assert!(info_str.contains("permission"), "missing permission table");
    assert!(
        info_str.contains("fonction_api"),
        "missing fonction_api table"
    );
    assert!(
        info_str.contains("fonction_permission"),
        "missing fonction_permission table"
    );
    assert!(info_str.contains("role"), "missing role table");
    assert!(
        info_str.contains("role_permission"),
        "missing role_permission table"
    );
    assert!(
        info_str.contains("utilisateur_role"),
        "missing utilisateur_role table"
    );
    assert!(
        info_str.contains("codification"),
        "missing codification table"
    );
    assert!(info_str.contains("setting"), "missing setting table");
    assert!(info_str.contains("objectif"), "missing objectif table");
    assert!(info_str.contains("trace"), "missing trace table");
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    habilit_db::run_migrations(&db).await.unwrap();
    // A second run finds the recorded version and applies nothing.
    habilit_db::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn schema_v1_is_exposed_for_tests() {
    assert!(habilit_db::schema_v1().contains("DEFINE TABLE utilisateur"));
}
