//! Database-specific error types and conversions.

use habilit_core::error::{Bilingual, HabilitError};

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("query failed: {0}")]
    Query(String),

    /// The store's unique index rejected a write that slipped past the
    /// explicit pre-check (check-then-act race). Translated to the same
    /// `Conflict` the pre-check would have produced.
    #[error("unique index violated on {entity}")]
    UniqueViolation { entity: String },

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Classifies a statement error from `Response::check`, catching
    /// unique-index violations so the caller can fold them into the
    /// domain `Conflict`.
    pub(crate) fn from_check(entity: &str, err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("already contains") {
            DbError::UniqueViolation {
                entity: entity.to_string(),
            }
        } else {
            DbError::Query(msg)
        }
    }
}

impl From<DbError> for HabilitError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => HabilitError::NotFound { entity, id },
            DbError::UniqueViolation { entity } => HabilitError::Conflict {
                message: Bilingual::new(
                    format!("Un enregistrement '{entity}' identique existe déjà"),
                    format!("An identical '{entity}' record already exists"),
                ),
            },
            other => HabilitError::Database(other.to_string()),
        }
    }
}
