//! SurrealDB implementation of [`SettingRepository`].

use chrono::{DateTime, Utc};
use habilit_core::error::HabilitResult;
use habilit_core::models::setting::{CreateSetting, Setting};
use habilit_core::repository::SettingRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SettingRow {
    utilisateur_id: String,
    codification_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SettingRowWithId {
    record_id: String,
    utilisateur_id: String,
    codification_id: String,
    created_at: DateTime<Utc>,
}

impl SettingRowWithId {
    fn try_into_setting(self) -> Result<Setting, DbError> {
        let parse = |label: &str, s: &str| {
            Uuid::parse_str(s).map_err(|e| DbError::Corrupt(format!("invalid {label} UUID: {e}")))
        };
        Ok(Setting {
            id: parse("setting", &self.record_id)?,
            utilisateur_id: parse("utilisateur", &self.utilisateur_id)?,
            codification_id: parse("codification", &self.codification_id)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Setting repository.
#[derive(Clone)]
pub struct SurrealSettingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSettingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SettingRepository for SurrealSettingRepository<C> {
    async fn create(&self, input: CreateSetting) -> HabilitResult<Setting> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('setting', $id) SET \
                 utilisateur_id = $utilisateur_id, \
                 codification_id = $codification_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("utilisateur_id", input.utilisateur_id.to_string()))
            .bind(("codification_id", input.codification_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("setting", e))?;

        let rows: Vec<SettingRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "setting".into(),
            id: id_str,
        })?;

        Ok(Setting {
            id,
            utilisateur_id: input.utilisateur_id,
            codification_id: input.codification_id,
            created_at: row.created_at,
        })
    }

    async fn list_by_user(&self, utilisateur_id: Uuid) -> HabilitResult<Vec<Setting>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM setting \
                 WHERE utilisateur_id = $utilisateur_id \
                 ORDER BY created_at ASC",
            )
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SettingRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_setting().map_err(Into::into))
            .collect()
    }

    async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        self.db
            .query("DELETE type::record('setting', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn delete_by_user(&self, utilisateur_id: Uuid) -> HabilitResult<()> {
        self.db
            .query("DELETE setting WHERE utilisateur_id = $utilisateur_id")
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn count_by_codification(&self, codification_id: Uuid) -> HabilitResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM setting \
                 WHERE codification_id = $codification_id GROUP ALL",
            )
            .bind(("codification_id", codification_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
