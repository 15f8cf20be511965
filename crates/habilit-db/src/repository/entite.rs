//! SurrealDB implementation of [`EntiteRepository`].
//!
//! Name and code are each globally unique. Uniqueness is pre-checked
//! with an explicit query; the UNIQUE indexes in the schema catch the
//! check-then-act race and are folded into the same `Conflict`.

use chrono::{DateTime, Utc};
use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::models::entite::{CreateEntite, Entite, UpdateEntite};
use habilit_core::repository::{EntiteRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct EntiteRow {
    name: String,
    code: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct EntiteRowWithId {
    record_id: String,
    name: String,
    code: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntiteRowWithId {
    fn try_into_entite(self) -> Result<Entite, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(Entite {
            id,
            name: self.name,
            code: self.code,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn name_conflict(name: &str) -> HabilitError {
    HabilitError::Conflict {
        message: Bilingual::new(
            format!("Une entité avec le nom '{name}' existe déjà"),
            format!("An entite named '{name}' already exists"),
        ),
    }
}

fn code_conflict(code: &str) -> HabilitError {
    HabilitError::Conflict {
        message: Bilingual::new(
            format!("Une entité avec le code '{code}' existe déjà"),
            format!("An entite with code '{code}' already exists"),
        ),
    }
}

/// SurrealDB implementation of the Entite repository.
#[derive(Clone)]
pub struct SurrealEntiteRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEntiteRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Counts entites matching the name or code, excluding `exclude_id`
    /// when updating an existing record.
    async fn taken(
        &self,
        column: &str,
        value: String,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => format!(
                "SELECT count() AS total FROM entite \
                 WHERE {column} = $value \
                 AND id != type::record('entite', $exclude) GROUP ALL"
            ),
            None => {
                format!("SELECT count() AS total FROM entite WHERE {column} = $value GROUP ALL")
            }
        };

        let mut builder = self.db.query(&query).bind(("value", value));
        if let Some(exclude) = exclude_id {
            builder = builder.bind(("exclude", exclude.to_string()));
        }

        let mut result = builder.await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> EntiteRepository for SurrealEntiteRepository<C> {
    async fn create(&self, input: CreateEntite) -> HabilitResult<Entite> {
        if self.taken("name", input.name.clone(), None).await? {
            return Err(name_conflict(&input.name));
        }
        if self.taken("code", input.code.clone(), None).await? {
            return Err(code_conflict(&input.code));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('entite', $id) SET \
                 name = $name, code = $code, email = $email",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("code", input.code))
            .bind(("email", input.email))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::from_check("entite", e))?;

        let rows: Vec<EntiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "entite".into(),
            id: id_str,
        })?;

        Ok(Entite {
            id,
            name: row.name,
            code: row.code,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> HabilitResult<Entite> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('entite', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "entite".into(),
            id: id_str,
        })?;

        Ok(Entite {
            id,
            name: row.name,
            code: row.code,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_code(&self, code: &str) -> HabilitResult<Entite> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM entite WHERE code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntiteRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "entite".into(),
            id: code.to_string(),
        })?;

        Ok(row.try_into_entite()?)
    }

    async fn update(&self, id: Uuid, input: UpdateEntite) -> HabilitResult<Entite> {
        if let Some(name) = &input.name {
            if self.taken("name", name.clone(), Some(id)).await? {
                return Err(name_conflict(name));
            }
        }
        if let Some(code) = &input.code {
            if self.taken("code", code.clone(), Some(id)).await? {
                return Err(code_conflict(code));
            }
        }

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.code.is_some() {
            sets.push("code = $code");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('entite', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(code) = input.code {
            builder = builder.bind(("code", code));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::from_check("entite", e))?;

        let rows: Vec<EntiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "entite".into(),
            id: id_str,
        })?;

        Ok(Entite {
            id,
            name: row.name,
            code: row.code,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        self.db
            .query("DELETE type::record('entite', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> HabilitResult<PaginatedResult<Entite>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM entite GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM entite \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntiteRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_entite())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
