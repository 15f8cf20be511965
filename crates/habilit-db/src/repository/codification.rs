//! SurrealDB implementation of [`CodificationRepository`].

use chrono::{DateTime, Utc};
use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::models::codification::{Codification, CreateCodification, UpdateCodification};
use habilit_core::repository::{CodificationRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CodificationRow {
    label: String,
    param: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CodificationRowWithId {
    record_id: String,
    label: String,
    param: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CodificationRowWithId {
    fn try_into_codification(self) -> Result<Codification, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(Codification {
            id,
            label: self.label,
            param: self.param,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn pair_conflict(param: &str, label: &str) -> HabilitError {
    HabilitError::Conflict {
        message: Bilingual::new(
            format!("Une codification avec le paramètre '{param}' et le libellé '{label}' existe déjà"),
            format!("A codification with param '{param}' and label '{label}' already exists"),
        ),
    }
}

/// SurrealDB implementation of the Codification repository.
#[derive(Clone)]
pub struct SurrealCodificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCodificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn pair_taken(
        &self,
        param: String,
        label: String,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => {
                "SELECT count() AS total FROM codification \
                 WHERE param = $param AND label = $label \
                 AND id != type::record('codification', $exclude) GROUP ALL"
            }
            None => {
                "SELECT count() AS total FROM codification \
                 WHERE param = $param AND label = $label GROUP ALL"
            }
        };

        let mut builder = self
            .db
            .query(query)
            .bind(("param", param))
            .bind(("label", label));
        if let Some(exclude) = exclude_id {
            builder = builder.bind(("exclude", exclude.to_string()));
        }

        let mut result = builder.await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> CodificationRepository for SurrealCodificationRepository<C> {
    async fn create(&self, input: CreateCodification) -> HabilitResult<Codification> {
        if self
            .pair_taken(input.param.clone(), input.label.clone(), None)
            .await?
        {
            return Err(pair_conflict(&input.param, &input.label));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('codification', $id) SET \
                 label = $label, param = $param, \
                 description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("label", input.label))
            .bind(("param", input.param))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("codification", e))?;

        let rows: Vec<CodificationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "codification".into(),
            id: id_str,
        })?;

        Ok(Codification {
            id,
            label: row.label,
            param: row.param,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> HabilitResult<Codification> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('codification', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CodificationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "codification".into(),
            id: id_str,
        })?;

        Ok(Codification {
            id,
            label: row.label,
            param: row.param,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_param(&self, param: &str) -> HabilitResult<Codification> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM codification \
                 WHERE param = $param \
                 ORDER BY label ASC",
            )
            .bind(("param", param.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CodificationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "codification".into(),
            id: param.to_string(),
        })?;

        Ok(row.try_into_codification()?)
    }

    async fn update(&self, id: Uuid, input: UpdateCodification) -> HabilitResult<Codification> {
        // The (param, label) pair must stay unique whichever half
        // changes.
        if input.param.is_some() || input.label.is_some() {
            let current = self.get_by_id(id).await?;
            let param = input.param.clone().unwrap_or(current.param);
            let label = input.label.clone().unwrap_or(current.label);
            if self.pair_taken(param.clone(), label.clone(), Some(id)).await? {
                return Err(pair_conflict(&param, &label));
            }
        }

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.label.is_some() {
            sets.push("label = $label");
        }
        if input.param.is_some() {
            sets.push("param = $param");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('codification', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(label) = input.label {
            builder = builder.bind(("label", label));
        }
        if let Some(param) = input.param {
            builder = builder.bind(("param", param));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("codification", e))?;

        let rows: Vec<CodificationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "codification".into(),
            id: id_str,
        })?;

        Ok(Codification {
            id,
            label: row.label,
            param: row.param,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        self.db
            .query("DELETE type::record('codification', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> HabilitResult<PaginatedResult<Codification>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM codification GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM codification \
                 ORDER BY param ASC, label ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CodificationRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_codification())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn search(
        &self,
        term: &str,
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<Codification>> {
        let needle = term.to_lowercase();

        let filter = "string::lowercase(label) CONTAINS $needle \
                      OR string::lowercase(param) CONTAINS $needle \
                      OR string::lowercase(description) CONTAINS $needle";

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM codification WHERE {filter} GROUP ALL"
            ))
            .bind(("needle", needle.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM codification \
                 WHERE {filter} \
                 ORDER BY param ASC, label ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("needle", needle))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CodificationRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_codification())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
