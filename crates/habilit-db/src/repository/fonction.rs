//! SurrealDB implementation of [`FonctionRepository`].

use chrono::{DateTime, Utc};
use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::models::fonction::{CreateFonction, FonctionApi, UpdateFonction};
use habilit_core::repository::{FonctionRepository, PaginatedResult, Pagination, optional};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct FonctionRow {
    name: String,
    description: String,
    app_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct FonctionRowWithId {
    record_id: String,
    name: String,
    description: String,
    app_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FonctionRowWithId {
    fn try_into_fonction(self) -> Result<FonctionApi, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let app_id = Uuid::parse_str(&self.app_id)
            .map_err(|e| DbError::Corrupt(format!("invalid app UUID: {e}")))?;
        Ok(FonctionApi {
            id,
            name: self.name,
            description: self.description,
            app_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PermissionIdRow {
    permission_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn name_conflict(name: &str) -> HabilitError {
    HabilitError::Conflict {
        message: Bilingual::new(
            format!("Une fonction avec le nom '{name}' existe déjà pour cette application"),
            format!("A fonction named '{name}' already exists for this application"),
        ),
    }
}

/// SurrealDB implementation of the FonctionApi repository.
#[derive(Clone)]
pub struct SurrealFonctionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFonctionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn name_taken(
        &self,
        app_id: Uuid,
        name: String,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => {
                "SELECT count() AS total FROM fonction_api \
                 WHERE app_id = $app_id AND name = $name \
                 AND id != type::record('fonction_api', $exclude) GROUP ALL"
            }
            None => {
                "SELECT count() AS total FROM fonction_api \
                 WHERE app_id = $app_id AND name = $name GROUP ALL"
            }
        };

        let mut builder = self
            .db
            .query(query)
            .bind(("app_id", app_id.to_string()))
            .bind(("name", name));
        if let Some(exclude) = exclude_id {
            builder = builder.bind(("exclude", exclude.to_string()));
        }

        let mut result = builder.await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> FonctionRepository for SurrealFonctionRepository<C> {
    async fn create(&self, input: CreateFonction) -> HabilitResult<FonctionApi> {
        if self
            .name_taken(input.app_id, input.name.clone(), None)
            .await?
        {
            return Err(name_conflict(&input.name));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('fonction_api', $id) SET \
                 name = $name, description = $description, \
                 app_id = $app_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("app_id", input.app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("fonction_api", e))?;

        let rows: Vec<FonctionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "fonction_api".into(),
            id: id_str,
        })?;

        Ok(FonctionApi {
            id,
            name: row.name,
            description: row.description,
            app_id: input.app_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn ensure(&self, input: CreateFonction) -> HabilitResult<FonctionApi> {
        // Fast path: already registered.
        if let Some(existing) = optional(self.get_by_name(input.app_id, &input.name).await)? {
            return Ok(existing);
        }

        // Create, falling back to a re-read when a concurrent caller
        // registered the same fonction between the lookup and the write.
        let app_id = input.app_id;
        let name = input.name.clone();
        match self.create(input).await {
            Ok(fonction) => Ok(fonction),
            Err(HabilitError::Conflict { .. }) => self.get_by_name(app_id, &name).await,
            Err(e) => Err(e),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> HabilitResult<FonctionApi> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('fonction_api', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FonctionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "fonction_api".into(),
            id: id_str,
        })?;

        Ok(row.try_into_fonction()?)
    }

    async fn get_by_name(&self, app_id: Uuid, name: &str) -> HabilitResult<FonctionApi> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM fonction_api \
                 WHERE app_id = $app_id AND name = $name",
            )
            .bind(("app_id", app_id.to_string()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FonctionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "fonction_api".into(),
            id: name.to_string(),
        })?;

        Ok(row.try_into_fonction()?)
    }

    async fn update(&self, id: Uuid, input: UpdateFonction) -> HabilitResult<FonctionApi> {
        if let Some(name) = &input.name {
            let current = self.get_by_id(id).await?;
            if self
                .name_taken(current.app_id, name.clone(), Some(id))
                .await?
            {
                return Err(name_conflict(name));
            }
        }

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('fonction_api', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("fonction_api", e))?;

        let rows: Vec<FonctionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "fonction_api".into(),
            id: id_str.clone(),
        })?;

        let app_id = Uuid::parse_str(&row.app_id)
            .map_err(|e| DbError::Corrupt(format!("invalid app UUID: {e}")))?;

        Ok(FonctionApi {
            id,
            name: row.name,
            description: row.description,
            app_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        // fonction_permission rows are cascade-deleted with the fonction.
        self.db
            .query(
                "DELETE fonction_permission WHERE fonction_id = $id; \
                 DELETE type::record('fonction_api', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_by_app(
        &self,
        app_id: Uuid,
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<FonctionApi>> {
        let app_id_str = app_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM fonction_api \
                 WHERE app_id = $app_id GROUP ALL",
            )
            .bind(("app_id", app_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM fonction_api \
                 WHERE app_id = $app_id \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("app_id", app_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FonctionRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_fonction())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn permission_ids(&self, fonction_id: Uuid) -> HabilitResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT permission_id FROM fonction_permission \
                 WHERE fonction_id = $fonction_id",
            )
            .bind(("fonction_id", fonction_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionIdRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Uuid::parse_str(&row.permission_id)
                    .map_err(|e| DbError::Corrupt(format!("invalid permission UUID: {e}")).into())
            })
            .collect()
    }

    async fn attach_permissions(
        &self,
        fonction_id: Uuid,
        permission_ids: &[Uuid],
    ) -> HabilitResult<()> {
        let existing = self.permission_ids(fonction_id).await?;

        for permission_id in permission_ids {
            if existing.contains(permission_id) {
                continue;
            }

            let result = self
                .db
                .query(
                    "CREATE fonction_permission SET \
                     fonction_id = $fonction_id, \
                     permission_id = $permission_id",
                )
                .bind(("fonction_id", fonction_id.to_string()))
                .bind(("permission_id", permission_id.to_string()))
                .await
                .map_err(DbError::from)?;

            // A concurrent attach of the same pair trips the unique
            // index; that is the outcome we wanted anyway.
            match result.check() {
                Ok(_) => {}
                Err(e) => match DbError::from_check("fonction_permission", e) {
                    DbError::UniqueViolation { .. } => {}
                    other => return Err(other.into()),
                },
            }
        }

        Ok(())
    }

    async fn detach_permissions(
        &self,
        fonction_id: Uuid,
        permission_ids: &[Uuid],
    ) -> HabilitResult<()> {
        let ids: Vec<String> = permission_ids.iter().map(|id| id.to_string()).collect();

        self.db
            .query(
                "DELETE fonction_permission \
                 WHERE fonction_id = $fonction_id \
                 AND permission_id IN $permission_ids",
            )
            .bind(("fonction_id", fonction_id.to_string()))
            .bind(("permission_ids", ids))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn count_by_app(&self, app_id: Uuid) -> HabilitResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM fonction_api \
                 WHERE app_id = $app_id GROUP ALL",
            )
            .bind(("app_id", app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
