//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::models::role::{CreateRole, Role, UpdateRole};
use habilit_core::repository::{PaginatedResult, Pagination, RoleRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    name: String,
    description: String,
    app_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    name: String,
    description: String,
    app_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let app_id = Uuid::parse_str(&self.app_id)
            .map_err(|e| DbError::Corrupt(format!("invalid app UUID: {e}")))?;
        Ok(Role {
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
            format!("Un rôle avec le nom '{name}' existe déjà pour cette application"),
            format!("A role named '{name}' already exists for this application"),
        ),
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
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
                "SELECT count() AS total FROM role \
                 WHERE app_id = $app_id AND name = $name \
                 AND id != type::record('role', $exclude) GROUP ALL"
            }
            None => {
                "SELECT count() AS total FROM role \
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

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> HabilitResult<Role> {
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
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description, \
                 app_id = $app_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("app_id", input.app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::from_check("role", e))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(Role {
            id,
            name: row.name,
            description: row.description,
            app_id: input.app_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> HabilitResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.try_into_role()?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> HabilitResult<Role> {
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

        let query = format!("UPDATE type::record('role', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::from_check("role", e))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        let app_id = Uuid::parse_str(&row.app_id)
            .map_err(|e| DbError::Corrupt(format!("invalid app UUID: {e}")))?;

        Ok(Role {
            id,
            name: row.name,
            description: row.description,
            app_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        // role_permission rows go with the role. Grant references are
        // the caller's concern (GrantService::delete_role).
        self.db
            .query(
                "DELETE role_permission WHERE role_id = $id; \
                 DELETE type::record('role', $id);",
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
    ) -> HabilitResult<PaginatedResult<Role>> {
        let app_id_str = app_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM role \
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
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE app_id = $app_id \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("app_id", app_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn permission_ids(&self, role_id: Uuid) -> HabilitResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT permission_id FROM role_permission \
                 WHERE role_id = $role_id",
            )
            .bind(("role_id", role_id.to_string()))
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

    async fn attach_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> HabilitResult<()> {
        let existing = self.permission_ids(role_id).await?;

        for permission_id in permission_ids {
            if existing.contains(permission_id) {
                continue;
            }

            let result = self
                .db
                .query(
                    "CREATE role_permission SET \
                     role_id = $role_id, \
                     permission_id = $permission_id",
                )
                .bind(("role_id", role_id.to_string()))
                .bind(("permission_id", permission_id.to_string()))
                .await
                .map_err(DbError::from)?;

            match result.check() {
                Ok(_) => {}
                Err(e) => match DbError::from_check("role_permission", e) {
                    DbError::UniqueViolation { .. } => {}
                    other => return Err(other.into()),
                },
            }
        }

        Ok(())
    }

    async fn detach_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> HabilitResult<()> {
        let ids: Vec<String> = permission_ids.iter().map(|id| id.to_string()).collect();

        self.db
            .query(
                "DELETE role_permission \
                 WHERE role_id = $role_id \
                 AND permission_id IN $permission_ids",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("permission_ids", ids))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn any_role_grants(
        &self,
        role_ids: &[Uuid],
        permission_ids: &[Uuid],
    ) -> HabilitResult<bool> {
        if role_ids.is_empty() || permission_ids.is_empty() {
            return Ok(false);
        }

        let role_ids: Vec<String> = role_ids.iter().map(|id| id.to_string()).collect();
        let permission_ids: Vec<String> = permission_ids.iter().map(|id| id.to_string()).collect();

        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM role_permission \
                 WHERE role_id IN $role_ids \
                 AND permission_id IN $permission_ids GROUP ALL",
            )
            .bind(("role_ids", role_ids))
            .bind(("permission_ids", permission_ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn count_by_app(&self, app_id: Uuid) -> HabilitResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM role \
                 WHERE app_id = $app_id GROUP ALL",
            )
            .bind(("app_id", app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
