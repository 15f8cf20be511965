//! SurrealDB implementation of [`UtilisateurRoleRepository`] — the
//! grant table.

use chrono::{DateTime, Utc};
use habilit_core::error::HabilitResult;
use habilit_core::models::utilisateur_role::UtilisateurRole;
use habilit_core::repository::UtilisateurRoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct GrantRowWithId {
    record_id: String,
    utilisateur_id: String,
    role_id: String,
    app_id: String,
    created_at: DateTime<Utc>,
}

impl GrantRowWithId {
    fn try_into_grant(self) -> Result<UtilisateurRole, DbError> {
        let parse = |label: &str, s: &str| {
            Uuid::parse_str(s).map_err(|e| DbError::Corrupt(format!("invalid {label} UUID: {e}")))
        };
        Ok(UtilisateurRole {
            id: parse("grant", &self.record_id)?,
            utilisateur_id: parse("utilisateur", &self.utilisateur_id)?,
            role_id: parse("role", &self.role_id)?,
            app_id: parse("app", &self.app_id)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RoleIdRow {
    role_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the UtilisateurRole repository.
#[derive(Clone)]
pub struct SurrealUtilisateurRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUtilisateurRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn triple_exists(
        &self,
        utilisateur_id: Uuid,
        role_id: Uuid,
        app_id: Uuid,
    ) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM utilisateur_role \
                 WHERE utilisateur_id = $utilisateur_id \
                 AND role_id = $role_id \
                 AND app_id = $app_id GROUP ALL",
            )
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("app_id", app_id.to_string()))
            .await?;

        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> UtilisateurRoleRepository for SurrealUtilisateurRoleRepository<C> {
    async fn assign(
        &self,
        utilisateur_id: Uuid,
        role_id: Uuid,
        app_id: Uuid,
    ) -> HabilitResult<bool> {
        // Re-assigning an already-held role is a no-op, not an error.
        if self.triple_exists(utilisateur_id, role_id, app_id).await? {
            return Ok(false);
        }

        let result = self
            .db
            .query(
                "CREATE utilisateur_role SET \
                 utilisateur_id = $utilisateur_id, \
                 role_id = $role_id, \
                 app_id = $app_id",
            )
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("app_id", app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        // The unique index on the triple absorbs the check-then-act
        // race: a concurrent identical assign is still a no-op.
        match result.check() {
            Ok(_) => Ok(true),
            Err(e) => match DbError::from_check("utilisateur_role", e) {
                DbError::UniqueViolation { .. } => Ok(false),
                other => Err(other.into()),
            },
        }
    }

    async fn remove(
        &self,
        utilisateur_id: Uuid,
        role_id: Uuid,
        app_id: Uuid,
    ) -> HabilitResult<bool> {
        if !self.triple_exists(utilisateur_id, role_id, app_id).await? {
            return Ok(false);
        }

        self.db
            .query(
                "DELETE utilisateur_role \
                 WHERE utilisateur_id = $utilisateur_id \
                 AND role_id = $role_id \
                 AND app_id = $app_id",
            )
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("app_id", app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(true)
    }

    async fn remove_all(&self, utilisateur_id: Uuid, app_id: Uuid) -> HabilitResult<()> {
        self.db
            .query(
                "DELETE utilisateur_role \
                 WHERE utilisateur_id = $utilisateur_id \
                 AND app_id = $app_id",
            )
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .bind(("app_id", app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn remove_all_for_user(&self, utilisateur_id: Uuid) -> HabilitResult<()> {
        self.db
            .query("DELETE utilisateur_role WHERE utilisateur_id = $utilisateur_id")
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn role_ids(&self, utilisateur_id: Uuid, app_id: Uuid) -> HabilitResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT role_id FROM utilisateur_role \
                 WHERE utilisateur_id = $utilisateur_id \
                 AND app_id = $app_id",
            )
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .bind(("app_id", app_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleIdRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Uuid::parse_str(&row.role_id)
                    .map_err(|e| DbError::Corrupt(format!("invalid role UUID: {e}")).into())
            })
            .collect()
    }

    async fn list_for_user(&self, utilisateur_id: Uuid) -> HabilitResult<Vec<UtilisateurRole>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM utilisateur_role \
                 WHERE utilisateur_id = $utilisateur_id \
                 ORDER BY created_at ASC",
            )
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_grant().map_err(Into::into))
            .collect()
    }

    async fn count_by_role(&self, role_id: Uuid) -> HabilitResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM utilisateur_role \
                 WHERE role_id = $role_id GROUP ALL",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
