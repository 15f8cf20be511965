//! SurrealDB implementation of [`UtilisateurRepository`].

use chrono::{DateTime, Utc};
use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::models::utilisateur::{
    CreateUtilisateur, UpdateUtilisateur, UserStatus, Utilisateur,
};
use habilit_core::repository::{PaginatedResult, Pagination, UtilisateurRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UtilisateurRow {
    last_name: String,
    first_name: String,
    login: String,
    email: String,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    profile: String,
    entite_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UtilisateurRowWithId {
    record_id: String,
    last_name: String,
    first_name: String,
    login: String,
    email: String,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    profile: String,
    entite_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_status(s: &str) -> Result<UserStatus, DbError> {
    match s {
        "Active" => Ok(UserStatus::Active),
        "Inactive" => Ok(UserStatus::Inactive),
        "Suspended" => Ok(UserStatus::Suspended),
        "Pending" => Ok(UserStatus::Pending),
        other => Err(DbError::Corrupt(format!("unknown user status: {other}"))),
    }
}

impl UtilisateurRow {
    fn into_utilisateur(self, id: Uuid) -> Result<Utilisateur, DbError> {
        let entite_id = Uuid::parse_str(&self.entite_id)
            .map_err(|e| DbError::Corrupt(format!("invalid entite UUID: {e}")))?;
        Ok(Utilisateur {
            id,
            last_name: self.last_name,
            first_name: self.first_name,
            login: self.login,
            email: self.email,
            status: parse_status(&self.status)?,
            expires_at: self.expires_at,
            profile: self.profile,
            entite_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UtilisateurRowWithId {
    fn try_into_utilisateur(self) -> Result<Utilisateur, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let entite_id = Uuid::parse_str(&self.entite_id)
            .map_err(|e| DbError::Corrupt(format!("invalid entite UUID: {e}")))?;
        Ok(Utilisateur {
            id,
            last_name: self.last_name,
            first_name: self.first_name,
            login: self.login,
            email: self.email,
            status: parse_status(&self.status)?,
            expires_at: self.expires_at,
            profile: self.profile,
            entite_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn login_conflict(login: &str) -> HabilitError {
    HabilitError::Conflict {
        message: Bilingual::new(
            format!("Un utilisateur avec le login '{login}' existe déjà"),
            format!("A user with login '{login}' already exists"),
        ),
    }
}

fn email_conflict(email: &str) -> HabilitError {
    HabilitError::Conflict {
        message: Bilingual::new(
            format!("Un utilisateur avec l'email '{email}' existe déjà"),
            format!("A user with email '{email}' already exists"),
        ),
    }
}

/// SurrealDB implementation of the Utilisateur repository.
#[derive(Clone)]
pub struct SurrealUtilisateurRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUtilisateurRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn taken(
        &self,
        column: &str,
        value: String,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => format!(
                "SELECT count() AS total FROM utilisateur \
                 WHERE {column} = $value \
                 AND id != type::record('utilisateur', $exclude) GROUP ALL"
            ),
            None => format!(
                "SELECT count() AS total FROM utilisateur WHERE {column} = $value GROUP ALL"
            ),
        };

        let mut builder = self.db.query(&query).bind(("value", value));
        if let Some(exclude) = exclude_id {
            builder = builder.bind(("exclude", exclude.to_string()));
        }

        let mut result = builder.await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn fetch(&self, id: Uuid) -> HabilitResult<Utilisateur> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('utilisateur', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UtilisateurRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "utilisateur".into(),
            id: id_str,
        })?;

        Ok(row.into_utilisateur(id)?)
    }

    async fn page(
        &self,
        filter_entite: Option<Uuid>,
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<Utilisateur>> {
        let (count_query, page_query) = match filter_entite {
            Some(_) => (
                "SELECT count() AS total FROM utilisateur \
                 WHERE entite_id = $entite_id GROUP ALL",
                "SELECT meta::id(id) AS record_id, * FROM utilisateur \
                 WHERE entite_id = $entite_id \
                 ORDER BY login ASC \
                 LIMIT $limit START $offset",
            ),
            None => (
                "SELECT count() AS total FROM utilisateur GROUP ALL",
                "SELECT meta::id(id) AS record_id, * FROM utilisateur \
                 ORDER BY login ASC \
                 LIMIT $limit START $offset",
            ),
        };

        let mut count_builder = self.db.query(count_query);
        if let Some(entite_id) = filter_entite {
            count_builder = count_builder.bind(("entite_id", entite_id.to_string()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut builder = self
            .db
            .query(page_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(entite_id) = filter_entite {
            builder = builder.bind(("entite_id", entite_id.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<UtilisateurRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_utilisateur())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> UtilisateurRepository for SurrealUtilisateurRepository<C> {
    async fn create(&self, input: CreateUtilisateur) -> HabilitResult<Utilisateur> {
        if self.taken("login", input.login.clone(), None).await? {
            return Err(login_conflict(&input.login));
        }
        if self.taken("email", input.email.clone(), None).await? {
            return Err(email_conflict(&input.email));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('utilisateur', $id) SET \
                 last_name = $last_name, first_name = $first_name, \
                 login = $login, email = $email, status = $status, \
                 expires_at = $expires_at, profile = $profile, \
                 entite_id = $entite_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("last_name", input.last_name))
            .bind(("first_name", input.first_name))
            .bind(("login", input.login))
            .bind(("email", input.email))
            .bind(("status", input.status.as_str()))
            .bind(("expires_at", input.expires_at))
            .bind(("profile", input.profile))
            .bind(("entite_id", input.entite_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("utilisateur", e))?;

        let rows: Vec<UtilisateurRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "utilisateur".into(),
            id: id_str,
        })?;

        Ok(row.into_utilisateur(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HabilitResult<Utilisateur> {
        self.fetch(id).await
    }

    async fn get_by_login(&self, login: &str) -> HabilitResult<Utilisateur> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM utilisateur WHERE login = $login")
            .bind(("login", login.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UtilisateurRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "utilisateur".into(),
            id: login.to_string(),
        })?;

        Ok(row.try_into_utilisateur()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUtilisateur) -> HabilitResult<Utilisateur> {
        if let Some(login) = &input.login {
            if self.taken("login", login.clone(), Some(id)).await? {
                return Err(login_conflict(login));
            }
        }
        if let Some(email) = &input.email {
            if self.taken("email", email.clone(), Some(id)).await? {
                return Err(email_conflict(email));
            }
        }

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.login.is_some() {
            sets.push("login = $login");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        match input.expires_at {
            Some(Some(_)) => sets.push("expires_at = $expires_at"),
            Some(None) => sets.push("expires_at = NONE"),
            None => {}
        }
        if input.profile.is_some() {
            sets.push("profile = $profile");
        }
        if input.entite_id.is_some() {
            sets.push("entite_id = $entite_id");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('utilisateur', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(login) = input.login {
            builder = builder.bind(("login", login));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(Some(expires_at)) = input.expires_at {
            builder = builder.bind(("expires_at", expires_at));
        }
        if let Some(profile) = input.profile {
            builder = builder.bind(("profile", profile));
        }
        if let Some(entite_id) = input.entite_id {
            builder = builder.bind(("entite_id", entite_id.to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("utilisateur", e))?;

        let rows: Vec<UtilisateurRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "utilisateur".into(),
            id: id_str,
        })?;

        Ok(row.into_utilisateur(id)?)
    }

    async fn update_status(&self, id: Uuid, status: UserStatus) -> HabilitResult<Utilisateur> {
        self.update(
            id,
            UpdateUtilisateur {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    async fn extend_expiration(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> HabilitResult<Utilisateur> {
        self.update(
            id,
            UpdateUtilisateur {
                expires_at: Some(expires_at),
                ..Default::default()
            },
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        // Existence check so a missing user surfaces as NotFound rather
        // than a silent no-op delete.
        self.fetch(id).await?;

        let id_str = id.to_string();

        // Cascade: grants, settings and objectifs go with the user.
        self.db
            .query(
                "DELETE utilisateur_role WHERE utilisateur_id = $id; \
                 DELETE setting WHERE utilisateur_id = $id; \
                 DELETE objectif WHERE utilisateur_id = $id; \
                 DELETE type::record('utilisateur', $id);",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> HabilitResult<PaginatedResult<Utilisateur>> {
        self.page(None, pagination).await
    }

    async fn list_by_entite(
        &self,
        entite_id: Uuid,
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<Utilisateur>> {
        self.page(Some(entite_id), pagination).await
    }

    async fn ids_in_entite(&self, entite_id: Uuid) -> HabilitResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM utilisateur \
                 WHERE entite_id = $entite_id",
            )
            .bind(("entite_id", entite_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Uuid::parse_str(&row.record_id)
                    .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")).into())
            })
            .collect()
    }

    async fn ids_all(&self) -> HabilitResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id FROM utilisateur")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Uuid::parse_str(&row.record_id)
                    .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")).into())
            })
            .collect()
    }

    async fn count_by_entite(&self, entite_id: Uuid) -> HabilitResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM utilisateur \
                 WHERE entite_id = $entite_id GROUP ALL",
            )
            .bind(("entite_id", entite_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
