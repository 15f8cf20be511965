//! SurrealDB implementation of [`ObjectifRepository`].
//!
//! The `list_by_owners` filter is the delegation-scope query: it
//! restricts results in the store so out-of-scope objectifs are never
//! materialized.

use chrono::{DateTime, Utc};
use habilit_core::error::HabilitResult;
use habilit_core::models::objectif::{
    CreateObjectif, OBJECTIF_STATUS_EN_COURS, Objectif, UpdateObjectif,
};
use habilit_core::repository::{ObjectifRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ObjectifRow {
    title: String,
    description: String,
    kind: String,
    period: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    progression: f64,
    target_value: Option<f64>,
    utilisateur_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ObjectifRow {
    fn into_objectif(self, id: Uuid) -> Result<Objectif, DbError> {
        let utilisateur_id = Uuid::parse_str(&self.utilisateur_id)
            .map_err(|e| DbError::Corrupt(format!("invalid utilisateur UUID: {e}")))?;
        Ok(Objectif {
            id,
            title: self.title,
            description: self.description,
            kind: self.kind,
            period: self.period,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            progression: self.progression,
            value: self.target_value,
            utilisateur_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ObjectifRowWithId {
    record_id: String,
    title: String,
    description: String,
    kind: String,
    period: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    progression: f64,
    target_value: Option<f64>,
    utilisateur_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ObjectifRowWithId {
    fn try_into_objectif(self) -> Result<Objectif, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let utilisateur_id = Uuid::parse_str(&self.utilisateur_id)
            .map_err(|e| DbError::Corrupt(format!("invalid utilisateur UUID: {e}")))?;
        Ok(Objectif {
            id,
            title: self.title,
            description: self.description,
            kind: self.kind,
            period: self.period,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            progression: self.progression,
            value: self.target_value,
            utilisateur_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

enum OwnerFilter {
    None,
    One(Uuid),
    Many(Vec<Uuid>),
}

/// SurrealDB implementation of the Objectif repository.
#[derive(Clone)]
pub struct SurrealObjectifRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealObjectifRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn page(
        &self,
        filter: OwnerFilter,
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<Objectif>> {
        let clause = match &filter {
            OwnerFilter::None => "",
            OwnerFilter::One(_) => "WHERE utilisateur_id = $owner ",
            OwnerFilter::Many(_) => "WHERE utilisateur_id IN $owners ",
        };

        let count_query = format!("SELECT count() AS total FROM objectif {clause}GROUP ALL");
        let page_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM objectif {clause}\
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );

        let mut count_builder = self.db.query(&count_query);
        match &filter {
            OwnerFilter::None => {}
            OwnerFilter::One(owner) => {
                count_builder = count_builder.bind(("owner", owner.to_string()));
            }
            OwnerFilter::Many(owners) => {
                let owners: Vec<String> = owners.iter().map(|id| id.to_string()).collect();
                count_builder = count_builder.bind(("owners", owners));
            }
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut builder = self
            .db
            .query(&page_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        match &filter {
            OwnerFilter::None => {}
            OwnerFilter::One(owner) => {
                builder = builder.bind(("owner", owner.to_string()));
            }
            OwnerFilter::Many(owners) => {
                let owners: Vec<String> = owners.iter().map(|id| id.to_string()).collect();
                builder = builder.bind(("owners", owners));
            }
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ObjectifRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_objectif())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> ObjectifRepository for SurrealObjectifRepository<C> {
    async fn create(&self, input: CreateObjectif) -> HabilitResult<Objectif> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('objectif', $id) SET \
                 title = $title, description = $description, \
                 kind = $kind, period = $period, \
                 start_date = $start_date, end_date = $end_date, \
                 status = $status, progression = 0.0, target_value = $target_value, \
                 utilisateur_id = $utilisateur_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("title", input.title))
            .bind(("description", input.description))
            .bind(("kind", input.kind))
            .bind(("period", input.period))
            .bind(("start_date", input.start_date))
            .bind(("end_date", input.end_date))
            .bind(("status", OBJECTIF_STATUS_EN_COURS))
            .bind(("target_value", input.value))
            .bind(("utilisateur_id", input.utilisateur_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("objectif", e))?;

        let rows: Vec<ObjectifRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "objectif".into(),
            id: id_str,
        })?;

        Ok(row.into_objectif(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HabilitResult<Objectif> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('objectif', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ObjectifRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "objectif".into(),
            id: id_str,
        })?;

        Ok(row.into_objectif(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateObjectif) -> HabilitResult<Objectif> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.title.is_some() {
            sets.push("title = $title");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.kind.is_some() {
            sets.push("kind = $kind");
        }
        if input.period.is_some() {
            sets.push("period = $period");
        }
        if input.start_date.is_some() {
            sets.push("start_date = $start_date");
        }
        if input.end_date.is_some() {
            sets.push("end_date = $end_date");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.progression.is_some() {
            sets.push("progression = $progression");
        }
        match input.value {
            Some(Some(_)) => sets.push("target_value = $target_value"),
            Some(None) => sets.push("target_value = NONE"),
            None => {}
        }
        if input.utilisateur_id.is_some() {
            sets.push("utilisateur_id = $utilisateur_id");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('objectif', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(title) = input.title {
            builder = builder.bind(("title", title));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(kind) = input.kind {
            builder = builder.bind(("kind", kind));
        }
        if let Some(period) = input.period {
            builder = builder.bind(("period", period));
        }
        if let Some(start_date) = input.start_date {
            builder = builder.bind(("start_date", start_date));
        }
        if let Some(end_date) = input.end_date {
            builder = builder.bind(("end_date", end_date));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status));
        }
        if let Some(progression) = input.progression {
            builder = builder.bind(("progression", progression));
        }
        if let Some(Some(value)) = input.value {
            builder = builder.bind(("target_value", value));
        }
        if let Some(utilisateur_id) = input.utilisateur_id {
            builder = builder.bind(("utilisateur_id", utilisateur_id.to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("objectif", e))?;

        let rows: Vec<ObjectifRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "objectif".into(),
            id: id_str,
        })?;

        Ok(row.into_objectif(id)?)
    }

    async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        self.db
            .query("DELETE type::record('objectif', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> HabilitResult<PaginatedResult<Objectif>> {
        self.page(OwnerFilter::None, pagination).await
    }

    async fn list_by_owner(
        &self,
        utilisateur_id: Uuid,
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<Objectif>> {
        self.page(OwnerFilter::One(utilisateur_id), pagination).await
    }

    async fn list_by_owners(
        &self,
        owner_ids: &[Uuid],
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<Objectif>> {
        if owner_ids.is_empty() {
            return Ok(PaginatedResult {
                items: Vec::new(),
                total: 0,
                offset: pagination.offset,
                limit: pagination.limit,
            });
        }
        self.page(OwnerFilter::Many(owner_ids.to_vec()), pagination)
            .await
    }

    async fn delete_by_owner(&self, utilisateur_id: Uuid) -> HabilitResult<()> {
        self.db
            .query("DELETE objectif WHERE utilisateur_id = $utilisateur_id")
            .bind(("utilisateur_id", utilisateur_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
