//! SurrealDB implementation of [`TraceRepository`].
//!
//! The trace table is append-only; the free-form `param` payload is
//! stored as a JSON string, matching the original audit stream.

use chrono::{DateTime, Utc};
use habilit_core::error::HabilitResult;
use habilit_core::models::trace::{CreateTrace, Trace};
use habilit_core::repository::{PaginatedResult, Pagination, TraceRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TraceRow {
    date: DateTime<Utc>,
    action: String,
    detail: Option<String>,
    code: Option<String>,
    param: Option<String>,
    endpoint: Option<String>,
    utilisateur_id: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct TraceRowWithId {
    record_id: String,
    date: DateTime<Utc>,
    action: String,
    detail: Option<String>,
    code: Option<String>,
    param: Option<String>,
    endpoint: Option<String>,
    utilisateur_id: Option<String>,
}

fn decode_param(raw: Option<String>) -> Result<Option<serde_json::Value>, DbError> {
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| DbError::Corrupt(format!("invalid trace param: {e}")))
    })
    .transpose()
}

fn decode_user(raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| {
        Uuid::parse_str(&s).map_err(|e| DbError::Corrupt(format!("invalid utilisateur UUID: {e}")))
    })
    .transpose()
}

impl TraceRowWithId {
    fn try_into_trace(self) -> Result<Trace, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(Trace {
            id,
            date: self.date,
            action: self.action,
            detail: self.detail,
            code: self.code,
            param: decode_param(self.param)?,
            endpoint: self.endpoint,
            utilisateur_id: decode_user(self.utilisateur_id)?,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Trace repository.
#[derive(Clone)]
pub struct SurrealTraceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTraceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TraceRepository for SurrealTraceRepository<C> {
    async fn append(&self, input: CreateTrace) -> HabilitResult<Trace> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let param = input
            .param
            .as_ref()
            .map(|value| serde_json::to_string(value))
            .transpose()
            .map_err(|e| DbError::Corrupt(format!("unserializable trace param: {e}")))?;

        let result = self
            .db
            .query(
                "CREATE type::record('trace', $id) SET \
                 action = $action, detail = $detail, code = $code, \
                 param = $param, endpoint = $endpoint, \
                 utilisateur_id = $utilisateur_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("action", input.action))
            .bind(("detail", input.detail))
            .bind(("code", input.code))
            .bind(("param", param))
            .bind(("endpoint", input.endpoint))
            .bind((
                "utilisateur_id",
                input.utilisateur_id.map(|u| u.to_string()),
            ))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::from_check("trace", e))?;

        let rows: Vec<TraceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "trace".into(),
            id: id_str,
        })?;

        Ok(Trace {
            id,
            date: row.date,
            action: row.action,
            detail: row.detail,
            code: row.code,
            param: decode_param(row.param)?,
            endpoint: row.endpoint,
            utilisateur_id: decode_user(row.utilisateur_id)?,
        })
    }

    async fn list(&self, pagination: Pagination) -> HabilitResult<PaginatedResult<Trace>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM trace GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM trace \
                 ORDER BY date DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TraceRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_trace())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
