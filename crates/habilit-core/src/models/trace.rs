//! Trace domain model — the audit event stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One audit event. The trace table is append-only; writes are
/// best-effort and never fail the traced operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub action: String,
    pub detail: Option<String>,
    pub code: Option<String>,
    /// Free-form request context (parameters, decision outcome, ...).
    pub param: Option<serde_json::Value>,
    pub endpoint: Option<String>,
    pub utilisateur_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrace {
    pub action: String,
    pub detail: Option<String>,
    pub code: Option<String>,
    pub param: Option<serde_json::Value>,
    pub endpoint: Option<String>,
    pub utilisateur_id: Option<Uuid>,
}
