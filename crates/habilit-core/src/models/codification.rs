//! Codification domain model — shared reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reference-data entry; `(param, label)` pairs are unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codification {
    pub id: Uuid,
    pub label: String,
    pub param: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCodification {
    pub label: String,
    pub param: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCodification {
    pub label: Option<String>,
    pub param: Option<String>,
    pub description: Option<String>,
}
