//! FonctionApi domain model.
//!
//! A fonction API is a named operation belonging to exactly one
//! application — the resource being protected by the access check.
//! A fonction with no attached permission is open to every member of
//! its application (default-allow).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FonctionApi {
    pub id: Uuid,
    /// Unique within the owning application.
    pub name: String,
    pub description: String,
    pub app_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFonction {
    pub name: String,
    pub description: String,
    pub app_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateFonction {
    pub name: Option<String>,
    pub description: Option<String>,
}
