//! Entite domain model.
//!
//! An entite is an organizational unit (department, direction, agency).
//! It plays no part in authorization; it exists for delegation scoping:
//! a non-administrator may only target users of their own entite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entite {
    pub id: Uuid,
    /// Globally unique display name.
    pub name: String,
    /// Globally unique short code (e.g. `DSI`).
    pub code: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntite {
    pub name: String,
    pub code: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateEntite {
    pub name: Option<String>,
    pub code: Option<String>,
    pub email: Option<String>,
}
