//! Objectif domain model.
//!
//! Objectifs are the delegation-scoped resource: assigning one to
//! another user is governed by the entite rule in the engine, and
//! listing them is filtered by the same rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Initial status of a freshly created objectif.
pub const OBJECTIF_STATUS_EN_COURS: &str = "En cours";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objectif {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Objectif category (e.g. `individuel`, `collectif`).
    pub kind: String,
    /// Reporting period label (e.g. `2025`, `2025-2026`).
    pub period: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    /// Completion ratio, 0.0 to 100.0.
    pub progression: f64,
    pub value: Option<f64>,
    /// Owner — the user the objectif is assigned to.
    pub utilisateur_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateObjectif {
    pub title: String,
    pub description: String,
    pub kind: String,
    pub period: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub value: Option<f64>,
    pub utilisateur_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateObjectif {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub period: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub progression: Option<f64>,
    pub value: Option<Option<f64>>,
    /// Reassigning the owner re-triggers the delegation-scope check.
    pub utilisateur_id: Option<Uuid>,
}
