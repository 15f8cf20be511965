//! Setting domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user preference row pointing at a codification entry. Settings
/// block the deletion of the codification they reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub id: Uuid,
    pub utilisateur_id: Uuid,
    pub codification_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSetting {
    pub utilisateur_id: Uuid,
    pub codification_id: Uuid,
}
