//! UtilisateurRole domain model — the grant fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ternary association `(utilisateur, role, application)`.
///
/// `app_id` is denormalized from the role for query convenience; it
/// must always equal the role's own `app_id`, which the grant service
/// enforces at assignment time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilisateurRole {
    pub id: Uuid,
    pub utilisateur_id: Uuid,
    pub role_id: Uuid,
    pub app_id: Uuid,
    pub created_at: DateTime<Utc>,
}
