//! Utilisateur domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile tag marking an administrator. Administrators bypass the
/// entite-based delegation scope entirely.
pub const ADMIN_PROFILE: &str = "Administrateur";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
            UserStatus::Suspended => "Suspended",
            UserStatus::Pending => "Pending",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utilisateur {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
    /// Directory login, globally unique. Credential verification itself
    /// happens in the external identity provider.
    pub login: String,
    /// Globally unique.
    pub email: String,
    pub status: UserStatus,
    /// `None` means the account never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Coarse override tag; see [`ADMIN_PROFILE`].
    pub profile: String,
    /// Owning organizational unit, required.
    pub entite_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Utilisateur {
    pub fn is_admin(&self) -> bool {
        self.profile == ADMIN_PROFILE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUtilisateur {
    pub last_name: String,
    pub first_name: String,
    pub login: String,
    pub email: String,
    pub status: UserStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub profile: String,
    pub entite_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUtilisateur {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub login: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub profile: Option<String>,
    pub entite_id: Option<Uuid>,
}
