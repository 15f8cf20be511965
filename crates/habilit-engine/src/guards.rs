//! Mutation guards — referential-integrity checks run before
//! destructive operations.
//!
//! Each guard distinguishes "target absent" from "target still
//! referenced" because the two refusals carry different user-facing
//! messages and HTTP statuses.

use habilit_core::error::{HabilitError, HabilitResult};
use habilit_core::repository::{
    ApplicationRepository, CodificationRepository, EntiteRepository, FonctionRepository,
    RoleRepository, SettingRepository, UtilisateurRepository, optional,
};
use uuid::Uuid;

/// Tri-state outcome of a guarded deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Refused: `dependents` records still reference the target.
    Blocked { dependents: u64 },
}

impl DeleteOutcome {
    /// Collapses the tri-state into a `Result` for callers that treat
    /// both refusals as errors.
    pub fn into_result(self, entity: &str) -> HabilitResult<()> {
        match self {
            DeleteOutcome::Deleted => Ok(()),
            DeleteOutcome::NotFound => Err(HabilitError::NotFound {
                entity: entity.to_string(),
                id: String::new(),
            }),
            DeleteOutcome::Blocked { dependents } => Err(HabilitError::Blocked {
                entity: entity.to_string(),
                dependents,
            }),
        }
    }
}

/// Deletes an entite unless users still belong to it.
pub async fn delete_entite(
    entites: &impl EntiteRepository,
    users: &impl UtilisateurRepository,
    entite_id: Uuid,
) -> HabilitResult<DeleteOutcome> {
    if optional(entites.get_by_id(entite_id).await)?.is_none() {
        return Ok(DeleteOutcome::NotFound);
    }

    let dependents = users.count_by_entite(entite_id).await?;
    if dependents > 0 {
        return Ok(DeleteOutcome::Blocked { dependents });
    }

    entites.delete(entite_id).await?;
    Ok(DeleteOutcome::Deleted)
}

/// Deletes a codification unless user settings still reference it.
pub async fn delete_codification(
    codifications: &impl CodificationRepository,
    settings: &impl SettingRepository,
    codification_id: Uuid,
) -> HabilitResult<DeleteOutcome> {
    if optional(codifications.get_by_id(codification_id).await)?.is_none() {
        return Ok(DeleteOutcome::NotFound);
    }

    let dependents = settings.count_by_codification(codification_id).await?;
    if dependents > 0 {
        return Ok(DeleteOutcome::Blocked { dependents });
    }

    codifications.delete(codification_id).await?;
    Ok(DeleteOutcome::Deleted)
}

/// Deletes an application unless roles or fonctions still belong to
/// it. There is no automatic cascade across the tenant boundary; the
/// administrator resolves dependents first.
pub async fn delete_application(
    applications: &impl ApplicationRepository,
    roles: &impl RoleRepository,
    fonctions: &impl FonctionRepository,
    app_id: Uuid,
) -> HabilitResult<DeleteOutcome> {
    if optional(applications.get_by_id(app_id).await)?.is_none() {
        return Ok(DeleteOutcome::NotFound);
    }

    let dependents = roles.count_by_app(app_id).await? + fonctions.count_by_app(app_id).await?;
    if dependents > 0 {
        return Ok(DeleteOutcome::Blocked { dependents });
    }

    applications.delete(app_id).await?;
    Ok(DeleteOutcome::Deleted)
}
