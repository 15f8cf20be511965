//! Grant management — assigning and removing roles, and the guarded
//! role deletion.

use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::repository::{RoleRepository, TraceRepository, UtilisateurRoleRepository, optional};
use serde_json::json;
use uuid::Uuid;

use crate::guards::DeleteOutcome;
use crate::trace::TraceRecorder;

/// Outcome of a role assignment. Re-assigning an already-held role is
/// a no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Created,
    AlreadyAssigned,
}

pub struct GrantService<G, R, T>
where
    G: UtilisateurRoleRepository,
    R: RoleRepository,
    T: TraceRepository,
{
    grants: G,
    roles: R,
    recorder: TraceRecorder<T>,
}

impl<G, R, T> GrantService<G, R, T>
where
    G: UtilisateurRoleRepository,
    R: RoleRepository,
    T: TraceRepository,
{
    pub fn new(grants: G, roles: R, recorder: TraceRecorder<T>) -> Self {
        Self {
            grants,
            roles,
            recorder,
        }
    }

    /// Grants the role to the user inside the application.
    ///
    /// The denormalized `app_id` of the grant must equal the role's
    /// owning application; a mismatch is a `Conflict`, not a silent
    /// cross-tenant grant.
    pub async fn assign_role(
        &self,
        utilisateur_id: Uuid,
        role_id: Uuid,
        app_id: Uuid,
        actor_id: Uuid,
    ) -> HabilitResult<AssignOutcome> {
        let role = self.roles.get_by_id(role_id).await?;
        if role.app_id != app_id {
            return Err(HabilitError::Conflict {
                message: Bilingual::new(
                    "Le rôle n'appartient pas à cette application",
                    "The role does not belong to this application",
                ),
            });
        }

        let created = self.grants.assign(utilisateur_id, role_id, app_id).await?;

        self.recorder
            .record_mutation(
                "ROLE_ASSIGN",
                Some(actor_id),
                json!({
                    "utilisateur_id": utilisateur_id,
                    "role_id": role_id,
                    "app_id": app_id,
                    "outcome": if created { "created" } else { "already_assigned" },
                }),
            )
            .await;

        Ok(if created {
            AssignOutcome::Created
        } else {
            AssignOutcome::AlreadyAssigned
        })
    }

    /// Removes the grant; `false` when it did not exist.
    pub async fn remove_role(
        &self,
        utilisateur_id: Uuid,
        role_id: Uuid,
        app_id: Uuid,
    ) -> HabilitResult<bool> {
        let removed = self.grants.remove(utilisateur_id, role_id, app_id).await?;

        if removed {
            self.recorder
                .record_mutation(
                    "ROLE_REMOVE",
                    None,
                    json!({
                        "utilisateur_id": utilisateur_id,
                        "role_id": role_id,
                        "app_id": app_id,
                    }),
                )
                .await;
        }

        Ok(removed)
    }

    /// Removes every grant the user holds in the application.
    pub async fn remove_all_roles(&self, utilisateur_id: Uuid, app_id: Uuid) -> HabilitResult<()> {
        self.grants.remove_all(utilisateur_id, app_id).await
    }

    /// Deletes a role unless grants still reference it.
    ///
    /// Tri-state on purpose: "not found" and "still in use" need
    /// different user-facing messages and statuses.
    pub async fn delete_role(&self, role_id: Uuid) -> HabilitResult<DeleteOutcome> {
        if optional(self.roles.get_by_id(role_id).await)?.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let dependents = self.grants.count_by_role(role_id).await?;
        if dependents > 0 {
            return Ok(DeleteOutcome::Blocked { dependents });
        }

        // Removes the role together with its role_permission rows.
        self.roles.delete(role_id).await?;

        self.recorder
            .record_mutation("ROLE_DELETE", None, json!({ "role_id": role_id }))
            .await;

        Ok(DeleteOutcome::Deleted)
    }
}
