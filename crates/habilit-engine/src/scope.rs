//! Delegation scoping — which users may an actor target with a
//! cross-user write?
//!
//! The rule: an administrator profile targets anyone; everyone else
//! targets only users of their own entite (themselves included). The
//! predicate is stateless and re-reads entite membership on every call,
//! so moving a user between entites takes effect immediately.

use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::repository::{UtilisateurRepository, optional};
use uuid::Uuid;

pub struct DelegationScope<U: UtilisateurRepository> {
    users: U,
}

impl<U: UtilisateurRepository> DelegationScope<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// True when the actor exists and carries the administrator
    /// profile tag. An unknown actor is simply not an administrator.
    pub async fn is_admin(&self, actor_id: Uuid) -> HabilitResult<bool> {
        match optional(self.users.get_by_id(actor_id).await)? {
            Some(actor) => Ok(actor.is_admin()),
            None => Ok(false),
        }
    }

    /// May `actor_id` name `subject_id` as the subject of a cross-user
    /// operation?
    pub async fn can_target(&self, actor_id: Uuid, subject_id: Uuid) -> HabilitResult<bool> {
        let actor = match optional(self.users.get_by_id(actor_id).await)? {
            Some(actor) => actor,
            None => return Ok(false),
        };

        if actor.is_admin() {
            return Ok(true);
        }

        // Same-entite rule; the member list includes the actor, so
        // self-targeting is always allowed.
        let members = self.users.ids_in_entite(actor.entite_id).await?;
        Ok(members.contains(&subject_id))
    }

    /// The set of users visible to the actor: everyone for an
    /// administrator, the actor's entite otherwise. Unknown actors see
    /// nobody.
    pub async fn visible_users(&self, actor_id: Uuid) -> HabilitResult<Vec<Uuid>> {
        let actor = match optional(self.users.get_by_id(actor_id).await)? {
            Some(actor) => actor,
            None => return Ok(Vec::new()),
        };

        if actor.is_admin() {
            self.users.ids_all().await
        } else {
            self.users.ids_in_entite(actor.entite_id).await
        }
    }

    /// Maps a refused `can_target` to the bilingual `Forbidden` error.
    pub async fn ensure_can_target(&self, actor_id: Uuid, subject_id: Uuid) -> HabilitResult<()> {
        if self.can_target(actor_id, subject_id).await? {
            Ok(())
        } else {
            Err(HabilitError::Forbidden {
                message: Bilingual::new(
                    "Vous n'avez pas les permissions pour cibler cet utilisateur",
                    "You don't have permission to target this user",
                ),
            })
        }
    }
}
