//! Objectif service — the delegation-scoped resource.
//!
//! Every create, every owner reassignment and every listing goes
//! through the entite rule. Listings are filtered in the store query
//! so the existence of out-of-scope objectifs never leaks.

use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::models::objectif::{CreateObjectif, Objectif, UpdateObjectif};
use habilit_core::repository::{
    ObjectifRepository, PaginatedResult, Pagination, UtilisateurRepository,
};
use uuid::Uuid;

use crate::scope::DelegationScope;

pub struct ObjectifService<O, U>
where
    O: ObjectifRepository,
    U: UtilisateurRepository,
{
    objectifs: O,
    scope: DelegationScope<U>,
}

impl<O, U> ObjectifService<O, U>
where
    O: ObjectifRepository,
    U: UtilisateurRepository,
{
    pub fn new(objectifs: O, scope: DelegationScope<U>) -> Self {
        Self { objectifs, scope }
    }

    async fn ensure_can_assign(&self, actor_id: Uuid, target_id: Uuid) -> HabilitResult<()> {
        if self.scope.can_target(actor_id, target_id).await? {
            Ok(())
        } else {
            Err(HabilitError::Forbidden {
                message: Bilingual::new(
                    "Vous n'avez pas les permissions pour assigner un objectif à cet utilisateur",
                    "You don't have permission to assign an objective to this user",
                ),
            })
        }
    }

    /// Creates an objectif after checking the actor may target the
    /// designated owner.
    pub async fn create(&self, input: CreateObjectif, actor_id: Uuid) -> HabilitResult<Objectif> {
        self.ensure_can_assign(actor_id, input.utilisateur_id)
            .await?;
        self.objectifs.create(input).await
    }

    /// Updates an objectif. Reassigning the owner re-runs the
    /// delegation check against the new owner.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateObjectif,
        actor_id: Uuid,
    ) -> HabilitResult<Objectif> {
        if let Some(new_owner) = input.utilisateur_id {
            self.ensure_can_assign(actor_id, new_owner).await?;
        }
        self.objectifs.update(id, input).await
    }

    pub async fn get(&self, id: Uuid) -> HabilitResult<Objectif> {
        self.objectifs.get_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> HabilitResult<()> {
        self.objectifs.delete(id).await
    }

    /// Lists the objectifs visible to the actor: all of them for an
    /// administrator, those owned by the actor's entite otherwise.
    pub async fn list_visible(
        &self,
        actor_id: Uuid,
        pagination: Pagination,
    ) -> HabilitResult<PaginatedResult<Objectif>> {
        if self.scope.is_admin(actor_id).await? {
            return self.objectifs.list(pagination).await;
        }

        let visible = self.scope.visible_users(actor_id).await?;
        self.objectifs.list_by_owners(&visible, pagination).await
    }

    /// The users the actor may assign objectifs to.
    pub async fn assignable_users(&self, actor_id: Uuid) -> HabilitResult<Vec<Uuid>> {
        self.scope.visible_users(actor_id).await
    }
}
