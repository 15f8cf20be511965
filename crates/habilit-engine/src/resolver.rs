//! Authorization resolution — "can user U invoke fonction F in
//! application A?".

use chrono::Utc;
use habilit_core::error::{Bilingual, HabilitError, HabilitResult};
use habilit_core::models::utilisateur::UserStatus;
use habilit_core::repository::{
    FonctionRepository, RoleRepository, UtilisateurRepository, UtilisateurRoleRepository, optional,
};
use tracing::debug;
use uuid::Uuid;

/// Outcome of an authorization check.
///
/// Denial is a value, never an error: absence of the user, of any role,
/// or of the fonction itself all resolve to a deny. Only store faults
/// surface as [`HabilitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The user holds no role in the application.
    NoRoleInApplication,
    /// No fonction with that name is registered for the application.
    UnknownFonction,
    /// The user's roles share no permission with the fonction.
    NoMatchingPermission,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Stable label for trace payloads and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny(DenyReason::NoRoleInApplication) => "deny:no_role_in_application",
            Decision::Deny(DenyReason::UnknownFonction) => "deny:unknown_fonction",
            Decision::Deny(DenyReason::NoMatchingPermission) => "deny:no_matching_permission",
        }
    }
}

/// Account eligibility, the coarse pre-check run before authorization
/// (expiration, status, application membership).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible { reason: Bilingual },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Authorization resolver.
///
/// Generic over repository implementations so the decision logic has no
/// dependency on the database crate. Stateless and cache-free: every
/// call reads the current graph.
pub struct AccessResolver<U, G, F, R>
where
    U: UtilisateurRepository,
    G: UtilisateurRoleRepository,
    F: FonctionRepository,
    R: RoleRepository,
{
    users: U,
    grants: G,
    fonctions: F,
    roles: R,
}

impl<U, G, F, R> AccessResolver<U, G, F, R>
where
    U: UtilisateurRepository,
    G: UtilisateurRoleRepository,
    F: FonctionRepository,
    R: RoleRepository,
{
    pub fn new(users: U, grants: G, fonctions: F, roles: R) -> Self {
        Self {
            users,
            grants,
            fonctions,
            roles,
        }
    }

    /// Decides whether the user may invoke the named fonction inside
    /// the application.
    ///
    /// A fonction with zero attached permissions is open to every
    /// holder of at least one role in the application. This
    /// default-allow is deliberate: freshly registered operations stay
    /// usable until an administrator restricts them.
    pub async fn authorize(
        &self,
        utilisateur_id: Uuid,
        app_id: Uuid,
        fonction_name: &str,
    ) -> HabilitResult<Decision> {
        // 1. Roles held by the user in this application. None: deny.
        let role_ids = self.grants.role_ids(utilisateur_id, app_id).await?;
        if role_ids.is_empty() {
            debug!(
                %utilisateur_id,
                %app_id,
                fonction = fonction_name,
                "deny: user holds no role in application"
            );
            return Ok(Decision::Deny(DenyReason::NoRoleInApplication));
        }

        // 2. The fonction must be registered before it can be
        //    authorized.
        let fonction = match optional(self.fonctions.get_by_name(app_id, fonction_name).await)? {
            Some(fonction) => fonction,
            None => {
                debug!(
                    %app_id,
                    fonction = fonction_name,
                    "deny: fonction is not registered"
                );
                return Ok(Decision::Deny(DenyReason::UnknownFonction));
            }
        };

        // 3. Permissions protecting the fonction.
        let required = self.fonctions.permission_ids(fonction.id).await?;

        // 4. Unprotected fonction: any role in the application will do.
        if required.is_empty() {
            return Ok(Decision::Allow);
        }

        // 5. Set-intersection probe over role_permission.
        if self.roles.any_role_grants(&role_ids, &required).await? {
            Ok(Decision::Allow)
        } else {
            debug!(
                %utilisateur_id,
                %app_id,
                fonction = fonction_name,
                "deny: no role of the user grants a required permission"
            );
            Ok(Decision::Deny(DenyReason::NoMatchingPermission))
        }
    }

    /// Checks account eligibility: existence, expiration, status and —
    /// when `app_id` is given — membership in the application.
    pub async fn check_eligibility(
        &self,
        utilisateur_id: Uuid,
        app_id: Option<Uuid>,
    ) -> HabilitResult<Eligibility> {
        let user = match optional(self.users.get_by_id(utilisateur_id).await)? {
            Some(user) => user,
            None => {
                return Ok(Eligibility::Ineligible {
                    reason: Bilingual::new("Utilisateur non trouvé", "User not found"),
                });
            }
        };

        if let Some(expires_at) = user.expires_at {
            if expires_at < Utc::now() {
                return Ok(Eligibility::Ineligible {
                    reason: Bilingual::new("Compte expiré", "Account expired"),
                });
            }
        }

        if user.status != UserStatus::Active {
            return Ok(Eligibility::Ineligible {
                reason: Bilingual::new(
                    format!("Compte {}", status_fr(user.status)),
                    format!("Account {}", status_en(user.status)),
                ),
            });
        }

        if let Some(app_id) = app_id {
            let role_ids = self.grants.role_ids(utilisateur_id, app_id).await?;
            if role_ids.is_empty() {
                return Ok(Eligibility::Ineligible {
                    reason: Bilingual::new(
                        "Aucun rôle pour cette application",
                        "No role for this application",
                    ),
                });
            }
        }

        Ok(Eligibility::Eligible)
    }

    /// Maps an authorization denial to the bilingual `Forbidden` error,
    /// for callers that want refusal as an error instead of a value.
    pub async fn ensure_authorized(
        &self,
        utilisateur_id: Uuid,
        app_id: Uuid,
        fonction_name: &str,
    ) -> HabilitResult<()> {
        match self.authorize(utilisateur_id, app_id, fonction_name).await? {
            Decision::Allow => Ok(()),
            Decision::Deny(_) => Err(HabilitError::Forbidden {
                message: Bilingual::new(
                    "Accès non autorisé à cette fonction",
                    "Unauthorized access to this function",
                ),
            }),
        }
    }
}

fn status_fr(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "actif",
        UserStatus::Inactive => "inactif",
        UserStatus::Suspended => "suspendu",
        UserStatus::Pending => "en attente",
    }
}

fn status_en(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "active",
        UserStatus::Inactive => "inactive",
        UserStatus::Suspended => "suspended",
        UserStatus::Pending => "pending",
    }
}
