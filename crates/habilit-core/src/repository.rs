//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups that miss return
//! [`HabilitError::NotFound`]; uniqueness violations surface as
//! [`HabilitError::Conflict`] whether they are caught by the explicit
//! pre-check or by the store's unique index.

use uuid::Uuid;

use crate::error::{HabilitError, HabilitResult};
use crate::models::{
    application::{Application, CreateApplication, UpdateApplication},
    codification::{Codification, CreateCodification, UpdateCodification},
    entite::{CreateEntite, Entite, UpdateEntite},
    fonction::{CreateFonction, FonctionApi, UpdateFonction},
    objectif::{CreateObjectif, Objectif, UpdateObjectif},
    permission::{CreatePermission, Permission, UpdatePermission},
    role::{CreateRole, Role, UpdateRole},
    setting::{CreateSetting, Setting},
    trace::{CreateTrace, Trace},
    utilisateur::{CreateUtilisateur, UpdateUtilisateur, UserStatus, Utilisateur},
    utilisateur_role::UtilisateurRole,
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenancy model
// ---------------------------------------------------------------------------

pub trait ApplicationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateApplication,
    ) -> impl Future<Output = HabilitResult<Application>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<Application>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateApplication,
    ) -> impl Future<Output = HabilitResult<Application>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Application>>> + Send;
}

pub trait EntiteRepository: Send + Sync {
    /// Fails with `Conflict` when the name or code is already taken.
    fn create(&self, input: CreateEntite) -> impl Future<Output = HabilitResult<Entite>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<Entite>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = HabilitResult<Entite>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateEntite,
    ) -> impl Future<Output = HabilitResult<Entite>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Entite>>> + Send;
}

pub trait UtilisateurRepository: Send + Sync {
    /// Fails with `Conflict` when the login or email is already taken.
    fn create(
        &self,
        input: CreateUtilisateur,
    ) -> impl Future<Output = HabilitResult<Utilisateur>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<Utilisateur>> + Send;
    fn get_by_login(&self, login: &str) -> impl Future<Output = HabilitResult<Utilisateur>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUtilisateur,
    ) -> impl Future<Output = HabilitResult<Utilisateur>> + Send;
    fn update_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> impl Future<Output = HabilitResult<Utilisateur>> + Send;
    fn extend_expiration(
        &self,
        id: Uuid,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> impl Future<Output = HabilitResult<Utilisateur>> + Send;
    /// Deletes the user together with their grants, settings and
    /// objectifs.
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Utilisateur>>> + Send;
    fn list_by_entite(
        &self,
        entite_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Utilisateur>>> + Send;
    /// Ids of every user belonging to the entite.
    fn ids_in_entite(&self, entite_id: Uuid)
    -> impl Future<Output = HabilitResult<Vec<Uuid>>> + Send;
    /// Ids of every user, for administrator-wide visibility.
    fn ids_all(&self) -> impl Future<Output = HabilitResult<Vec<Uuid>>> + Send;
    fn count_by_entite(&self, entite_id: Uuid) -> impl Future<Output = HabilitResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Capability graph
// ---------------------------------------------------------------------------

pub trait PermissionRepository: Send + Sync {
    /// Fails with `Conflict` when the name is already taken.
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = HabilitResult<Permission>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<Permission>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = HabilitResult<Permission>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = HabilitResult<Permission>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Permission>>> + Send;
}

pub trait FonctionRepository: Send + Sync {
    /// Fails with `Conflict` when `(name, app_id)` is already taken.
    fn create(
        &self,
        input: CreateFonction,
    ) -> impl Future<Output = HabilitResult<FonctionApi>> + Send;
    /// Idempotent upsert by `(name, app_id)` — the operation-registry
    /// primitive. Returns the existing fonction untouched when present.
    fn ensure(
        &self,
        input: CreateFonction,
    ) -> impl Future<Output = HabilitResult<FonctionApi>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<FonctionApi>> + Send;
    fn get_by_name(
        &self,
        app_id: Uuid,
        name: &str,
    ) -> impl Future<Output = HabilitResult<FonctionApi>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateFonction,
    ) -> impl Future<Output = HabilitResult<FonctionApi>> + Send;
    /// Deletes the fonction and its fonction_permission rows.
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list_by_app(
        &self,
        app_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<FonctionApi>>> + Send;
    /// Ids of the permissions protecting the fonction. Empty means
    /// default-allow.
    fn permission_ids(
        &self,
        fonction_id: Uuid,
    ) -> impl Future<Output = HabilitResult<Vec<Uuid>>> + Send;
    /// Attaches permissions, skipping pairs already present.
    fn attach_permissions(
        &self,
        fonction_id: Uuid,
        permission_ids: &[Uuid],
    ) -> impl Future<Output = HabilitResult<()>> + Send;
    fn detach_permissions(
        &self,
        fonction_id: Uuid,
        permission_ids: &[Uuid],
    ) -> impl Future<Output = HabilitResult<()>> + Send;
    fn count_by_app(&self, app_id: Uuid) -> impl Future<Output = HabilitResult<u64>> + Send;
}

pub trait RoleRepository: Send + Sync {
    /// Fails with `Conflict` when `(name, app_id)` is already taken.
    fn create(&self, input: CreateRole) -> impl Future<Output = HabilitResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<Role>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = HabilitResult<Role>> + Send;
    /// Deletes the role and its role_permission rows. Callers must run
    /// the grant guard first; this is the raw operation.
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list_by_app(
        &self,
        app_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Role>>> + Send;
    fn permission_ids(&self, role_id: Uuid) -> impl Future<Output = HabilitResult<Vec<Uuid>>> + Send;
    fn attach_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> impl Future<Output = HabilitResult<()>> + Send;
    fn detach_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> impl Future<Output = HabilitResult<()>> + Send;
    /// The set-intersection probe: true when any of `role_ids` is linked
    /// to any of `permission_ids` through role_permission.
    fn any_role_grants(
        &self,
        role_ids: &[Uuid],
        permission_ids: &[Uuid],
    ) -> impl Future<Output = HabilitResult<bool>> + Send;
    fn count_by_app(&self, app_id: Uuid) -> impl Future<Output = HabilitResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Assignment layer
// ---------------------------------------------------------------------------

pub trait UtilisateurRoleRepository: Send + Sync {
    /// Inserts the `(utilisateur, role, app)` triple. Returns `false`
    /// when the triple already exists (idempotent no-op).
    fn assign(
        &self,
        utilisateur_id: Uuid,
        role_id: Uuid,
        app_id: Uuid,
    ) -> impl Future<Output = HabilitResult<bool>> + Send;
    /// Removes the triple; `false` when it was absent.
    fn remove(
        &self,
        utilisateur_id: Uuid,
        role_id: Uuid,
        app_id: Uuid,
    ) -> impl Future<Output = HabilitResult<bool>> + Send;
    fn remove_all(
        &self,
        utilisateur_id: Uuid,
        app_id: Uuid,
    ) -> impl Future<Output = HabilitResult<()>> + Send;
    fn remove_all_for_user(
        &self,
        utilisateur_id: Uuid,
    ) -> impl Future<Output = HabilitResult<()>> + Send;
    /// Ids of the roles the user holds in the application.
    fn role_ids(
        &self,
        utilisateur_id: Uuid,
        app_id: Uuid,
    ) -> impl Future<Output = HabilitResult<Vec<Uuid>>> + Send;
    fn list_for_user(
        &self,
        utilisateur_id: Uuid,
    ) -> impl Future<Output = HabilitResult<Vec<UtilisateurRole>>> + Send;
    /// Number of grants referencing the role, across all users.
    fn count_by_role(&self, role_id: Uuid) -> impl Future<Output = HabilitResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Reference data & delegated resources
// ---------------------------------------------------------------------------

pub trait CodificationRepository: Send + Sync {
    /// Fails with `Conflict` when `(param, label)` is already taken.
    fn create(
        &self,
        input: CreateCodification,
    ) -> impl Future<Output = HabilitResult<Codification>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<Codification>> + Send;
    fn get_by_param(&self, param: &str)
    -> impl Future<Output = HabilitResult<Codification>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateCodification,
    ) -> impl Future<Output = HabilitResult<Codification>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Codification>>> + Send;
    /// Case-insensitive substring search over label, param and
    /// description.
    fn search(
        &self,
        term: &str,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Codification>>> + Send;
}

pub trait SettingRepository: Send + Sync {
    fn create(&self, input: CreateSetting) -> impl Future<Output = HabilitResult<Setting>> + Send;
    fn list_by_user(
        &self,
        utilisateur_id: Uuid,
    ) -> impl Future<Output = HabilitResult<Vec<Setting>>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn delete_by_user(
        &self,
        utilisateur_id: Uuid,
    ) -> impl Future<Output = HabilitResult<()>> + Send;
    /// Number of settings referencing the codification.
    fn count_by_codification(
        &self,
        codification_id: Uuid,
    ) -> impl Future<Output = HabilitResult<u64>> + Send;
}

pub trait ObjectifRepository: Send + Sync {
    fn create(&self, input: CreateObjectif)
    -> impl Future<Output = HabilitResult<Objectif>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HabilitResult<Objectif>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateObjectif,
    ) -> impl Future<Output = HabilitResult<Objectif>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HabilitResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Objectif>>> + Send;
    fn list_by_owner(
        &self,
        utilisateur_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Objectif>>> + Send;
    /// Visibility filter: only objectifs owned by one of `owner_ids`.
    /// Applied in the query, not post-hoc, so out-of-scope records never
    /// leave the store.
    fn list_by_owners(
        &self,
        owner_ids: &[Uuid],
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Objectif>>> + Send;
    fn delete_by_owner(
        &self,
        utilisateur_id: Uuid,
    ) -> impl Future<Output = HabilitResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Trace sink
// ---------------------------------------------------------------------------

pub trait TraceRepository: Send + Sync {
    fn append(&self, input: CreateTrace) -> impl Future<Output = HabilitResult<Trace>> + Send;
    /// Newest first.
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HabilitResult<PaginatedResult<Trace>>> + Send;
}

/// Convenience guard: maps a `NotFound` error to `Ok(None)`, keeping
/// every other failure. Used where absence is a normal outcome.
pub fn optional<T>(result: HabilitResult<T>) -> HabilitResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(HabilitError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
