//! SurrealDB repository implementations.

mod application;
mod codification;
mod entite;
mod fonction;
mod objectif;
mod permission;
mod role;
mod setting;
mod trace;
mod utilisateur;
mod utilisateur_role;

pub use application::SurrealApplicationRepository;
pub use codification::SurrealCodificationRepository;
pub use entite::SurrealEntiteRepository;
pub use fonction::SurrealFonctionRepository;
pub use objectif::SurrealObjectifRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use setting::SurrealSettingRepository;
pub use trace::SurrealTraceRepository;
pub use utilisateur::SurrealUtilisateurRepository;
pub use utilisateur_role::SurrealUtilisateurRoleRepository;
