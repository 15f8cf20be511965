//! HABILIT Engine — authorization resolution and delegation scoping.
//!
//! The engine answers two questions for the administrative backend:
//!
//! - may user U invoke the named operation F inside application A?
//!   ([`AccessResolver`])
//! - which users may U name as the subject of a cross-user write?
//!   ([`DelegationScope`], applied to objectifs by [`ObjectifService`])
//!
//! Around those sit the grant management and mutation guards
//! ([`GrantService`], [`guards`]), the idempotent operation registry
//! ([`FonctionRegistry`]), and the best-effort audit recorder
//! ([`TraceRecorder`]).
//!
//! Everything is generic over the `habilit-core` repository traits, so
//! the engine has no dependency on the database crate.

pub mod grants;
pub mod guards;
pub mod objectifs;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod trace;

pub use grants::{AssignOutcome, GrantService};
pub use guards::DeleteOutcome;
pub use objectifs::ObjectifService;
pub use registry::FonctionRegistry;
pub use resolver::{AccessResolver, Decision, DenyReason, Eligibility};
pub use scope::DelegationScope;
pub use trace::TraceRecorder;
