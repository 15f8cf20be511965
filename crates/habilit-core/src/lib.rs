//! HABILIT Core — domain models, error taxonomy, and repository traits.
//!
//! This crate has no I/O: it defines the shared vocabulary of the
//! habilitation engine. Storage lives in `habilit-db`, decision logic in
//! `habilit-engine`.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{Bilingual, HabilitError, HabilitResult};
