//! Domain models for HABILIT.
//!
//! One module per aggregate. Domain nouns keep the business vocabulary
//! of the administrative backend (Entite, Utilisateur, FonctionApi,
//! Objectif); everything else is plain English.

pub mod application;
pub mod codification;
pub mod entite;
pub mod fonction;
pub mod objectif;
pub mod permission;
pub mod role;
pub mod setting;
pub mod trace;
pub mod utilisateur;
pub mod utilisateur_role;
