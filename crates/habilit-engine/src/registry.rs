//! Operation registry — explicit, idempotent registration of
//! fonctions API.
//!
//! Registration is an explicit call made at start-up or from the first
//! request handler, never an implicit side effect of defining a
//! handler. Calling it repeatedly for the same `(app, name)` pair
//! returns the existing record untouched.

use habilit_core::error::HabilitResult;
use habilit_core::models::fonction::{CreateFonction, FonctionApi};
use habilit_core::repository::FonctionRepository;
use tracing::info;
use uuid::Uuid;

pub struct FonctionRegistry<F: FonctionRepository> {
    fonctions: F,
}

impl<F: FonctionRepository> FonctionRegistry<F> {
    pub fn new(fonctions: F) -> Self {
        Self { fonctions }
    }

    /// Ensures the fonction exists for the application, creating it
    /// with a default description when absent. A freshly registered
    /// fonction has no permissions attached and is therefore open to
    /// every member of the application until an administrator
    /// restricts it.
    pub async fn ensure_registered(
        &self,
        app_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> HabilitResult<FonctionApi> {
        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("Fonction {name}"));

        let fonction = self
            .fonctions
            .ensure(CreateFonction {
                name: name.to_string(),
                description,
                app_id,
            })
            .await?;

        info!(%app_id, fonction = name, "fonction registered");

        Ok(fonction)
    }
}
