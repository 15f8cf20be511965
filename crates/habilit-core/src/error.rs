//! Error types for the HABILIT engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A French/English message pair.
///
/// User-facing refusals (permission denials, uniqueness conflicts,
/// blocked deletions) are always reported in both locales; the HTTP
/// layer picks the one it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bilingual {
    pub fr: String,
    pub en: String,
}

impl Bilingual {
    pub fn new(fr: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            fr: fr.into(),
            en: en.into(),
        }
    }
}

impl fmt::Display for Bilingual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.fr, self.en)
    }
}

#[derive(Debug, Error)]
pub enum HabilitError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness rule was violated, either by the explicit pre-check
    /// or by the store's own unique index. Both surface identically.
    #[error("conflict: {message}")]
    Conflict { message: Bilingual },

    /// Deletion refused because dependent records still reference the
    /// target. The count lets callers guide the user.
    #[error("{entity} is referenced by {dependents} dependent record(s)")]
    Blocked { entity: String, dependents: u64 },

    /// Authorization or delegation-scope denial.
    #[error("forbidden: {message}")]
    Forbidden { message: Bilingual },

    /// Store unreachable or unexpected fault. Propagated, never folded
    /// into a silent deny.
    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type HabilitResult<T> = Result<T, HabilitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilingual_displays_both_locales() {
        let msg = Bilingual::new("accès refusé", "access denied");
        assert_eq!(msg.to_string(), "accès refusé / access denied");
    }

    #[test]
    fn blocked_error_reports_dependent_count() {
        let err = HabilitError::Blocked {
            entity: "entite".into(),
            dependents: 3,
        };
        assert_eq!(
            err.to_string(),
            "entite is referenced by 3 dependent record(s)"
        );
    }
}
