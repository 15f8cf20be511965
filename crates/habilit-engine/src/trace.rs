//! Best-effort audit trace recorder.
//!
//! Trace emission is strictly fire-and-forget: a failed append is
//! logged and swallowed, never surfaced to — and never rolling back —
//! the operation being traced.

use habilit_core::models::trace::CreateTrace;
use habilit_core::repository::TraceRepository;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::resolver::Decision;

pub struct TraceRecorder<T: TraceRepository> {
    traces: T,
}

impl<T: TraceRepository> TraceRecorder<T> {
    pub fn new(traces: T) -> Self {
        Self { traces }
    }

    /// Appends an event, swallowing any store failure.
    pub async fn record(&self, event: CreateTrace) {
        if let Err(error) = self.traces.append(event).await {
            warn!(%error, "failed to record trace event");
        }
    }

    /// Records one authorization decision with its full context.
    pub async fn record_decision(
        &self,
        actor_id: Uuid,
        app_id: Uuid,
        fonction_name: &str,
        decision: &Decision,
    ) {
        self.record(CreateTrace {
            action: "ACCESS_CHECK".into(),
            detail: Some(format!("authorization check for '{fonction_name}'")),
            code: Some("AUTHZ".into()),
            param: Some(json!({
                "app_id": app_id,
                "fonction": fonction_name,
                "outcome": decision.label(),
            })),
            endpoint: None,
            utilisateur_id: Some(actor_id),
        })
        .await;
    }

    /// Records one mutation with a free-form context payload.
    pub async fn record_mutation(
        &self,
        action: &str,
        actor_id: Option<Uuid>,
        param: serde_json::Value,
    ) {
        self.record(CreateTrace {
            action: action.to_string(),
            detail: None,
            code: None,
            param: Some(param),
            endpoint: None,
            utilisateur_id: actor_id,
        })
        .await;
    }
}
