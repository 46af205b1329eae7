//! Liveness and dependency health endpoints.
//!
//! `/ping` answers as long as the process is up. `/deep-ping` probes the
//! store and the generation provider; overall status follows the store,
//! since the app degrades gracefully when generation is down but cannot
//! serve anything without its database.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::ports::{BreakerState, ConversationStore, GeneratorHealth, QuestionGenerator};

#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn ConversationStore>,
    pub generator: Arc<dyn QuestionGenerator>,
}

#[derive(Debug, Serialize)]
struct DependencyHealth {
    ok: bool,
    latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeepPingResponse {
    ok: bool,
    database: DependencyHealth,
    generation: GeneratorHealth,
    breaker_state: BreakerState,
}

pub async fn ping() -> &'static str {
    "ok"
}

pub async fn deep_ping(State(state): State<HealthState>) -> impl IntoResponse {
    let started = Instant::now();
    let database = match state.store.check_health().await {
        Ok(()) => DependencyHealth {
            ok: true,
            latency_ms: started.elapsed().as_millis() as u64,
            error: None,
        },
        Err(err) => DependencyHealth {
            ok: false,
            latency_ms: started.elapsed().as_millis() as u64,
            error: Some(err.to_string()),
        },
    };

    let generation = state.generator.check_health().await;
    let breaker_state = state.generator.breaker_state();

    let ok = database.ok;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(DeepPingResponse {
            ok,
            database,
            generation,
            breaker_state,
        }),
    )
}
