//! HTTP adapter: REST API surface for the conversation engine.

pub mod conversation;
pub mod health;
pub mod middleware;

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::application::engine::ConversationEngine;
use crate::config::LimitsConfig;
use crate::ports::{ConversationStore, QuestionGenerator};

use conversation::ConversationAppState;
use health::HealthState;
use middleware::{identity_middleware, AdmissionControl};

/// Everything the router needs, wired once at startup.
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub store: Arc<dyn ConversationStore>,
    pub generator: Arc<dyn QuestionGenerator>,
}

/// Builds the full application router.
///
/// Conversation routes live under `/api` behind the identity middleware;
/// health endpoints sit at the root so probes need no headers.
pub fn app_router(state: AppState, limits: &LimitsConfig) -> Router {
    let admission = AdmissionControl::new(limits);

    let api = conversation::router(
        ConversationAppState {
            engine: state.engine,
        },
        admission,
    )
    .layer(from_fn(identity_middleware));

    let health = Router::new()
        .route("/ping", get(health::ping))
        .route("/deep-ping", get(health::deep_ping))
        .with_state(HealthState {
            store: state.store,
            generator: state.generator,
        });

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
