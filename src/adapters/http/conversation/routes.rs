//! Route table for the conversation endpoints.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::adapters::http::middleware::{admission_middleware, AdmissionControl};

use super::handlers::{self, ConversationAppState};

/// Builds the `/conversations` router. Admission control guards only the
/// response-submission route since that is the one that fans out to the
/// generation provider.
pub fn router(state: ConversationAppState, admission: AdmissionControl) -> Router {
    let submit = Router::new()
        .route("/conversations/:id/response", post(handlers::submit_response))
        .route_layer(from_fn_with_state(admission, admission_middleware));

    Router::new()
        .route(
            "/conversations",
            post(handlers::create_conversation).get(handlers::list_conversations),
        )
        .route(
            "/conversations/:id",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .route(
            "/conversations/:id/regenerate-question",
            post(handlers::regenerate_question),
        )
        .route(
            "/conversations/:id/regenerate-summary",
            post(handlers::regenerate_summary),
        )
        .route(
            "/conversations/:id/export",
            get(handlers::export_conversation),
        )
        .merge(submit)
        .with_state(state)
}
