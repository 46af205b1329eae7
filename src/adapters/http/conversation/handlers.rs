//! HTTP handlers for the conversation endpoints.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::application::engine::{ConversationEngine, EngineError};
use crate::domain::export::{export_filename, to_markdown};
use crate::domain::ConversationId;

use super::dto::{
    CreateConversationRequest, CreateConversationResponse, ErrorResponse,
    RegeneratedQuestionResponse, RegeneratedSummaryResponse, SubmitResponseRequest,
    SubmitResponseResponse,
};
use crate::adapters::http::middleware::RequireUser;

/// Shared state for conversation handlers.
#[derive(Clone)]
pub struct ConversationAppState {
    pub engine: Arc<ConversationEngine>,
}

/// Error envelope for the conversation routes.
///
/// Generation and storage causes are logged here and collapsed to a generic
/// 500 so provider internals never reach clients.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EngineError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            EngineError::NotFound => {
                (StatusCode::NOT_FOUND, "Conversation not found".to_string())
            }
            EngineError::AlreadyCompleted => (
                StatusCode::BAD_REQUEST,
                "Conversation already completed".to_string(),
            ),
            EngineError::NotCompleted => (
                StatusCode::BAD_REQUEST,
                "Conversation is not completed".to_string(),
            ),
            EngineError::NoActiveQuestion => (
                StatusCode::BAD_REQUEST,
                "No active question".to_string(),
            ),
            EngineError::AlreadyAnswered => (
                StatusCode::BAD_REQUEST,
                "Current question already answered".to_string(),
            ),
            EngineError::Forbidden => {
                (StatusCode::FORBIDDEN, "Permission denied".to_string())
            }
            EngineError::Generation(err) => {
                error!(error = %err, "generation failure surfaced to client as 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate content".to_string(),
                )
            }
            EngineError::Storage(err) => {
                error!(error = %err, "storage failure surfaced to client as 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

fn parse_id(raw: &str) -> Result<ConversationId, Response> {
    raw.parse::<ConversationId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid conversation ID")),
        )
            .into_response()
    })
}

/// POST /conversations
pub async fn create_conversation(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.engine.create(user_id, &body.title).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateConversationResponse {
            conversation: created.conversation,
            first_question: created.first_question,
        }),
    ))
}

/// GET /conversations
pub async fn list_conversations(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state.engine.list(user_id).await?;
    Ok(Json(conversations))
}

/// GET /conversations/:id
pub async fn get_conversation(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let conversation = state.engine.get(user_id, id).await?;
    Ok(Json(conversation).into_response())
}

/// DELETE /conversations/:id
pub async fn delete_conversation(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    state.engine.delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /conversations/:id/response
pub async fn submit_response(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<String>,
    Json(body): Json<SubmitResponseRequest>,
) -> Result<Response, ApiError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    // Detached from the request future: a client disconnect drops this
    // handler, but a generation call already in flight still completes and
    // its result is still persisted.
    let engine = state.engine.clone();
    let outcome = tokio::spawn(async move {
        engine.submit_response(user_id, id, &body.response).await
    })
    .await
    .map_err(|err| {
        error!(error = %err, "submission task aborted unexpectedly");
        EngineError::Storage(err.to_string())
    })??;
    Ok(Json(SubmitResponseResponse {
        saved_response: outcome.saved_response,
        next_question: outcome.next_question,
        is_complete: outcome.is_complete,
        summary: outcome.summary,
    })
    .into_response())
}

/// POST /conversations/:id/regenerate-question
pub async fn regenerate_question(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let question = state.engine.regenerate_question(user_id, id).await?;
    Ok(Json(RegeneratedQuestionResponse { question }).into_response())
}

/// POST /conversations/:id/regenerate-summary
pub async fn regenerate_summary(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let summary = state.engine.regenerate_summary(user_id, id).await?;
    Ok(Json(RegeneratedSummaryResponse { summary }).into_response())
}

/// GET /conversations/:id/export
pub async fn export_conversation(
    State(state): State<ConversationAppState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let conversation = state.engine.get(user_id, id).await?;
    let markdown = to_markdown(&conversation);
    let filename = export_filename(&conversation.conversation.title);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/markdown".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        markdown,
    )
        .into_response())
}
