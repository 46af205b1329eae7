//! Wire types for the conversation endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::{Conversation, Message};

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub response: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationResponse {
    pub conversation: Conversation,
    pub first_question: Message,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseResponse {
    pub saved_response: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<Message>,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegeneratedQuestionResponse {
    pub question: Message,
}

#[derive(Debug, Serialize)]
pub struct RegeneratedSummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
