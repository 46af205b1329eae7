//! System instructions and prompt assembly for the completion API.

use crate::domain::command::Command;
use crate::domain::{Message, MessageKind, QUESTION_COUNT};

/// Fixed instruction governing question generation.
pub const QUESTION_SYSTEM_PROMPT: &str = "You are a thoughtful guide leading a ten-question \
self-reflection interview. Ask exactly one open, non-judgmental question at a time. Build on \
what the user has already shared. Never give advice, never answer for the user, and keep each \
question to one or two sentences.";

/// Fixed instruction governing summary generation.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a thoughtful guide concluding a ten-question \
self-reflection interview. Write a cohesive narrative summary in the second person that \
honors the user's own words, names the themes that emerged, and closes with what the user \
said they intend to do. Do not invent details the user did not share.";

/// One wire message for the chat-completions payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant", content: content.into() }
    }
}

/// Builds the prompt for generating the question at `command.number`.
///
/// Prior history is replayed as alternating assistant (question) and user
/// (response) turns; summary messages never appear in the replay.
pub fn question_prompt(command: &Command, history: &[Message]) -> Vec<WireMessage> {
    let mut messages = vec![
        WireMessage::system(QUESTION_SYSTEM_PROMPT),
        WireMessage::system(format!(
            "Current command (Question {}/{}): {}\n{}",
            command.number, QUESTION_COUNT, command.name, command.prompt
        )),
    ];

    for msg in history {
        match msg.kind {
            MessageKind::Question { .. } => messages.push(WireMessage::assistant(&msg.content)),
            MessageKind::Response { .. } => messages.push(WireMessage::user(&msg.content)),
            MessageKind::Summary => {}
        }
    }

    messages.push(WireMessage::user(format!(
        "Generate question {} of {} following the command guidance above.",
        command.number, QUESTION_COUNT
    )));

    messages
}

/// Builds the prompt for the closing summary from the full history.
pub fn summary_prompt(history: &[Message]) -> Vec<WireMessage> {
    let mut transcript = String::new();
    for msg in history {
        match msg.kind {
            MessageKind::Question { number } => {
                transcript.push_str(&format!("Question {number}: {}\n\n", msg.content));
            }
            MessageKind::Response { .. } => {
                transcript.push_str(&format!("Response: {}\n\n", msg.content));
            }
            MessageKind::Summary => {}
        }
    }

    vec![
        WireMessage::system(SUMMARY_SYSTEM_PROMPT),
        WireMessage::user(format!(
            "Here is the complete conversation:\n\n{transcript}\nPlease provide a cohesive 2-3 \
             paragraph summary."
        )),
    ]
}
