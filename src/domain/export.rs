//! Markdown export for a finished or in-progress conversation.
//!
//! Pure rendering over the conversation and its messages; no I/O.

use std::collections::BTreeMap;

use super::conversation::ConversationWithMessages;
use super::message::{MessageKind, QUESTION_COUNT};

#[derive(Default)]
struct Slot {
    question: String,
    response: String,
}

/// Renders a conversation as a markdown document.
///
/// Questions and responses are bucketed by slot number so replay order
/// inside the document is by slot, not by raw timestamp; slot numbers
/// outside 1..=10 are ignored rather than rendered.
pub fn to_markdown(conversation: &ConversationWithMessages) -> String {
    let mut markdown = format!("# {}\n\n", conversation.conversation.title);
    markdown.push_str(&format!(
        "**Created:** {}\n\n",
        conversation
            .conversation
            .created_at
            .format("%Y-%m-%d %H:%M:%S UTC")
    ));
    markdown.push_str(&format!(
        "**Status:** {}\n\n---\n\n",
        if conversation.conversation.completed {
            "Completed"
        } else {
            "In Progress"
        }
    ));

    let mut slots: BTreeMap<u8, Slot> = BTreeMap::new();
    for msg in &conversation.messages {
        match msg.kind {
            MessageKind::Question { number } if (1..=QUESTION_COUNT).contains(&number) => {
                slots.entry(number).or_default().question = msg.content.clone();
            }
            MessageKind::Response { number } if (1..=QUESTION_COUNT).contains(&number) => {
                slots.entry(number).or_default().response = msg.content.clone();
            }
            _ => {}
        }
    }

    for (number, slot) in &slots {
        markdown.push_str(&format!("## Question {number}\n\n{}\n\n", slot.question));
        if !slot.response.is_empty() {
            markdown.push_str(&format!("### Response\n\n{}\n\n", slot.response));
        }
        markdown.push_str("---\n\n");
    }

    if let Some(summary) = &conversation.conversation.summary {
        markdown.push_str(&format!("## Summary\n\n{summary}\n\n"));
    }

    markdown
}

/// Builds a safe attachment filename from a conversation title.
///
/// Anything outside ASCII alphanumerics becomes an underscore, matching what
/// browsers accept in a Content-Disposition filename without quoting games.
pub fn export_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.md")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Conversation;
    use crate::domain::ids::UserId;
    use crate::domain::message::Message;

    fn fixture(completed: bool) -> ConversationWithMessages {
        let mut conversation = Conversation::new(UserId::new(), "Career thoughts");
        conversation.completed = completed;
        if completed {
            conversation.summary = Some("A reflective journey.".to_string());
        }
        let id = conversation.id;
        ConversationWithMessages {
            conversation,
            messages: vec![
                Message::new(id, MessageKind::Question { number: 1 }, "Why now?"),
                Message::new(id, MessageKind::Response { number: 1 }, "Because."),
                Message::new(id, MessageKind::Question { number: 2 }, "What matters?"),
            ],
        }
    }

    #[test]
    fn renders_title_status_and_slots() {
        let md = to_markdown(&fixture(false));
        assert!(md.starts_with("# Career thoughts\n"));
        assert!(md.contains("**Status:** In Progress"));
        assert!(md.contains("## Question 1\n\nWhy now?"));
        assert!(md.contains("### Response\n\nBecause."));
        assert!(md.contains("## Question 2\n\nWhat matters?"));
        assert!(!md.contains("## Summary"));
    }

    #[test]
    fn completed_conversation_includes_summary() {
        let md = to_markdown(&fixture(true));
        assert!(md.contains("**Status:** Completed"));
        assert!(md.contains("## Summary\n\nA reflective journey."));
    }

    #[test]
    fn unanswered_slot_renders_question_without_response_header() {
        let md = to_markdown(&fixture(false));
        let q2_section = md.split("## Question 2").nth(1).unwrap();
        assert!(!q2_section.contains("### Response"));
    }

    #[test]
    fn out_of_range_slot_numbers_are_ignored() {
        let mut with = fixture(false);
        let id = with.conversation.id;
        with.messages
            .push(Message::new(id, MessageKind::Question { number: 11 }, "bogus"));
        let md = to_markdown(&with);
        assert!(!md.contains("Question 11"));
    }

    #[test]
    fn filename_sanitizes_non_alphanumerics() {
        assert_eq!(export_filename("Career thoughts!"), "Career_thoughts_.md");
    }
}
