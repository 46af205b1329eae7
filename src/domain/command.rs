//! The command catalog: ten fixed question-generation configurations.
//!
//! Each command pairs a 1-based question number with the guidance the
//! generator follows for that slot. Command 1 carries static text so the
//! opening question never needs an external call.

use once_cell::sync::Lazy;

/// One question-generation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// 1-based question slot this command drives.
    pub number: u8,
    /// Display name, used in the guidance header sent to the generator.
    pub name: &'static str,
    /// Guidance prompt steering what the generated question should probe.
    pub prompt: &'static str,
    /// Fixed question text. When present the generator returns it verbatim
    /// without a network call.
    pub static_question: Option<&'static str>,
}

static COMMANDS: Lazy<Vec<Command>> = Lazy::new(|| {
    vec![
        Command {
            number: 1,
            name: "Opening",
            prompt: "Invite the user to name what drew them to this topic at this moment.",
            static_question: Some("What brings you to explore this topic right now?"),
        },
        Command {
            number: 2,
            name: "Salience",
            prompt: "Ask what feels most unresolved or important about the situation the user \
                     described, drawing on their opening answer.",
            static_question: None,
        },
        Command {
            number: 3,
            name: "Core concern",
            prompt: "Ask the user to clarify the single core concern underneath what they have \
                     shared so far.",
            static_question: None,
        },
        Command {
            number: 4,
            name: "Assumptions",
            prompt: "Surface an assumption the user appears to be making and ask whether it \
                     might not be true.",
            static_question: None,
        },
        Command {
            number: 5,
            name: "Protection",
            prompt: "Ask what the user is trying to protect or avoid in this situation.",
            static_question: None,
        },
        Command {
            number: 6,
            name: "Perspective",
            prompt: "Ask how someone the user trusts would describe this situation from the \
                     outside.",
            static_question: None,
        },
        Command {
            number: 7,
            name: "Cost of stasis",
            prompt: "Ask what it would cost the user to leave things exactly as they are.",
            static_question: None,
        },
        Command {
            number: 8,
            name: "Small step",
            prompt: "Ask what the smallest concrete step toward change would look like.",
            static_question: None,
        },
        Command {
            number: 9,
            name: "Resources",
            prompt: "Ask what strengths, people, or past experiences the user can draw on.",
            static_question: None,
        },
        Command {
            number: 10,
            name: "Commitment",
            prompt: "Ask what the user will take away from this reflection and what they intend \
                     to do next.",
            static_question: None,
        },
    ]
});

/// Read-only lookup over the ten commands.
///
/// The catalog is compiled in, so loading cannot fail at runtime; a malformed
/// catalog is a compile-time defect rather than a serving-time one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandCatalog;

impl CommandCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Returns the command for a 1-based question number.
    ///
    /// The source is scanned rather than indexed so the lookup does not
    /// assume a contiguous or sorted catalog.
    pub fn get(&self, number: u8) -> Option<&'static Command> {
        COMMANDS.iter().find(|c| c.number == number)
    }

    /// All commands, in catalog order.
    pub fn all(&self) -> &'static [Command] {
        &COMMANDS
    }
}
