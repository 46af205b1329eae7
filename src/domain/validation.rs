//! Input validation for user-supplied text.
//!
//! Limits mirror what the frontend enforces; the backend bound is
//! authoritative. Length is counted in characters, not bytes, so multi-byte
//! input is not penalized.

use thiserror::Error;

/// Maximum length of a conversation title, in characters.
pub const MAX_TITLE_LENGTH: usize = 50;

/// Maximum length of a single response, in characters.
pub const MAX_RESPONSE_LENGTH: usize = 2000;

/// Rejection of user-supplied text, carrying the bound that was violated so
/// the client can surface it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters, got {actual}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

/// Trims a title and checks its bounds. Returns the trimmed title.
pub fn validate_title(title: &str, max: usize) -> Result<String, ValidationError> {
    validate_text(title, "title", max)
}

/// Trims a response and checks its bounds. Returns the trimmed response.
pub fn validate_response(response: &str, max: usize) -> Result<String, ValidationError> {
    validate_text(response, "response", max)
}

fn validate_text(text: &str, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_and_whitespace_titles_are_rejected() {
        assert_eq!(
            validate_title("", MAX_TITLE_LENGTH),
            Err(ValidationError::Empty { field: "title" })
        );
        assert_eq!(
            validate_title("   \t", MAX_TITLE_LENGTH),
            Err(ValidationError::Empty { field: "title" })
        );
    }

    #[test]
    fn title_at_limit_is_accepted_one_over_is_not() {
        let at_limit = "x".repeat(MAX_TITLE_LENGTH);
        assert_eq!(validate_title(&at_limit, MAX_TITLE_LENGTH).unwrap(), at_limit);

        let over = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert_eq!(
            validate_title(&over, MAX_TITLE_LENGTH),
            Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LENGTH,
                actual: MAX_TITLE_LENGTH + 1,
            })
        );
    }

    #[test]
    fn response_boundary_matches_title_law() {
        let at_limit = "y".repeat(MAX_RESPONSE_LENGTH);
        assert!(validate_response(&at_limit, MAX_RESPONSE_LENGTH).is_ok());
        let over = "y".repeat(MAX_RESPONSE_LENGTH + 1);
        assert!(validate_response(&over, MAX_RESPONSE_LENGTH).is_err());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_counting() {
        let padded = format!("  {}  ", "x".repeat(MAX_TITLE_LENGTH));
        assert!(validate_title(&padded, MAX_TITLE_LENGTH).is_ok());
    }

    #[test]
    fn error_message_names_the_limit() {
        let err = validate_title(&"x".repeat(60), 50).unwrap_err();
        assert!(err.to_string().contains("50"));
    }

    proptest! {
        #[test]
        fn valid_titles_come_back_trimmed(s in "\\PC{1,50}") {
            prop_assume!(!s.trim().is_empty());
            let validated = validate_title(&s, MAX_TITLE_LENGTH).unwrap();
            prop_assert_eq!(validated.as_str(), s.trim());
        }

        #[test]
        fn length_is_counted_in_chars(c in proptest::char::any()) {
            prop_assume!(!c.is_whitespace() && !c.is_control());
            let s: String = std::iter::repeat(c).take(MAX_TITLE_LENGTH).collect();
            prop_assert!(validate_title(&s, MAX_TITLE_LENGTH).is_ok());
        }
    }
}
