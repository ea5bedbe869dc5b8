// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single multiple-choice question of a room round.
///
/// Questions are authored by the room creator and read back from the
/// `rooms/{roomId}/activity` and `rooms/{roomId}/exam` collections. The
/// aliases accept those documents verbatim (`number`, `question`, `answers`,
/// `correct`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// 1-based position in the creator's canonical order.
    #[serde(alias = "number")]
    #[validate(range(min = 1, message = "Question ordinal must be at least 1."))]
    pub ordinal: u32,

    #[serde(alias = "question")]
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,

    /// Answer choices as authored. Presentation order is derived per participant.
    #[serde(alias = "answers")]
    #[validate(custom(function = validate_choices))]
    pub choices: Vec<String>,

    #[serde(alias = "correct")]
    #[validate(length(min = 1, max = 500))]
    pub correct_choice: String,

    /// Hosted image shown with the prompt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub image_ref: Option<String>,
}

/// DTO for sending a question to a participant (excludes the correct choice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub ordinal: u32,
    pub prompt: String,
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl From<Question> for PublicQuestion {
    fn from(question: Question) -> Self {
        Self {
            ordinal: question.ordinal,
            prompt: question.prompt,
            choices: question.choices,
            image_ref: question.image_ref,
        }
    }
}

fn validate_choices(choices: &[String]) -> Result<(), validator::ValidationError> {
    if choices.len() < 2 {
        return Err(validator::ValidationError::new("choices_need_at_least_two"));
    }
    for choice in choices {
        if choice.len() > 500 {
            return Err(validator::ValidationError::new("choice_too_long"));
        }
    }
    Ok(())
}
