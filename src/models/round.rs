// src/models/round.rs

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{PublicQuestion, Question};

/// Which of the two timed rounds of a room session is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundKind {
    Activity,
    Exam,
}

impl RoundKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundKind::Activity => "activity",
            RoundKind::Exam => "exam",
        }
    }
}

impl fmt::Display for RoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant's view of a round: questions and their choices, permuted.
///
/// Held only for the duration of the round. It is recomputed from the seed on
/// reload, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationOrder {
    pub questions: Vec<Question>,
}

impl PresentationOrder {
    pub fn ordinals(&self) -> Vec<u32> {
        self.questions.iter().map(|q| q.ordinal).collect()
    }

    pub fn into_public(self) -> Vec<PublicQuestion> {
        self.questions.into_iter().map(PublicQuestion::from).collect()
    }
}

/// DTO for preparing a participant's round.
#[derive(Debug, Deserialize, Validate)]
pub struct PrepareRoundRequest {
    #[validate(length(min = 1, max = 128, message = "room_id must be between 1 and 128 characters."))]
    pub room_id: String,
    #[validate(length(min = 1, max = 128, message = "participant_id must be between 1 and 128 characters."))]
    pub participant_id: String,
    pub round_kind: RoundKind,
    #[validate(length(min = 1, message = "A round needs at least one question."), nested)]
    pub questions: Vec<Question>,
}

/// DTO returned to the participant's device.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoundResponse {
    pub seed: u32,
    pub round_kind: RoundKind,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for grading a finished round.
#[derive(Debug, Deserialize, Validate)]
pub struct ScoreRoundRequest {
    #[validate(length(min = 1, message = "A round needs at least one question."), nested)]
    pub questions: Vec<Question>,

    /// Key: question ordinal. Value: the choice text the participant picked.
    pub answers: HashMap<u32, String>,
}

/// Result of grading a round (one point per correct answer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScore {
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
}

/// One participant's recorded scores. A round not played yet is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ParticipantScores {
    #[validate(length(min = 1, max = 128, message = "participant_id must be between 1 and 128 characters."))]
    pub participant_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "activityScore")]
    pub activity_score: Option<u32>,
    #[serde(default, alias = "examScore")]
    pub exam_score: Option<u32>,
}

impl ParticipantScores {
    pub fn total(&self) -> u32 {
        self.activity_score
            .unwrap_or(0)
            .saturating_add(self.exam_score.unwrap_or(0))
    }
}

/// DTO for ranking a finished session.
#[derive(Debug, Deserialize, Validate)]
pub struct LeaderboardRequest {
    #[validate(nested)]
    pub participants: Vec<ParticipantScores>,
}

/// A row of the final leaderboard. Ranks are 1-based positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub participant_id: String,
    pub name: String,
    pub activity_score: u32,
    pub exam_score: u32,
    pub total: u32,
}
