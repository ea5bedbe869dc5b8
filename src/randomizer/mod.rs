// src/randomizer/mod.rs

//! Per-participant question and choice ordering.
//!
//! Every participant of a room sees the same questions in an order derived
//! only from `(room, participant, round)`. Nothing is stored: a reload
//! recomputes the identical order from the seed.

mod rng;
mod seed;

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{
    question::Question,
    round::{LeaderboardEntry, ParticipantScores, PresentationOrder, RoundKind, RoundScore},
};

pub use rng::DetRng;
pub use seed::{seed, seed_base, seed_of};

/// Precondition violations in round derivation. These are caller defects,
/// never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RandomizerError {
    #[error("{0} must not be empty")]
    MissingIdentifier(&'static str),
    #[error("question ordinals start at 1")]
    ZeroOrdinal,
    #[error("question ordinal {0} appears more than once")]
    DuplicateOrdinal(u32),
}

/// Returns a permutation of `items` driven by `seed`. The input is untouched.
pub fn permute<T: Clone>(items: &[T], seed: u32) -> Vec<T> {
    let mut permuted = items.to_vec();
    DetRng::from_seed(seed).shuffle(&mut permuted);
    permuted
}

/// Orders a round for one participant.
///
/// The question order uses `seed_base + ":questions"`; each question's choices
/// use `seed_base + ":q:" + ordinal`, so two questions never share a choice
/// permutation stream.
pub fn prepare_round(questions: &[Question], seed_base: &str) -> PresentationOrder {
    let ordered = permute(questions, seed_of(&format!("{seed_base}:questions")));

    let questions = ordered
        .into_iter()
        .map(|mut question| {
            if question.choices.len() >= 2 {
                let choice_seed = seed_of(&format!("{seed_base}:q:{}", question.ordinal));
                question.choices = permute(&question.choices, choice_seed);
            }
            question
        })
        .collect();

    PresentationOrder { questions }
}

/// Grades a round: one point per exact match with the correct choice.
pub fn score_round(questions: &[Question], answers: &HashMap<u32, String>) -> RoundScore {
    let correct_count = questions
        .iter()
        .filter(|q| answers.get(&q.ordinal) == Some(&q.correct_choice))
        .count() as u32;

    RoundScore {
        score: correct_count,
        correct_count,
        total_questions: questions.len() as u32,
    }
}

/// Final standings: highest `activity + exam` first, missing scores count as 0.
///
/// Ties keep the order in which participants were given.
pub fn rank_leaderboard(participants: &[ParticipantScores]) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&ParticipantScores> = participants.iter().collect();
    ranked.sort_by_key(|p| std::cmp::Reverse(p.total()));

    ranked
        .into_iter()
        .zip(1..)
        .map(|(p, rank)| LeaderboardEntry {
            rank,
            participant_id: p.participant_id.clone(),
            name: p.name.clone(),
            activity_score: p.activity_score.unwrap_or(0),
            exam_score: p.exam_score.unwrap_or(0),
            total: p.total(),
        })
        .collect()
}

/// Snapshot of a room round's questions, fixed for the session.
///
/// Questions are kept in canonical ordinal order, so the order in which the
/// document store returned them has no influence on any participant's round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    pub fn snapshot(mut questions: Vec<Question>) -> Result<Self, RandomizerError> {
        questions.sort_by_key(|q| q.ordinal);

        if questions.first().is_some_and(|q| q.ordinal == 0) {
            return Err(RandomizerError::ZeroOrdinal);
        }
        if let Some(pair) = questions.windows(2).find(|w| w[0].ordinal == w[1].ordinal) {
            return Err(RandomizerError::DuplicateOrdinal(pair[0].ordinal));
        }

        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Presentation order for one participant of one round.
    pub fn present(
        &self,
        room_id: &str,
        participant_id: &str,
        round_kind: RoundKind,
    ) -> Result<PresentationOrder, RandomizerError> {
        if room_id.is_empty() {
            return Err(RandomizerError::MissingIdentifier("room_id"));
        }
        if participant_id.is_empty() {
            return Err(RandomizerError::MissingIdentifier("participant_id"));
        }

        Ok(prepare_round(
            &self.questions,
            &seed_base(room_id, participant_id, round_kind),
        ))
    }

    pub fn score(&self, answers: &HashMap<u32, String>) -> RoundScore {
        score_round(&self.questions, answers)
    }
}
