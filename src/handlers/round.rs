// src/handlers/round.rs

use axum::{Json, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::round::{LeaderboardRequest, PrepareRoundRequest, RoundResponse, ScoreRoundRequest},
    randomizer::{self, QuestionSet},
};

/// Builds one participant's view of a round.
///
/// * Snapshots the room's questions in ordinal order.
/// * Orders questions and choices from the participant's seed.
/// * Returns the questions without the correct choice.
///
/// Calling it again with the same input returns the same order, so a
/// reconnecting participant simply asks again.
pub async fn prepare_round(
    Json(payload): Json<PrepareRoundRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let set = QuestionSet::snapshot(payload.questions)?;
    let order = set.present(&payload.room_id, &payload.participant_id, payload.round_kind)?;

    tracing::debug!(
        "Prepared {} round of {} questions for {} in room {}",
        payload.round_kind,
        set.len(),
        payload.participant_id,
        payload.room_id
    );

    Ok(Json(RoundResponse {
        seed: randomizer::seed(&payload.room_id, &payload.participant_id, payload.round_kind),
        round_kind: payload.round_kind,
        questions: order.into_public(),
    }))
}

/// Grades a finished round (1 point per correct answer).
pub async fn score_round(
    Json(payload): Json<ScoreRoundRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let set = QuestionSet::snapshot(payload.questions)?;
    Ok(Json(set.score(&payload.answers)))
}

/// Ranks a finished session by combined activity and exam score.
pub async fn leaderboard(
    Json(payload): Json<LeaderboardRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    Ok(Json(randomizer::rank_leaderboard(&payload.participants)))
}
