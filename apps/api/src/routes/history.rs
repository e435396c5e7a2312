use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{AiScoreRow, ResumeHistoryRow};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /api/auth/history
pub async fn resume_history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ResumeHistoryRow>>, AppError> {
    Ok(Json(state.store.list_history(&user.id).await?))
}

/// GET /api/auth/count
pub async fn resume_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CountResponse>, AppError> {
    let count = state.store.count_history(&user.id).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /api/auth/ai-score-history
pub async fn ai_score_history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<AiScoreRow>>, AppError> {
    Ok(Json(state.store.list_ai_scores(&user.id).await?))
}

/// GET /api/auth/ai-score-count
pub async fn ai_score_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CountResponse>, AppError> {
    let count = state.store.count_ai_scores(&user.id).await?;
    Ok(Json(CountResponse { count }))
}
