use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use super::AppState;
use crate::api::error::ApiResult;
use crate::api::utils::query_params;
use crate::models::{LeaderboardEntry, LeaderboardQueryParams};

#[tracing::instrument(skip(service))]
pub async fn leaderboard_handler(
    params: Result<Query<LeaderboardQueryParams>, QueryRejection>,
    State(service): State<AppState>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let params = query_params(params)?;
    let entries = service.leaderboard(params.evol_level, params.limit).await?;
    Ok(Json(entries))
}
