// User-scoped handlers: stats, claims, task completion, referrals and wallets

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use tracing::info;

use super::AppState;
use crate::api::error::ApiResult;
use crate::api::utils::{json_body, path_params};
use crate::models::{
    CompleteTaskResponse, MessageResponse, ReferralPayload, TaskWithCompletion, User, UserStats,
    WalletPayload,
};

/// Dashboard stats for a telegram user, created on first contact
#[tracing::instrument(skip(service))]
pub async fn user_me_handler(
    telegram_id: Result<Path<String>, PathRejection>,
    State(service): State<AppState>,
) -> ApiResult<Json<UserStats>> {
    let telegram_id = path_params(telegram_id)?;
    let stats = service.get_or_create_user_stats(&telegram_id).await?;
    Ok(Json(stats))
}

#[tracing::instrument(skip(service))]
pub async fn claim_handler(
    user_id: Result<Path<i64>, PathRejection>,
    State(service): State<AppState>,
) -> ApiResult<Json<UserStats>> {
    let user_id = path_params(user_id)?;
    info!("Processing claim request");
    let stats = service.claim(user_id).await?;
    Ok(Json(stats))
}

#[tracing::instrument(skip(service))]
pub async fn user_tasks_handler(
    user_id: Result<Path<i64>, PathRejection>,
    State(service): State<AppState>,
) -> ApiResult<Json<Vec<TaskWithCompletion>>> {
    let user_id = path_params(user_id)?;
    let tasks = service.list_user_tasks(user_id).await?;
    Ok(Json(tasks))
}

#[tracing::instrument(skip(service))]
pub async fn complete_task_handler(
    ids: Result<Path<(i64, i64)>, PathRejection>,
    State(service): State<AppState>,
) -> ApiResult<Json<CompleteTaskResponse>> {
    let (user_id, task_id) = path_params(ids)?;
    info!("Processing task completion");
    let response = service.complete_task(user_id, task_id).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(service, payload))]
pub async fn apply_referral_handler(
    user_id: Result<Path<i64>, PathRejection>,
    State(service): State<AppState>,
    payload: Result<Json<ReferralPayload>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = path_params(user_id)?;
    let payload = json_body(payload)?;
    service
        .apply_referral(user_id, payload.referral_code.as_deref())
        .await?;

    Ok(Json(MessageResponse {
        message: "Referral applied successfully".to_string(),
    }))
}

#[tracing::instrument(skip(service, payload))]
pub async fn connect_wallet_handler(
    user_id: Result<Path<i64>, PathRejection>,
    State(service): State<AppState>,
    payload: Result<Json<WalletPayload>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let user_id = path_params(user_id)?;
    let payload = json_body(payload)?;
    let user = service
        .connect_wallet(user_id, payload.wallet.as_deref())
        .await?;
    Ok(Json(user))
}
