use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use super::AppState;
use crate::api::error::ApiResult;
use crate::api::utils::query_params;
use crate::models::{Task, TaskQueryParams};

/// Active task catalog, optionally filtered with `?category=`
#[tracing::instrument(skip(service))]
pub async fn list_tasks_handler(
    params: Result<Query<TaskQueryParams>, QueryRejection>,
    State(service): State<AppState>,
) -> ApiResult<Json<Vec<Task>>> {
    let params = query_params(params)?;
    let tasks = service.list_tasks(params.category.as_deref()).await?;
    Ok(Json(tasks))
}
