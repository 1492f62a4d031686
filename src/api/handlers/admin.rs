// Admin handlers - no authentication, same as the rest of the dashboard API

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use super::AppState;
use crate::api::error::ApiResult;
use crate::domain::export::EXPORT_FILENAME;
use crate::models::AdminStats;

#[tracing::instrument(skip(service))]
pub async fn admin_stats_handler(State(service): State<AppState>) -> ApiResult<Json<AdminStats>> {
    let stats = service.admin_stats().await?;
    Ok(Json(stats))
}

/// All users as a CSV attachment
#[tracing::instrument(skip(service))]
pub async fn admin_export_handler(State(service): State<AppState>) -> ApiResult<Response> {
    let csv = service.export_users_csv().await?;
    info!(bytes = csv.len(), "Exporting users");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}
