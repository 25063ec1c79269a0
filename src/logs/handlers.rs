use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    AnalyzeFoodRequest, AnalyzeFoodResponse, FoodLogsResponse, LogFoodRequest, LogFoodResponse,
    LogsQuery,
};
use super::services;
use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::AppJson,
    photos::services::decode_base64_image,
    state::AppState,
};

const IMAGE_BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/food-logs", get(list_logs))
        .route("/food-logs/:id", delete(delete_log))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze-food", post(analyze_food))
        .route("/food-logs", post(log_food))
        .layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT))
}

#[instrument(skip(state, body))]
pub async fn analyze_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<AnalyzeFoodRequest>,
) -> AppResult<Json<AnalyzeFoodResponse>> {
    let image = decode_base64_image(&body.image_base64)?;
    tracing::debug!(%user_id, bytes = image.len(), "analyzing food photo");
    let analysis = services::analyze_image(&state, image, body.weight_grams).await?;
    Ok(Json(analysis))
}

#[instrument(skip(state, body))]
pub async fn log_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<LogFoodRequest>,
) -> AppResult<(StatusCode, Json<LogFoodResponse>)> {
    let outcome = services::log_food(&state, user_id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(LogFoodResponse {
            message: "Food logged successfully",
            outcome,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<LogsQuery>,
) -> AppResult<Json<FoodLogsResponse>> {
    let day = query.day()?;
    Ok(Json(services::list_logs(&state, user_id, day).await?))
}

#[instrument(skip(state))]
pub async fn delete_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(log_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_log(&state, user_id, log_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
