use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{dto::ProfileView, repo_types::UserProfile};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    extract::AppJson,
    nutrition::energy::{energy_budget, BodyMetrics, EnergyBudget},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calorie-goal", post(calorie_goal))
        .route("/profile", get(get_profile).put(put_profile))
}

/// Public calculator; nothing is stored.
#[instrument]
pub async fn calorie_goal(
    AppJson(metrics): AppJson<BodyMetrics>,
) -> AppResult<Json<EnergyBudget>> {
    metrics.validate().map_err(AppError::Validation)?;
    Ok(Json(energy_budget(&metrics)))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<ProfileView>> {
    let profile = state
        .logs
        .get_profile(user_id)
        .await?
        .unwrap_or_else(|| UserProfile::empty(user_id));
    Ok(Json(profile.into()))
}

/// Replaces body metrics and the stored calorie goal. Streak and counters are untouched.
#[instrument(skip(state))]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(metrics): AppJson<BodyMetrics>,
) -> AppResult<Json<ProfileView>> {
    metrics.validate().map_err(AppError::Validation)?;
    let budget = energy_budget(&metrics);
    let profile = state
        .logs
        .set_body_metrics(user_id, &metrics, budget.daily_calorie_goal as f64)
        .await?;
    info!(%user_id, goal = budget.daily_calorie_goal, "profile metrics updated");
    Ok(Json(profile.into()))
}
