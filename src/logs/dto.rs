use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{FoodLogEntry, RecordOutcome};
use crate::error::AppError;
use crate::nutrition::types::{DailyTotals, ScaledNutritionItem};

#[derive(Debug, Deserialize)]
pub struct AnalyzeFoodRequest {
    pub image_base64: String,
    #[serde(default)]
    pub weight_grams: Option<f64>,
}

/// Preview of a scaled analysis. `food_name` and the totals describe the whole photo.
#[derive(Debug, Serialize)]
pub struct AnalyzeFoodResponse {
    pub food_name: String,
    pub weight_grams: f64,
    /// Of the primary (first) item.
    pub calories_per_100g: f64,
    pub total_calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub item_count: usize,
    pub items: Vec<ScaledNutritionItem>,
    pub provider: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LogFoodRequest {
    pub food_name: String,
    pub total_calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub weight_grams: f64,
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogFoodResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default, alias = "date_filter")]
    pub date: Option<String>,
}

impl LogsQuery {
    pub fn day(&self) -> Result<Option<Date>, AppError> {
        let Some(raw) = self.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        Date::parse(raw, format_description!("[year]-[month]-[day]"))
            .map(Some)
            .map_err(|_| AppError::validation(format!("date must be YYYY-MM-DD, got {raw:?}")))
    }
}

#[derive(Debug, Serialize)]
pub struct FoodLogView {
    pub log_id: Uuid,
    pub food_name: String,
    pub calories_per_100g: f64,
    pub weight_grams: f64,
    pub total_calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
}

impl FoodLogView {
    pub fn new(entry: FoodLogEntry, image_url: Option<String>) -> Self {
        Self {
            log_id: entry.log_id,
            food_name: entry.food_name,
            calories_per_100g: entry.calories_per_100g,
            weight_grams: entry.weight_grams,
            total_calories: entry.total_calories,
            protein: entry.protein,
            carbs: entry.carbs,
            fat: entry.fat,
            image_url,
            logged_at: entry.logged_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FoodLogsResponse {
    pub logs: Vec<FoodLogView>,
    pub daily_totals: DailyTotals,
}
