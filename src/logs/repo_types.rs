use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::types::Badge;

/// One logged meal. Immutable once stored; only deletion changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FoodLogEntry {
    pub log_id: Uuid,
    pub user_id: Uuid,
    pub food_name: String,        // comma-joined when several items were recognized
    pub calories_per_100g: f64,
    pub weight_grams: f64,
    pub total_calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub image_key: Option<String>, // object storage key of the photo
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
}

/// Result of recording an entry together with its streak/badge transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    pub log_id: Uuid,
    pub streak_count: u32,
    pub total_foods_logged: u64,
    pub new_badges: Vec<Badge>,
}
