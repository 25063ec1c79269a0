use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::FromRow;
use time::Date;
use tracing::warn;
use uuid::Uuid;

use crate::nutrition::{energy::BodyMetrics, types::Badge};

/// Row of `user_profiles`. Body metric columns are null until the user sets them.
#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub age_years: Option<i32>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub goal_weight_kg: Option<f64>,
    pub daily_calorie_goal: Option<f64>,
    pub streak_count: i32,
    pub last_streak_day: Option<Date>,
    pub total_foods_logged: i64,
    pub badges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub metrics: Option<BodyMetrics>,
    pub daily_calorie_goal: Option<f64>,
    pub streak_count: u32,
    /// Last civil day that counted toward the streak.
    pub last_streak_day: Option<Date>,
    pub total_foods_logged: u64,
    pub badges: BTreeSet<Badge>,
}

impl UserProfile {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            metrics: None,
            daily_calorie_goal: None,
            streak_count: 0,
            last_streak_day: None,
            total_foods_logged: 0,
            badges: BTreeSet::new(),
        }
    }
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        let metrics = match (r.age_years, r.height_cm, r.weight_kg, r.gender, r.activity_level) {
            (Some(age), Some(height), Some(weight), Some(gender), Some(activity)) => {
                Some(BodyMetrics {
                    weight_kg: weight,
                    height_cm: height,
                    age_years: u32::try_from(age).unwrap_or(0),
                    gender,
                    activity_level: activity,
                    goal_weight_kg: r.goal_weight_kg,
                })
            }
            _ => None,
        };

        let badges = r
            .badges
            .iter()
            .filter_map(|id| match id.parse::<Badge>() {
                Ok(badge) => Some(badge),
                Err(e) => {
                    warn!(user_id = %r.user_id, error = %e, "ignoring stored badge");
                    None
                }
            })
            .collect();

        Self {
            user_id: r.user_id,
            metrics,
            daily_calorie_goal: r.daily_calorie_goal,
            streak_count: u32::try_from(r.streak_count).unwrap_or(0),
            last_streak_day: r.last_streak_day,
            total_foods_logged: u64::try_from(r.total_foods_logged).unwrap_or(0),
            badges,
        }
    }
}
