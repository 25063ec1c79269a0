use serde::Serialize;
use uuid::Uuid;

use super::repo_types::UserProfile;
use crate::nutrition::{
    energy::{energy_budget, BodyMetrics, EnergyBudget},
    types::Badge,
};

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub metrics: Option<BodyMetrics>,
    pub daily_calorie_goal: Option<f64>,
    /// Recomputed from `metrics` on every read.
    pub energy: Option<EnergyBudget>,
    pub streak_count: u32,
    pub total_foods_logged: u64,
    pub badges: Vec<Badge>,
}

impl From<UserProfile> for ProfileView {
    fn from(p: UserProfile) -> Self {
        Self {
            energy: p.metrics.as_ref().map(energy_budget),
            user_id: p.user_id,
            metrics: p.metrics,
            daily_calorie_goal: p.daily_calorie_goal,
            streak_count: p.streak_count,
            total_foods_logged: p.total_foods_logged,
            badges: p.badges.into_iter().collect(),
        }
    }
}
