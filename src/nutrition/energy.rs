//! Daily calorie target from body metrics (Mifflin–St Jeor BMR × activity factor).

use serde::{Deserialize, Serialize};

/// Energy stored in one kilogram of body mass.
pub const KCAL_PER_KG: f64 = 7700.0;
/// Goal weights are approached over a fixed 12 week horizon.
pub const GOAL_HORIZON_DAYS: f64 = 84.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    /// Unknown labels fall back to sedentary.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "lightly_active" => Self::LightlyActive,
            "moderately_active" => Self::ModeratelyActive,
            "very_active" => Self::VeryActive,
            "extra_active" => Self::ExtraActive,
            _ => Self::Sedentary,
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::LightlyActive => 1.375,
            Self::ModeratelyActive => 1.55,
            Self::VeryActive => 1.725,
            Self::ExtraActive => 1.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMetrics {
    #[serde(alias = "weight")]
    pub weight_kg: f64,
    #[serde(alias = "height")]
    pub height_cm: f64,
    #[serde(alias = "age")]
    pub age_years: u32,
    pub gender: String,
    pub activity_level: String,
    #[serde(default, alias = "goal_weight")]
    pub goal_weight_kg: Option<f64>,
}

impl BodyMetrics {
    pub fn validate(&self) -> Result<(), String> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.weight_kg) {
            return Err("weight_kg must be positive".into());
        }
        if !positive(self.height_cm) {
            return Err("height_cm must be positive".into());
        }
        if self.age_years == 0 {
            return Err("age_years must be positive".into());
        }
        if matches!(self.goal_weight_kg, Some(goal) if !positive(goal)) {
            return Err("goal_weight_kg must be positive".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Maintain,
    Gain,
    Lose,
}

/// All figures in whole kcal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBudget {
    pub bmr: i64,
    pub tdee: i64,
    pub daily_calorie_goal: i64,
    pub recommendation: Recommendation,
}

/// Only "male" gets the +5 constant; every other value uses −161.
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age_years: u32, gender: &str) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years);
    if gender.trim().eq_ignore_ascii_case("male") {
        base + 5.0
    } else {
        base - 161.0
    }
}

pub fn energy_budget(metrics: &BodyMetrics) -> EnergyBudget {
    let bmr = basal_metabolic_rate(
        metrics.weight_kg,
        metrics.height_cm,
        metrics.age_years,
        &metrics.gender,
    );
    let tdee = bmr * ActivityLevel::from_label(&metrics.activity_level).multiplier();

    let (daily_goal, recommendation) = match metrics.goal_weight_kg {
        None => (tdee, Recommendation::Maintain),
        Some(goal) => {
            let delta_kg = goal - metrics.weight_kg;
            let adjustment = delta_kg * KCAL_PER_KG / GOAL_HORIZON_DAYS;
            let recommendation = if delta_kg > 0.0 {
                Recommendation::Gain
            } else {
                Recommendation::Lose
            };
            (tdee + adjustment, recommendation)
        }
    };

    EnergyBudget {
        bmr: bmr.round() as i64,
        tdee: tdee.round() as i64,
        daily_calorie_goal: daily_goal.round() as i64,
        recommendation,
    }
}
