use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Provider-agnostic nutrition facts for 100 g of one recognized item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalNutritionItem {
    pub name: String,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
}

/// Nutrition for an actual weighed portion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledNutritionItem {
    pub name: String,
    pub weight_grams: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Logging milestones. Once earned a badge is never revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstLog,
    WeekWarrior,
    MonthMaster,
    CenturyTracker,
}

impl Badge {
    pub const ALL: [Badge; 4] = [
        Badge::FirstLog,
        Badge::WeekWarrior,
        Badge::MonthMaster,
        Badge::CenturyTracker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Badge::FirstLog => "first_log",
            Badge::WeekWarrior => "week_warrior",
            Badge::MonthMaster => "month_master",
            Badge::CenturyTracker => "century_tracker",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Badge::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown badge: {s}"))
    }
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
