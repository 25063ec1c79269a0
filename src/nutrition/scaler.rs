use serde::Serialize;

use super::error::NutritionError;
use super::types::{round1, CanonicalNutritionItem, ScaledNutritionItem};

pub const DEFAULT_PORTION_GRAMS: f64 = 100.0;

/// Scaled items of one analysis plus their field-wise sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledPortion {
    pub items: Vec<ScaledNutritionItem>,
    pub total: ScaledNutritionItem,
}

impl ScaledPortion {
    /// An all-zero total is also what an empty analysis produces; check this instead.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Absent weight means a 100 g portion. An explicit non-positive weight is rejected.
pub fn resolve_weight(requested: Option<f64>) -> Result<f64, NutritionError> {
    match requested {
        None => Ok(DEFAULT_PORTION_GRAMS),
        Some(grams) if grams.is_finite() && grams > 0.0 => Ok(grams),
        Some(grams) => Err(NutritionError::InvalidWeight(grams)),
    }
}

pub fn scale_item(item: &CanonicalNutritionItem, weight_grams: f64) -> ScaledNutritionItem {
    let factor = weight_grams / 100.0;
    ScaledNutritionItem {
        name: item.name.clone(),
        weight_grams,
        calories: round1(item.calories_per_100g * factor),
        protein: round1(item.protein_per_100g * factor),
        carbs: round1(item.carbs_per_100g * factor),
        fat: round1(item.fat_per_100g * factor),
    }
}

/// Scales every item to `weight_grams` and sums the already-rounded results.
///
/// The total is a sum of scaled items, never a re-scale of summed per-100 g
/// values, so per-item rounding does not compound.
pub fn scale_portion(items: &[CanonicalNutritionItem], weight_grams: f64) -> ScaledPortion {
    let scaled: Vec<ScaledNutritionItem> = items
        .iter()
        .map(|item| scale_item(item, weight_grams))
        .collect();

    let mut total = scaled.iter().fold(
        ScaledNutritionItem {
            name: String::new(),
            weight_grams: 0.0,
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        },
        |mut acc, item| {
            acc.weight_grams += item.weight_grams;
            acc.calories += item.calories;
            acc.protein += item.protein;
            acc.carbs += item.carbs;
            acc.fat += item.fat;
            acc
        },
    );
    total.name = scaled
        .iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    total.weight_grams = round1(total.weight_grams);
    total.calories = round1(total.calories);
    total.protein = round1(total.protein);
    total.carbs = round1(total.carbs);
    total.fat = round1(total.fat);

    ScaledPortion {
        items: scaled,
        total,
    }
}
