//! Turns provider-specific recognition payloads into canonical per-100 g records.
//!
//! Each supported provider is one variant of [`RawRecognitionPayload`] with its
//! own parser. An empty result means the provider ran but recognized nothing;
//! the caller decides how to surface that.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::NutritionError;
use super::types::CanonicalNutritionItem;

const UNKNOWN_FOOD: &str = "Unknown Food";

#[derive(Debug, Clone)]
pub enum RawRecognitionPayload {
    /// Two-step LogMeal response: segmentation, then nutritional info for the image.
    LogMeal { segmentation: Value, nutrition: Value },
    /// Text emitted by a generative vision model asked for a JSON item list.
    Vision { text: String },
}

impl RawRecognitionPayload {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::LogMeal { .. } => "logmeal",
            Self::Vision { .. } => "vision",
        }
    }

    /// Items come back in provider order; the first is the most confident.
    pub fn normalize(&self) -> Result<Vec<CanonicalNutritionItem>, NutritionError> {
        match self {
            Self::LogMeal {
                segmentation,
                nutrition,
            } => normalize_logmeal(segmentation, nutrition),
            Self::Vision { text } => normalize_vision(text),
        }
    }
}

// ---- LogMeal ----

fn normalize_logmeal(
    segmentation: &Value,
    nutrition: &Value,
) -> Result<Vec<CanonicalNutritionItem>, NutritionError> {
    let body = nutrition
        .as_object()
        .ok_or_else(|| NutritionError::parse("logmeal nutrition response is not an object"))?;

    if body.get("hasNutritionalInfo").and_then(Value::as_bool) == Some(false) {
        return Ok(Vec::new());
    }

    let names = logmeal_names(body, segmentation);

    if let Some(per_item) = body
        .get("nutritional_info_per_item")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
    {
        return per_item
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let item = item.as_object().ok_or_else(|| {
                    NutritionError::parse("nutritional_info_per_item entry is not an object")
                })?;
                let block = nutrition_block(item)?;
                let name = names
                    .get(idx)
                    .cloned()
                    .or_else(|| string_field(item, "foodName"))
                    .unwrap_or_else(|| UNKNOWN_FOOD.to_string());
                canonical_from_block(name, block, serving_size(item, block)?)
            })
            .collect();
    }

    match body.get("nutritional_info") {
        None | Some(Value::Null) => {
            if names.is_empty() {
                Ok(Vec::new())
            } else {
                Err(NutritionError::parse(
                    "logmeal recognized food but returned no nutritional_info",
                ))
            }
        }
        Some(_) => {
            let block = nutrition_block(body)?;
            // One block describes the whole dish, however many items were seen.
            let name = if names.is_empty() {
                UNKNOWN_FOOD.to_string()
            } else {
                names.join(", ")
            };
            Ok(vec![canonical_from_block(
                name,
                block,
                serving_size(body, block)?,
            )?])
        }
    }
}

fn nutrition_block(parent: &Map<String, Value>) -> Result<&Map<String, Value>, NutritionError> {
    parent
        .get("nutritional_info")
        .and_then(Value::as_object)
        .ok_or_else(|| NutritionError::parse("nutritional_info is missing or not an object"))
}

fn logmeal_names(body: &Map<String, Value>, segmentation: &Value) -> Vec<String> {
    match body.get("foodName") {
        Some(Value::Array(names)) => {
            let names: Vec<String> = names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            if !names.is_empty() {
                return names;
            }
        }
        Some(Value::String(name)) if !name.trim().is_empty() => return vec![name.clone()],
        _ => {}
    }

    if let Some(segments) = segmentation
        .get("segmentation_results")
        .and_then(Value::as_array)
    {
        return segments
            .iter()
            .filter_map(|s| s.get("recognition_results")?.as_array()?.first())
            .filter_map(|r| r.get("name")?.as_str())
            .map(str::to_string)
            .collect();
    }

    segmentation
        .get("recognition_results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r.get("name")?.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn serving_size(
    parent: &Map<String, Value>,
    block: &Map<String, Value>,
) -> Result<Option<f64>, NutritionError> {
    let grams = amount(parent.get("serving_size"), "serving_size")?
        .or(amount(block.get("serving_size"), "serving_size")?);
    Ok(grams.filter(|grams| *grams > 0.0))
}

fn canonical_from_block(
    name: String,
    block: &Map<String, Value>,
    serving_grams: Option<f64>,
) -> Result<CanonicalNutritionItem, NutritionError> {
    let calories = amount(block.get("calories"), "calories")?
        .or(coded_nutrient(block, "ENERC_KCAL")?)
        .unwrap_or(0.0);
    let protein = coded_nutrient(block, "PROCNT")?
        .or(amount(block.get("protein"), "protein")?)
        .unwrap_or(0.0);
    let carbs = coded_nutrient(block, "CHOCDF")?
        .or(amount(block.get("carbohydrates"), "carbohydrates")?)
        .or(amount(block.get("carbs"), "carbs")?)
        .unwrap_or(0.0);
    let fat = coded_nutrient(block, "FAT")?
        .or(amount(block.get("fat"), "fat")?)
        .unwrap_or(0.0);

    // Values reported for a serving are re-expressed per 100 g.
    let per_100g = serving_grams.map_or(1.0, |grams| 100.0 / grams);

    Ok(CanonicalNutritionItem {
        name,
        calories_per_100g: calories * per_100g,
        protein_per_100g: protein * per_100g,
        carbs_per_100g: carbs * per_100g,
        fat_per_100g: fat * per_100g,
    })
}

fn coded_nutrient(block: &Map<String, Value>, code: &str) -> Result<Option<f64>, NutritionError> {
    let nutrients = match block.get("totalNutrients") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(nutrients)) => nutrients,
        Some(_) => return Err(NutritionError::parse("totalNutrients is not an object")),
    };
    match nutrients.get(code) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(nutrient)) => amount(nutrient.get("quantity"), code),
        Some(_) => Err(NutritionError::parse(format!(
            "totalNutrients.{code} is not an object"
        ))),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.first()?.as_str().map(str::to_string),
        _ => None,
    }
}

/// Absent or null reads as missing. Numbers and numeric strings are accepted;
/// negative amounts also read as missing. Anything else is a shape violation.
fn amount(value: Option<&Value>, field: &str) -> Result<Option<f64>, NutritionError> {
    let n = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok((n >= 0.0).then_some(n)),
        _ => Err(NutritionError::parse(format!(
            "`{field}` is not a finite number: {}",
            value.map_or_else(String::new, Value::to_string)
        ))),
    }
}

// ---- generative vision model ----

#[derive(Debug, Deserialize)]
struct VisionItem {
    #[serde(default, alias = "name")]
    item: Option<String>,
    #[serde(default)]
    calories: Option<Value>,
    #[serde(default, alias = "protein")]
    protein_g: Option<Value>,
    #[serde(default, alias = "carbohydrates_g", alias = "carbs")]
    carbs_g: Option<Value>,
    #[serde(default, alias = "fat_g", alias = "fat")]
    fats_g: Option<Value>,
}

fn normalize_vision(text: &str) -> Result<Vec<CanonicalNutritionItem>, NutritionError> {
    let json = strip_code_fence(text);
    let value: Value = serde_json::from_str(json)
        .map_err(|e| NutritionError::parse(format!("vision output is not valid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(NutritionError::parse(
                    "vision output object has no `items` array",
                ))
            }
        },
        _ => return Err(NutritionError::parse("vision output is not a JSON list")),
    };

    items
        .into_iter()
        .map(|raw| {
            let item: VisionItem = serde_json::from_value(raw)
                .map_err(|e| NutritionError::parse(format!("malformed vision item: {e}")))?;
            let macro_of = |v: &Option<Value>, field: &str| -> Result<f64, NutritionError> {
                Ok(amount(v.as_ref(), field)?.unwrap_or(0.0))
            };
            Ok(CanonicalNutritionItem {
                name: item
                    .item
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(UNKNOWN_FOOD)
                    .to_string(),
                calories_per_100g: macro_of(&item.calories, "calories")?,
                protein_per_100g: macro_of(&item.protein_g, "protein_g")?,
                carbs_per_100g: macro_of(&item.carbs_g, "carbs_g")?,
                fat_per_100g: macro_of(&item.fats_g, "fats_g")?,
            })
        })
        .collect()
}

/// Models like to wrap JSON in ```json fences.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
