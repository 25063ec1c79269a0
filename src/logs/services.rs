use anyhow::Context;
use bytes::Bytes;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{AnalyzeFoodResponse, FoodLogView, FoodLogsResponse, LogFoodRequest};
use super::repo_types::{FoodLogEntry, RecordOutcome};
use crate::error::{AppError, AppResult};
use crate::nutrition::{
    aggregator::daily_totals,
    scaler::{resolve_weight, scale_portion},
    types::round1,
    NutritionError,
};
use crate::photos::services::{decode_base64_image, presign_many, upload_food_photo, PHOTO_URL_TTL_SECS};
use crate::state::AppState;

const MAX_FOOD_NAME_LEN: usize = 200;

/// Recognize → normalize → scale. Nothing is persisted.
#[instrument(skip(st, image), fields(bytes = image.len()))]
pub async fn analyze_image(
    st: &AppState,
    image: Bytes,
    weight_grams: Option<f64>,
) -> AppResult<AnalyzeFoodResponse> {
    let weight = resolve_weight(weight_grams)?;

    let payload = st.recognizer.recognize(image).await?;
    let provider = payload.provider();
    let items = payload.normalize()?;
    if items.is_empty() {
        debug!(provider, "provider recognized no items");
        return Err(NutritionError::NoFoodDetected.into());
    }

    let primary_calories = items[0].calories_per_100g;
    let portion = scale_portion(&items, weight);
    info!(provider, items = portion.item_count(), weight, "food analyzed");

    Ok(AnalyzeFoodResponse {
        item_count: portion.item_count(),
        food_name: fit_food_name(portion.total.name),
        weight_grams: weight,
        calories_per_100g: primary_calories,
        total_calories: portion.total.calories,
        protein: portion.total.protein,
        carbs: portion.total.carbs,
        fat: portion.total.fat,
        items: portion.items,
        provider,
    })
}

/// Joined names for many items can outgrow what `log_food` accepts; cut them so a
/// preview can always be logged as returned.
fn fit_food_name(name: String) -> String {
    if name.chars().count() <= MAX_FOOD_NAME_LEN {
        return name;
    }
    let head: String = name.chars().take(MAX_FOOD_NAME_LEN - 3).collect();
    format!("{}...", head.trim_end_matches([',', ' ']))
}

fn validate_log_request(req: &LogFoodRequest) -> AppResult<()> {
    resolve_weight(Some(req.weight_grams))?;

    let name = req.food_name.trim();
    if name.is_empty() {
        return Err(AppError::validation("food_name is required"));
    }
    if name.chars().count() > MAX_FOOD_NAME_LEN {
        return Err(AppError::validation(format!(
            "food_name must be at most {MAX_FOOD_NAME_LEN} characters"
        )));
    }

    for (field, value) in [
        ("total_calories", req.total_calories),
        ("protein", req.protein),
        ("carbs", req.carbs),
        ("fat", req.fat),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::validation(format!(
                "{field} must be a non-negative number"
            )));
        }
    }
    Ok(())
}

/// Persists one entry and advances the user's streak and badges.
///
/// The photo is uploaded first; if the store then fails, the object is removed again.
#[instrument(skip(st, req), fields(%user_id))]
pub async fn log_food(st: &AppState, user_id: Uuid, req: LogFoodRequest) -> AppResult<RecordOutcome> {
    validate_log_request(&req)?;
    let image = match req.image_base64.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(decode_base64_image(raw)?),
        _ => None,
    };

    let log_id = Uuid::new_v4();
    let image_key = match image {
        Some(body) => Some(upload_food_photo(st, user_id, log_id, body).await?),
        None => None,
    };

    let entry = FoodLogEntry {
        log_id,
        user_id,
        food_name: req.food_name.trim().to_string(),
        calories_per_100g: round1(req.total_calories * 100.0 / req.weight_grams),
        weight_grams: req.weight_grams,
        total_calories: req.total_calories,
        protein: req.protein,
        carbs: req.carbs,
        fat: req.fat,
        image_key: image_key.clone(),
        logged_at: OffsetDateTime::now_utc(),
    };

    match st.logs.record(entry).await {
        Ok(outcome) => {
            info!(
                %log_id,
                streak = outcome.streak_count,
                new_badges = outcome.new_badges.len(),
                "food logged"
            );
            Ok(outcome)
        }
        Err(e) => {
            if let Some(key) = image_key {
                if let Err(cleanup) = st.storage.delete_object(&key).await {
                    warn!(error = %cleanup, %key, "failed to remove orphaned photo");
                }
            }
            Err(e.context("record food log").into())
        }
    }
}

#[instrument(skip(st), fields(%user_id))]
pub async fn list_logs(
    st: &AppState,
    user_id: Uuid,
    day: Option<Date>,
) -> anyhow::Result<FoodLogsResponse> {
    let entries = st.logs.list(user_id, day).await?;
    let totals = daily_totals(&entries);

    let keys: Vec<String> = entries.iter().filter_map(|e| e.image_key.clone()).collect();
    let mut urls = presign_many(st, keys, PHOTO_URL_TTL_SECS)
        .await
        .context("presign photo urls")?
        .into_iter();

    let logs = entries
        .into_iter()
        .map(|entry| {
            let url = if entry.image_key.is_some() { urls.next() } else { None };
            FoodLogView::new(entry, url)
        })
        .collect();

    Ok(FoodLogsResponse {
        logs,
        daily_totals: totals,
    })
}

#[instrument(skip(st), fields(%user_id, %log_id))]
pub async fn delete_log(st: &AppState, user_id: Uuid, log_id: Uuid) -> AppResult<()> {
    if st.logs.delete(user_id, log_id).await? {
        info!("food log deleted");
        Ok(())
    } else {
        Err(AppError::NotFound("food log"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    use super::*;
    use crate::logs::store::LogStore;
    use crate::nutrition::{energy::BodyMetrics, normalizer::RawRecognitionPayload, streak::ProfileUpdate};
    use crate::profiles::repo_types::UserProfile;
    use crate::recognition::fake::FakeRecognizer;
    use crate::storage::fake::FakeStorage;

    fn request(weight: f64) -> LogFoodRequest {
        LogFoodRequest {
            food_name: " oatmeal ".into(),
            total_calories: 150.0,
            protein: 5.0,
            carbs: 27.0,
            fat: 2.5,
            weight_grams: weight,
            image_base64: None,
        }
    }

    #[tokio::test]
    async fn analyze_scales_every_item() {
        let state = AppState::fake_with(FakeRecognizer::with(vec![Ok(RawRecognitionPayload::Vision {
            text: r#"[{"item": "rice", "calories": 130, "protein_g": 2, "carbs_g": 28, "fats_g": 0.3},
                      {"item": "chicken", "calories": 165, "protein_g": 31, "carbs_g": 0, "fats_g": 3.6}]"#
                .into(),
        })]));

        let out = analyze_image(&state, Bytes::from_static(b"img"), Some(150.0))
            .await
            .unwrap();
        assert_eq!(out.item_count, 2);
        assert_eq!(out.food_name, "rice, chicken");
        assert_eq!(out.calories_per_100g, 130.0);
        assert_eq!(out.total_calories, 442.5);
        assert_eq!(out.protein, 49.5);
        assert_eq!(out.provider, "vision");
    }

    #[tokio::test]
    async fn analyzed_name_is_always_loggable() {
        let items: Vec<String> = (0..40)
            .map(|i| format!(r#"{{"item": "side dish {i:02}", "calories": 10}}"#))
            .collect();
        let state = AppState::fake_with(FakeRecognizer::with(vec![Ok(RawRecognitionPayload::Vision {
            text: format!("[{}]", items.join(",")),
        })]));
        let user = Uuid::new_v4();

        let preview = analyze_image(&state, Bytes::from_static(b"img"), None)
            .await
            .unwrap();
        assert_eq!(preview.item_count, 40);
        assert_eq!(preview.food_name.chars().count(), MAX_FOOD_NAME_LEN);
        assert!(preview.food_name.starts_with("side dish 00, side dish 01"));
        assert!(preview.food_name.ends_with("..."));

        let mut req = request(preview.weight_grams);
        req.food_name = preview.food_name.clone();
        let outcome = log_food(&state, user, req).await.unwrap();
        assert_eq!(outcome.total_foods_logged, 1);
    }

    #[test]
    fn short_names_are_kept() {
        assert_eq!(fit_food_name("rice, chicken".into()), "rice, chicken");
        let exact = "a".repeat(MAX_FOOD_NAME_LEN);
        assert_eq!(fit_food_name(exact.clone()), exact);
    }

    #[tokio::test]
    async fn analyze_empty_result_is_no_food() {
        let state = AppState::fake_with(FakeRecognizer::with(vec![Ok(RawRecognitionPayload::Vision {
            text: "[]".into(),
        })]));
        let err = analyze_image(&state, Bytes::from_static(b"img"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Nutrition(NutritionError::NoFoodDetected)));
    }

    #[tokio::test]
    async fn analyze_rejects_weight_before_calling_provider() {
        let state = AppState::fake_with(FakeRecognizer::with(vec![Err(NutritionError::unavailable(
            "should not be reached",
        ))]));
        let err = analyze_image(&state, Bytes::from_static(b"img"), Some(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Nutrition(NutritionError::InvalidWeight(_))));
    }

    #[tokio::test]
    async fn log_food_derives_per_100g_and_counts() {
        let state = AppState::fake();
        let user = Uuid::new_v4();

        let first = log_food(&state, user, request(250.0)).await.unwrap();
        assert_eq!(first.streak_count, 1);
        assert_eq!(first.total_foods_logged, 1);

        let second = log_food(&state, user, request(250.0)).await.unwrap();
        assert_eq!(second.streak_count, 1);
        assert_eq!(second.total_foods_logged, 2);
        assert!(second.new_badges.is_empty());

        let listed = list_logs(&state, user, None).await.unwrap();
        assert_eq!(listed.logs.len(), 2);
        assert_eq!(listed.logs[0].food_name, "oatmeal");
        assert_eq!(listed.logs[0].calories_per_100g, 60.0);
        assert_eq!(listed.daily_totals.calories, 300.0);
        assert_eq!(listed.daily_totals.fat, 5.0);
    }

    #[tokio::test]
    async fn log_food_validation() {
        let state = AppState::fake();
        let user = Uuid::new_v4();

        let err = log_food(&state, user, request(0.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Nutrition(NutritionError::InvalidWeight(_))));

        let mut negative = request(100.0);
        negative.protein = -1.0;
        assert!(matches!(
            log_food(&state, user, negative).await,
            Err(AppError::Validation(_))
        ));

        let mut blank = request(100.0);
        blank.food_name = "   ".into();
        assert!(matches!(log_food(&state, user, blank).await, Err(AppError::Validation(_))));

        assert!(state.logs.list(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn photo_is_stored_and_presigned() {
        let (state, storage) = AppState::fake_with_storage(FakeStorage::default());
        let user = Uuid::new_v4();
        let mut req = request(100.0);
        req.image_base64 = Some(format!(
            "data:image/jpeg;base64,{}",
            BASE64.encode([0xFF, 0xD8, 0xFF, 0xE0])
        ));

        let outcome = log_food(&state, user, req).await.unwrap();
        assert_eq!(
            storage.keys(),
            vec![format!("food-logs/{user}/{}.jpg", outcome.log_id)]
        );

        let listed = list_logs(&state, user, None).await.unwrap();
        let url = listed.logs[0].image_url.as_deref().unwrap();
        assert!(url.contains(&outcome.log_id.to_string()));
    }

    #[tokio::test]
    async fn upload_failure_persists_nothing() {
        let (state, _) = AppState::fake_with_storage(FakeStorage {
            fail_puts: true,
            ..Default::default()
        });
        let user = Uuid::new_v4();
        let mut req = request(100.0);
        req.image_base64 = Some(BASE64.encode(b"\x89PNG\r\n"));

        assert!(matches!(log_food(&state, user, req).await, Err(AppError::Internal(_))));
        assert!(state.logs.list(user, None).await.unwrap().is_empty());
    }

    /// Accepts nothing; used to check photo cleanup after a failed write.
    struct BrokenStore;

    #[async_trait]
    impl LogStore for BrokenStore {
        async fn append(&self, _entry: FoodLogEntry) -> anyhow::Result<Uuid> {
            anyhow::bail!("store offline")
        }
        async fn list(&self, _user_id: Uuid, _day: Option<Date>) -> anyhow::Result<Vec<FoodLogEntry>> {
            anyhow::bail!("store offline")
        }
        async fn delete(&self, _user_id: Uuid, _log_id: Uuid) -> anyhow::Result<bool> {
            anyhow::bail!("store offline")
        }
        async fn get_profile(&self, _user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
            anyhow::bail!("store offline")
        }
        async fn create_profile(&self, _user_id: Uuid) -> anyhow::Result<()> {
            anyhow::bail!("store offline")
        }
        async fn update_profile(&self, _user_id: Uuid, _update: &ProfileUpdate) -> anyhow::Result<()> {
            anyhow::bail!("store offline")
        }
        async fn set_body_metrics(
            &self,
            _user_id: Uuid,
            _metrics: &BodyMetrics,
            _goal: f64,
        ) -> anyhow::Result<UserProfile> {
            anyhow::bail!("store offline")
        }
        async fn record(&self, _entry: FoodLogEntry) -> anyhow::Result<RecordOutcome> {
            anyhow::bail!("store offline")
        }
    }

    #[tokio::test]
    async fn failed_write_removes_uploaded_photo() {
        let (mut state, storage) = AppState::fake_with_storage(FakeStorage::default());
        state.logs = Arc::new(BrokenStore);
        let mut req = request(100.0);
        req.image_base64 = Some(BASE64.encode(b"\x89PNG\r\n"));

        assert!(matches!(
            log_food(&state, Uuid::new_v4(), req).await,
            Err(AppError::Internal(_))
        ));
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let state = AppState::fake();
        let user = Uuid::new_v4();
        let outcome = log_food(&state, user, request(100.0)).await.unwrap();

        assert!(matches!(
            delete_log(&state, Uuid::new_v4(), outcome.log_id).await,
            Err(AppError::NotFound(_))
        ));
        delete_log(&state, user, outcome.log_id).await.unwrap();
        assert!(matches!(
            delete_log(&state, user, outcome.log_id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
