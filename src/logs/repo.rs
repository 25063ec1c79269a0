use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use super::repo_types::{FoodLogEntry, RecordOutcome};
use super::store::LogStore;
use crate::nutrition::{
    energy::BodyMetrics,
    streak::{civil_day, evaluate, ProfileUpdate},
};
use crate::profiles::repo_types::{ProfileRow, UserProfile};

const PROFILE_COLUMNS: &str = "user_id, age_years, height_cm, weight_kg, gender, activity_level, \
     goal_weight_kg, daily_calorie_goal, streak_count, last_streak_day, total_foods_logged, badges";

/// Postgres-backed store. Per-user serialization comes from a row lock on
/// `user_profiles` held for the whole `record` transaction.
#[derive(Clone)]
pub struct PgLogStore {
    db: PgPool,
}

impl PgLogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

async fn insert_entry_tx(
    tx: &mut Transaction<'_, Postgres>,
    entry: &FoodLogEntry,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_logs (id, user_id, food_name, calories_per_100g, weight_grams,
                               total_calories, protein, carbs, fat, image_key, logged_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(entry.log_id)
    .bind(entry.user_id)
    .bind(&entry.food_name)
    .bind(entry.calories_per_100g)
    .bind(entry.weight_grams)
    .bind(entry.total_calories)
    .bind(entry.protein)
    .bind(entry.carbs)
    .bind(entry.fat)
    .bind(entry.image_key.as_deref())
    .bind(entry.logged_at)
    .execute(&mut **tx)
    .await
    .context("insert food log")?;
    Ok(())
}

async fn ensure_profile_tx(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .context("ensure profile")?;
    Ok(())
}

async fn apply_update_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    update: &ProfileUpdate,
) -> anyhow::Result<bool> {
    let badges: Vec<String> = update
        .badges_added
        .iter()
        .map(|b| b.as_str().to_string())
        .collect();
    let result = sqlx::query(
        r#"
        UPDATE user_profiles
           SET total_foods_logged = total_foods_logged + $2,
               streak_count = $3,
               last_streak_day = GREATEST(last_streak_day, $5),
               badges = ARRAY(SELECT DISTINCT b FROM unnest(badges || $4::text[]) AS b ORDER BY b),
               updated_at = now()
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(i64::try_from(update.foods_logged_delta).context("foods_logged_delta overflow")?)
    .bind(i32::try_from(update.streak_count).context("streak_count overflow")?)
    .bind(&badges)
    .bind(update.streak_day)
    .execute(&mut **tx)
    .await
    .context("update profile counters")?;
    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn append(&self, entry: FoodLogEntry) -> anyhow::Result<Uuid> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        insert_entry_tx(&mut tx, &entry).await?;
        tx.commit().await.context("commit tx")?;
        Ok(entry.log_id)
    }

    async fn list(&self, user_id: Uuid, day: Option<Date>) -> anyhow::Result<Vec<FoodLogEntry>> {
        let rows = sqlx::query_as::<_, FoodLogEntry>(
            r#"
            SELECT id AS log_id, user_id, food_name, calories_per_100g, weight_grams,
                   total_calories, protein, carbs, fat, image_key, logged_at
              FROM food_logs
             WHERE user_id = $1
               AND ($2::date IS NULL OR (logged_at AT TIME ZONE 'UTC')::date = $2)
             ORDER BY logged_at DESC
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(&self.db)
        .await
        .context("list food logs")?;
        Ok(rows)
    }

    async fn delete(&self, user_id: Uuid, log_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM food_logs WHERE id = $1 AND user_id = $2")
            .bind(log_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete food log")?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get profile")?;
        Ok(row.map(UserProfile::from))
    }

    async fn create_profile(&self, user_id: Uuid) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        ensure_profile_tx(&mut tx, user_id).await?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let updated = apply_update_tx(&mut tx, user_id, update).await?;
        anyhow::ensure!(updated, "profile {user_id} not found");
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn set_body_metrics(
        &self,
        user_id: Uuid,
        metrics: &BodyMetrics,
        daily_calorie_goal: f64,
    ) -> anyhow::Result<UserProfile> {
        let age = i32::try_from(metrics.age_years).context("age_years overflow")?;
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO user_profiles (user_id, age_years, height_cm, weight_kg, gender,
                                       activity_level, goal_weight_kg, daily_calorie_goal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE
               SET age_years = EXCLUDED.age_years,
                   height_cm = EXCLUDED.height_cm,
                   weight_kg = EXCLUDED.weight_kg,
                   gender = EXCLUDED.gender,
                   activity_level = EXCLUDED.activity_level,
                   goal_weight_kg = EXCLUDED.goal_weight_kg,
                   daily_calorie_goal = EXCLUDED.daily_calorie_goal,
                   updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(age)
        .bind(metrics.height_cm)
        .bind(metrics.weight_kg)
        .bind(&metrics.gender)
        .bind(&metrics.activity_level)
        .bind(metrics.goal_weight_kg)
        .bind(daily_calorie_goal)
        .fetch_one(&self.db)
        .await
        .context("set body metrics")?;
        Ok(row.into())
    }

    async fn record(&self, entry: FoodLogEntry) -> anyhow::Result<RecordOutcome> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        ensure_profile_tx(&mut tx, entry.user_id).await?;
        let profile: UserProfile = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(entry.user_id)
        .fetch_one(&mut *tx)
        .await
        .context("lock profile")?
        .into();

        insert_entry_tx(&mut tx, &entry).await?;

        let update = evaluate(&profile, civil_day(entry.logged_at));
        apply_update_tx(&mut tx, entry.user_id, &update).await?;
        tx.commit().await.context("commit tx")?;

        let mut profile = profile;
        profile.apply(&update);
        tracing::debug!(
            user_id = %entry.user_id,
            log_id = %entry.log_id,
            streak = profile.streak_count,
            "food log recorded"
        );

        Ok(RecordOutcome {
            log_id: entry.log_id,
            streak_count: profile.streak_count,
            total_foods_logged: profile.total_foods_logged,
            new_badges: update.badges_added,
        })
    }
}
