use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::Date;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::repo_types::{FoodLogEntry, RecordOutcome};
use super::store::LogStore;
use crate::nutrition::{
    energy::BodyMetrics,
    streak::{civil_day, evaluate, ProfileUpdate},
};
use crate::profiles::repo_types::UserProfile;

/// Process-local store with one lock per user profile.
#[derive(Default)]
pub struct InMemoryLogStore {
    entries: RwLock<Vec<FoodLogEntry>>,
    profiles: Mutex<HashMap<Uuid, Arc<Mutex<UserProfile>>>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn profile_slot(&self, user_id: Uuid) -> Arc<Mutex<UserProfile>> {
        self.profiles
            .lock()
            .await
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(UserProfile::empty(user_id))))
            .clone()
    }

    async fn existing_slot(&self, user_id: Uuid) -> Option<Arc<Mutex<UserProfile>>> {
        self.profiles.lock().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append(&self, entry: FoodLogEntry) -> anyhow::Result<Uuid> {
        let log_id = entry.log_id;
        let mut entries = self.entries.write().await;
        anyhow::ensure!(
            entries.iter().all(|e| e.log_id != log_id),
            "duplicate log id {log_id}"
        );
        entries.push(entry);
        Ok(log_id)
    }

    async fn list(&self, user_id: Uuid, day: Option<Date>) -> anyhow::Result<Vec<FoodLogEntry>> {
        let mut out: Vec<FoodLogEntry> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| day.map_or(true, |d| civil_day(e.logged_at) == d))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        Ok(out)
    }

    async fn delete(&self, user_id: Uuid, log_id: Uuid) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !(e.log_id == log_id && e.user_id == user_id));
        Ok(entries.len() != before)
    }

    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        match self.existing_slot(user_id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn create_profile(&self, user_id: Uuid) -> anyhow::Result<()> {
        self.profile_slot(user_id).await;
        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> anyhow::Result<()> {
        let slot = self
            .existing_slot(user_id)
            .await
            .ok_or_else(|| anyhow::anyhow!("profile {user_id} not found"))?;
        slot.lock().await.apply(update);
        Ok(())
    }

    async fn set_body_metrics(
        &self,
        user_id: Uuid,
        metrics: &BodyMetrics,
        daily_calorie_goal: f64,
    ) -> anyhow::Result<UserProfile> {
        let slot = self.profile_slot(user_id).await;
        let mut profile = slot.lock().await;
        profile.metrics = Some(metrics.clone());
        profile.daily_calorie_goal = Some(daily_calorie_goal);
        Ok(profile.clone())
    }

    async fn record(&self, entry: FoodLogEntry) -> anyhow::Result<RecordOutcome> {
        let slot = self.profile_slot(entry.user_id).await;
        let mut profile = slot.lock().await;

        let today = civil_day(entry.logged_at);
        let log_id = self.append(entry).await?;
        let update = evaluate(&profile, today);
        profile.apply(&update);

        Ok(RecordOutcome {
            log_id,
            streak_count: profile.streak_count,
            total_foods_logged: profile.total_foods_logged,
            new_badges: update.badges_added,
        })
    }
}
