use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use super::repo_types::{FoodLogEntry, RecordOutcome};
use crate::nutrition::{energy::BodyMetrics, streak::ProfileUpdate};
use crate::profiles::repo_types::UserProfile;

/// Persistence the nutrition core needs: food log entries plus the per-user
/// profile counters they drive.
///
/// Implementations must serialize `record` calls for the same user; calls for
/// different users may run in parallel.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, entry: FoodLogEntry) -> anyhow::Result<Uuid>;

    /// Most recent first. `day` filters on the UTC date of `logged_at`.
    async fn list(&self, user_id: Uuid, day: Option<Date>) -> anyhow::Result<Vec<FoodLogEntry>>;

    /// `false` when no entry with that id belongs to the user.
    async fn delete(&self, user_id: Uuid, log_id: Uuid) -> anyhow::Result<bool>;

    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>>;

    /// No-op when the profile already exists.
    async fn create_profile(&self, user_id: Uuid) -> anyhow::Result<()>;

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> anyhow::Result<()>;

    async fn set_body_metrics(
        &self,
        user_id: Uuid,
        metrics: &BodyMetrics,
        daily_calorie_goal: f64,
    ) -> anyhow::Result<UserProfile>;

    /// Appends `entry` and applies the streak/badge transition for its day,
    /// atomically with respect to other `record` calls for the same user.
    async fn record(&self, entry: FoodLogEntry) -> anyhow::Result<RecordOutcome>;
}
