//! Daily logging streak and milestone badges.
//!
//! A civil day is the UTC calendar date of an entry's `logged_at`. The
//! transition here is pure; stores call it while holding the per-user lock so
//! two concurrent logs cannot both read the same streak.

use time::{Date, OffsetDateTime, UtcOffset};

use super::types::Badge;
use crate::profiles::repo_types::UserProfile;

pub fn civil_day(at: OffsetDateTime) -> Date {
    at.to_offset(UtcOffset::UTC).date()
}

/// Where the day being logged sits relative to the last day that moved the streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayActivity {
    pub logged_earlier_today: bool,
    pub logged_yesterday: bool,
}

impl DayActivity {
    /// `last_streak_day` is stored on the profile, so deleting entries never
    /// lets a day count twice. A stored day after `today` reads as today.
    pub fn since(last_streak_day: Option<Date>, today: Date) -> Self {
        match last_streak_day {
            Some(last) if last >= today => Self {
                logged_earlier_today: true,
                logged_yesterday: false,
            },
            Some(last) => Self {
                logged_earlier_today: false,
                logged_yesterday: Some(last) == today.previous_day(),
            },
            None => Self::default(),
        }
    }
}

/// Counter and badge changes produced by one successful log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub foods_logged_delta: u64,
    pub streak_count: u32,
    pub streak_day: Date,
    pub badges_added: Vec<Badge>,
}

pub fn next_streak(current: u32, activity: DayActivity) -> u32 {
    if activity.logged_earlier_today {
        // Already counted today; at most one increment per civil day.
        current.max(1)
    } else if activity.logged_yesterday {
        current.max(1).saturating_add(1)
    } else {
        1
    }
}

/// Badges whose thresholds are met by the given counters.
pub fn qualifying_badges(total_foods_logged: u64, streak_count: u32) -> Vec<Badge> {
    Badge::ALL
        .into_iter()
        .filter(|badge| match badge {
            Badge::FirstLog => total_foods_logged >= 1,
            Badge::WeekWarrior => streak_count >= 7,
            Badge::MonthMaster => streak_count >= 30,
            Badge::CenturyTracker => total_foods_logged >= 100,
        })
        .collect()
}

/// Transition for one new entry on civil day `today`: count it, move the
/// streak, then award any badge not already held.
pub fn evaluate(profile: &UserProfile, today: Date) -> ProfileUpdate {
    let activity = DayActivity::since(profile.last_streak_day, today);
    let streak_count = next_streak(profile.streak_count, activity);
    let total = profile.total_foods_logged.saturating_add(1);
    let badges_added = qualifying_badges(total, streak_count)
        .into_iter()
        .filter(|badge| !profile.badges.contains(badge))
        .collect();

    ProfileUpdate {
        foods_logged_delta: 1,
        streak_count,
        streak_day: today,
        badges_added,
    }
}

impl UserProfile {
    pub fn apply(&mut self, update: &ProfileUpdate) {
        self.total_foods_logged = self
            .total_foods_logged
            .saturating_add(update.foods_logged_delta);
        self.streak_count = update.streak_count;
        self.last_streak_day = self.last_streak_day.max(Some(update.streak_day));
        self.badges.extend(update.badges_added.iter().copied());
    }
}
