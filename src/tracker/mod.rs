/// Habit tracker
///
/// The tracker is the single owner of habit and completion state. Entry
/// points construct one over a store and a clock and pass it around by
/// reference; every operation goes through it.

mod habits;
mod toggle;
mod transfer;

pub use toggle::ToggleOutcome;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use futures::future::try_join_all;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::analytics::{AnalyticsEngine, DashboardStats, HabitStats};
use crate::clock::{Clock, SystemClock};
use crate::domain::{DateRange, HabitId, ThemeMode, ThemePreference};
use crate::storage::HabitStore;
use crate::TrackerResult;

/// Repository object over a store and a source of "today"
pub struct HabitTracker<S, C = SystemClock> {
    store: S,
    clock: C,
    analytics: AnalyticsEngine,
    /// Serializes completion writes and streak refreshes of one habit
    habit_locks: Mutex<HashMap<HabitId, Arc<AsyncMutex<()>>>>,
}

impl<S: HabitStore> HabitTracker<S, SystemClock> {
    /// Tracker on the machine's local calendar
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: HabitStore, C: Clock> HabitTracker<S, C> {
    /// Tracker with an explicit source of "today"
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            analytics: AnalyticsEngine::new(),
            habit_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Today's calendar day according to the clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Wait for exclusive access to one habit's completions and streaks
    async fn lock_habit(&self, habit_id: &HabitId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.habit_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(habit_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    fn forget_habit_lock(&self, habit_id: &HabitId) {
        self.habit_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(habit_id);
    }

    // Settings

    /// The stored theme preference, creating the default on first use
    pub async fn theme(&self) -> TrackerResult<ThemePreference> {
        if let Some(preference) = self.store.theme_preference().await? {
            return Ok(preference);
        }

        let preference = ThemePreference::default();
        self.store.save_theme_preference(&preference).await?;
        debug!("Initialized default theme preference");
        Ok(preference)
    }

    pub async fn set_theme(
        &self,
        mode: ThemeMode,
        color: impl Into<String>,
    ) -> TrackerResult<ThemePreference> {
        let preference = ThemePreference::new(mode, color);
        self.store.save_theme_preference(&preference).await?;
        Ok(preference)
    }

    // Statistics

    pub async fn habit_stats(&self, habit_id: &HabitId) -> TrackerResult<HabitStats> {
        let habit = self.store.get_habit(habit_id).await?;
        let completions = self.store.list_completions(habit_id, self.stats_window()).await?;
        Ok(self.analytics.habit_stats(&habit, completions.len()))
    }

    pub async fn dashboard_stats(&self) -> TrackerResult<DashboardStats> {
        let habits = self.store.list_habits().await?;
        let window = self.stats_window();

        let counts = try_join_all(habits.iter().map(|habit| async move {
            self.store
                .list_completions(&habit.id, window)
                .await
                .map(|completions| completions.len())
        }))
        .await?;

        let paired: Vec<_> = habits.into_iter().zip(counts).collect();
        Ok(self.analytics.dashboard_stats(&paired))
    }

    fn stats_window(&self) -> DateRange {
        DateRange::last_days(self.today(), self.analytics.window_days())
    }
}
