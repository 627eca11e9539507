/// Optimistic client cache
///
/// Keeps habits and their completed days in memory for fast reads. A toggle
/// is applied locally first, then confirmed against the tracker; the local
/// change is undone if the tracker fails or the toggle is abandoned.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::debug;

use crate::clock::Clock;
use crate::domain::{DateRange, Habit, HabitChange, HabitId, Streak};
use crate::storage::HabitStore;
use crate::tracker::{HabitTracker, ToggleOutcome};
use crate::{TrackerError, TrackerResult};

#[derive(Debug, Clone)]
struct CachedHabit {
    /// What readers see: `confirmed` with an estimated streak while toggles are pending
    habit: Habit,
    /// Latest habit returned by the tracker
    confirmed: Habit,
    dates: BTreeSet<NaiveDate>,
    /// Toggles of this habit started but not yet settled
    pending: usize,
}

impl CachedHabit {
    fn new(habit: Habit, dates: BTreeSet<NaiveDate>) -> Self {
        Self {
            confirmed: habit.clone(),
            habit,
            dates,
            pending: 0,
        }
    }

    fn set_completed(&mut self, date: NaiveDate, completed: bool) {
        if completed {
            self.dates.insert(date);
        } else {
            self.dates.remove(&date);
        }
    }

    fn confirm(&mut self, habit: &Habit) {
        if habit.updated_at >= self.confirmed.updated_at {
            self.confirmed = habit.clone();
        }
    }

    /// Rebuild the visible habit after a toggle starts or settles
    fn settle(&mut self, today: NaiveDate) {
        self.habit = self.confirmed.clone();
        if self.pending > 0 {
            let estimate = Streak::calculate(self.dates.iter().copied(), today);
            self.habit.apply(&HabitChange::Streaks(estimate));
        }
    }
}

type ToggleKey = (HabitId, NaiveDate);

/// In-memory view of habits, reconciled with the tracker on every toggle
#[derive(Debug, Default)]
pub struct HabitCache {
    entries: Mutex<HashMap<HabitId, CachedHabit>>,
    in_flight: Mutex<HashSet<ToggleKey>>,
}

impl HabitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every habit and its full completion history
    ///
    /// Replaces whatever the cache held. Returns the number of habits loaded.
    pub async fn hydrate<S: HabitStore, C: Clock>(
        &self,
        tracker: &HabitTracker<S, C>,
    ) -> TrackerResult<usize> {
        let habits = tracker.habits().await?;
        let histories = try_join_all(
            habits
                .iter()
                .map(|habit| tracker.list_completions(&habit.id, DateRange::all())),
        )
        .await?;

        let entries: HashMap<_, _> = habits
            .into_iter()
            .zip(histories)
            .map(|(habit, completions)| {
                let dates = completions.iter().map(|c| c.date).collect();
                (habit.id.clone(), CachedHabit::new(habit, dates))
            })
            .collect();

        let count = entries.len();
        *self.entries() = entries;
        debug!("Hydrated cache with {} habit(s)", count);
        Ok(count)
    }

    pub fn habit(&self, habit_id: &HabitId) -> Option<Habit> {
        self.entries().get(habit_id).map(|entry| entry.habit.clone())
    }

    /// Cached habits, oldest first
    pub fn habits(&self) -> Vec<Habit> {
        let mut habits: Vec<Habit> = self.entries().values().map(|e| e.habit.clone()).collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        habits
    }

    pub fn is_completed(&self, habit_id: &HabitId, date: NaiveDate) -> bool {
        self.entries()
            .get(habit_id)
            .map_or(false, |entry| entry.dates.contains(&date))
    }

    /// Toggle optimistically, then confirm with the tracker
    ///
    /// Only one toggle per (habit, date) may be in flight; a second one is
    /// rejected with `ToggleInFlight`.
    pub async fn toggle<S: HabitStore, C: Clock>(
        &self,
        tracker: &HabitTracker<S, C>,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> TrackerResult<ToggleOutcome> {
        let key = (habit_id.clone(), date);
        if !self.in_flight().insert(key.clone()) {
            return Err(TrackerError::ToggleInFlight {
                habit_id: habit_id.to_string(),
                date,
            });
        }

        let today = tracker.today();
        let mut pending = PendingToggle {
            cache: self,
            key,
            today,
            was_completed: None,
            committed: false,
        };

        {
            let mut entries = self.entries();
            if let Some(entry) = entries.get_mut(habit_id) {
                let was_completed = entry.dates.contains(&date);
                pending.was_completed = Some(was_completed);

                entry.pending += 1;
                entry.set_completed(date, !was_completed);
                entry.settle(today);
            }
        }

        // Dropping `pending` on error (or cancellation) reverts the local flip
        let outcome = tracker.toggle(habit_id, date).await?;

        {
            let mut entries = self.entries();
            if let Some(entry) = entries.get_mut(habit_id) {
                entry.set_completed(date, outcome.completed);
                entry.confirm(&outcome.habit);
                if pending.was_completed.is_some() {
                    entry.pending = entry.pending.saturating_sub(1);
                }
                entry.settle(today);
            }
        }
        pending.committed = true;

        Ok(outcome)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<HabitId, CachedHabit>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<ToggleKey>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Undoes an optimistic flip unless the toggle was confirmed
struct PendingToggle<'a> {
    cache: &'a HabitCache,
    key: ToggleKey,
    today: NaiveDate,
    /// Completion state before the flip, if the habit was cached
    was_completed: Option<bool>,
    committed: bool,
}

impl Drop for PendingToggle<'_> {
    fn drop(&mut self) {
        let (habit_id, date) = &self.key;

        if !self.committed {
            if let Some(was_completed) = self.was_completed {
                let mut entries = self.cache.entries();
                if let Some(entry) = entries.get_mut(habit_id) {
                    entry.set_completed(*date, was_completed);
                    entry.pending = entry.pending.saturating_sub(1);
                    entry.settle(self.today);
                }
            }
            debug!("Reverted optimistic toggle of habit {} on {}", habit_id, date);
        }

        self.cache.in_flight().remove(&self.key);
    }
}
