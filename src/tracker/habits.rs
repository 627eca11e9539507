/// Habit management operations

use chrono::NaiveDate;
use tracing::info;

use crate::clock::Clock;
use crate::domain::{Completion, DateRange, DomainError, Habit, HabitChange, HabitId, NewHabit};
use crate::storage::HabitStore;
use crate::tracker::HabitTracker;
use crate::TrackerResult;

impl<S: HabitStore, C: Clock> HabitTracker<S, C> {
    /// Create a habit; input is validated before the store is touched
    pub async fn add_habit(&self, new: NewHabit) -> TrackerResult<Habit> {
        new.validate()?;
        let habit = self.store.create_habit(&new).await?;
        info!("Added habit '{}' ({})", habit.name, habit.id);
        Ok(habit)
    }

    /// All habits, oldest first
    pub async fn habits(&self) -> TrackerResult<Vec<Habit>> {
        Ok(self.store.list_habits().await?)
    }

    pub async fn habit(&self, habit_id: &HabitId) -> TrackerResult<Habit> {
        Ok(self.store.get_habit(habit_id).await?)
    }

    /// Apply user edits to a habit
    ///
    /// The whole batch is validated first; streak fields are derived from
    /// completions and cannot be set here.
    pub async fn edit_habit(
        &self,
        habit_id: &HabitId,
        changes: Vec<HabitChange>,
    ) -> TrackerResult<Habit> {
        for change in &changes {
            if !change.is_user_editable() {
                return Err(DomainError::validation(
                    "Streaks are derived from completions and cannot be edited",
                )
                .into());
            }
            change.validate()?;
        }

        if changes.is_empty() {
            return self.habit(habit_id).await;
        }

        let habit = self.store.update_habit(habit_id, &changes).await?;
        info!("Updated habit {} ({} change(s))", habit_id, changes.len());
        Ok(habit)
    }

    /// Delete a habit and every completion it owns
    pub async fn delete_habit(&self, habit_id: &HabitId) -> TrackerResult<()> {
        let _guard = self.lock_habit(habit_id).await;
        let deleted = self.store.delete_habit(habit_id).await;
        self.forget_habit_lock(habit_id);
        deleted?;
        info!("Deleted habit {}", habit_id);
        Ok(())
    }

    /// Completion history of one habit, ascending by date
    pub async fn list_completions(
        &self,
        habit_id: &HabitId,
        range: DateRange,
    ) -> TrackerResult<Vec<Completion>> {
        self.store.get_habit(habit_id).await?;
        Ok(self.store.list_completions(habit_id, range).await?)
    }

    pub async fn is_completed(&self, habit_id: &HabitId, date: NaiveDate) -> TrackerResult<bool> {
        Ok(self.store.has_completion(habit_id, date).await?)
    }
}
