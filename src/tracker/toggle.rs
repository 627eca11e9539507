/// Completion toggling
///
/// A toggle is a completion write followed by a streak refresh. If the
/// refresh fails the write is undone so the cached streaks never disagree
/// with the completion history.

use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::domain::{Completion, DateRange, DomainError, Habit, HabitChange, HabitId, Streak};
use crate::storage::{HabitStore, StorageError, StorageResult};
use crate::tracker::HabitTracker;
use crate::{TrackerError, TrackerResult};

/// Result of a toggle: the refreshed habit and whether the day is now completed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub habit: Habit,
    pub completed: bool,
}

/// The completion write a toggle performed
enum Applied {
    Added(Completion),
    Removed(Completion),
    /// Lost a race to a concurrent toggle; the day ended up uncompleted
    Unchanged,
}

impl Applied {
    fn completed(&self) -> bool {
        matches!(self, Applied::Added(_))
    }
}

impl<S: HabitStore, C: Clock> HabitTracker<S, C> {
    /// Flip the completion state of `habit_id` on `date`
    pub async fn toggle(&self, habit_id: &HabitId, date: NaiveDate) -> TrackerResult<ToggleOutcome> {
        let today = self.today();
        if date > today {
            return Err(DomainError::InvalidDate(format!(
                "Cannot complete a habit on {}, which is after today ({})",
                date, today
            ))
            .into());
        }

        // Held until the streaks written below match the completions
        let _guard = self.lock_habit(habit_id).await;

        self.store.get_habit(habit_id).await?;

        let applied = self.apply_toggle(habit_id, date).await?;

        match self.refresh_streaks(habit_id, today).await {
            Ok(habit) => {
                let completed = applied.completed();
                info!(
                    "Toggled habit {} on {} (completed: {}, streak: {})",
                    habit_id, date, completed, habit.current_streak
                );
                Ok(ToggleOutcome { habit, completed })
            }
            Err(cause) => Err(self.undo(habit_id, applied, cause).await),
        }
    }

    /// Toggle and return only the updated habit
    pub async fn toggle_completion(&self, habit_id: &HabitId, date: NaiveDate) -> TrackerResult<Habit> {
        Ok(self.toggle(habit_id, date).await?.habit)
    }

    /// Toggle the clock's current day
    pub async fn toggle_today(&self, habit_id: &HabitId) -> TrackerResult<Habit> {
        let today = self.today();
        self.toggle_completion(habit_id, today).await
    }

    /// Recompute a habit's cached streaks from its stored history
    pub async fn recalculate_streaks(&self, habit_id: &HabitId) -> TrackerResult<Habit> {
        let _guard = self.lock_habit(habit_id).await;
        Ok(self.refresh_streaks(habit_id, self.today()).await?)
    }

    /// Recompute cached streaks for every habit
    pub async fn recalculate_all(&self) -> TrackerResult<Vec<Habit>> {
        let today = self.today();
        let habits = self.store.list_habits().await?;

        let refreshed = try_join_all(habits.iter().map(|habit| async move {
            let _guard = self.lock_habit(&habit.id).await;
            self.refresh_streaks(&habit.id, today).await
        }))
        .await?;

        info!("Recalculated streaks for {} habit(s)", refreshed.len());
        Ok(refreshed)
    }

    async fn apply_toggle(&self, habit_id: &HabitId, date: NaiveDate) -> StorageResult<Applied> {
        if let Some(existing) = self.store.find_completion(habit_id, date).await? {
            self.store.remove_completion(&existing.id).await?;
            return Ok(Applied::Removed(existing));
        }

        match self.store.add_completion(habit_id, date).await {
            Ok(completion) => Ok(Applied::Added(completion)),
            Err(StorageError::DuplicateCompletion { .. }) => {
                // Someone completed it between our lookup and insert
                debug!("Habit {} was completed concurrently on {}; removing instead", habit_id, date);
                match self.store.find_completion(habit_id, date).await? {
                    Some(existing) => {
                        self.store.remove_completion(&existing.id).await?;
                        Ok(Applied::Removed(existing))
                    }
                    None => Ok(Applied::Unchanged),
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn refresh_streaks(&self, habit_id: &HabitId, today: NaiveDate) -> StorageResult<Habit> {
        let completions = self.store.list_completions(habit_id, DateRange::all()).await?;
        let streak = Streak::from_completions(&completions, today);
        self.store
            .update_habit(habit_id, &[HabitChange::Streaks(streak)])
            .await
    }

    /// Reverse a completion write after a failed refresh
    async fn undo(&self, habit_id: &HabitId, applied: Applied, cause: StorageError) -> TrackerError {
        let rollback = match &applied {
            Applied::Added(completion) => self.store.remove_completion(&completion.id).await,
            Applied::Removed(completion) => {
                match self.store.add_completion(habit_id, completion.date).await {
                    Ok(_) | Err(StorageError::DuplicateCompletion { .. }) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            Applied::Unchanged => Ok(()),
        };

        match rollback {
            Ok(()) => {
                warn!("Streak refresh failed for habit {}, completion change rolled back: {}", habit_id, cause);
                TrackerError::Storage(cause)
            }
            Err(rollback) => {
                error!(
                    "Streak refresh failed for habit {} ({}) and the rollback failed too: {}",
                    habit_id, cause, rollback
                );
                TrackerError::RollbackFailed {
                    habit_id: habit_id.to_string(),
                    cause,
                    rollback,
                }
            }
        }
    }
}
