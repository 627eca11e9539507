/// In-process implementation of the habit store
///
/// Holds everything in maps behind a single mutex. Used for tests and for
/// sessions that do not need to outlive the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::backup::Backup;
use crate::domain::{
    Completion, CompletionId, DateRange, Habit, HabitChange, HabitId, NewHabit, ThemePreference,
};
use crate::storage::{HabitStore, StorageError, StorageResult};

#[derive(Debug, Default)]
struct MemoryState {
    habits: HashMap<HabitId, Habit>,
    completions: HashMap<CompletionId, Completion>,
    /// (habit, day) -> completion, the uniqueness index
    by_day: HashMap<(HabitId, NaiveDate), CompletionId>,
    settings: Vec<ThemePreference>,
}

impl MemoryState {
    fn habit_mut(&mut self, habit_id: &HabitId) -> StorageResult<&mut Habit> {
        self.habits
            .get_mut(habit_id)
            .ok_or_else(|| StorageError::habit_not_found(habit_id))
    }

    fn insert_completion(&mut self, completion: Completion) -> StorageResult<()> {
        let key = (completion.habit_id.clone(), completion.date);
        if self.by_day.contains_key(&key) {
            return Err(StorageError::DuplicateCompletion {
                habit_id: completion.habit_id.to_string(),
                date: completion.date,
            });
        }
        self.by_day.insert(key, completion.id.clone());
        self.completions.insert(completion.id.clone(), completion);
        Ok(())
    }

    fn sorted_habits(&self) -> Vec<Habit> {
        let mut habits: Vec<Habit> = self.habits.values().cloned().collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        habits
    }
}

/// Memory-backed store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl HabitStore for MemoryStore {
    async fn create_habit(&self, new: &NewHabit) -> StorageResult<Habit> {
        let habit = Habit::from_new(HabitId::new(), new, Utc::now());
        let mut state = self.lock()?;
        state.habits.insert(habit.id.clone(), habit.clone());
        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(habit)
    }

    async fn get_habit(&self, habit_id: &HabitId) -> StorageResult<Habit> {
        let state = self.lock()?;
        state
            .habits
            .get(habit_id)
            .cloned()
            .ok_or_else(|| StorageError::habit_not_found(habit_id))
    }

    async fn list_habits(&self) -> StorageResult<Vec<Habit>> {
        Ok(self.lock()?.sorted_habits())
    }

    async fn update_habit(
        &self,
        habit_id: &HabitId,
        changes: &[HabitChange],
    ) -> StorageResult<Habit> {
        let mut state = self.lock()?;
        let habit = state.habit_mut(habit_id)?;
        for change in changes {
            habit.apply(change);
        }
        habit.updated_at = Utc::now();
        Ok(habit.clone())
    }

    async fn delete_habit(&self, habit_id: &HabitId) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.habits.remove(habit_id).is_none() {
            return Err(StorageError::habit_not_found(habit_id));
        }

        state.by_day.retain(|(owner, _), _| owner != habit_id);
        let before = state.completions.len();
        state.completions.retain(|_, c| &c.habit_id != habit_id);

        tracing::debug!(
            "Deleted habit {} and {} completion(s)",
            habit_id,
            before - state.completions.len()
        );
        Ok(())
    }

    async fn has_completion(&self, habit_id: &HabitId, date: NaiveDate) -> StorageResult<bool> {
        let state = self.lock()?;
        Ok(state.by_day.contains_key(&(habit_id.clone(), date)))
    }

    async fn find_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> StorageResult<Option<Completion>> {
        let state = self.lock()?;
        Ok(state
            .by_day
            .get(&(habit_id.clone(), date))
            .and_then(|id| state.completions.get(id))
            .cloned())
    }

    async fn add_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> StorageResult<Completion> {
        let mut state = self.lock()?;
        if !state.habits.contains_key(habit_id) {
            return Err(StorageError::habit_not_found(habit_id));
        }

        let completion = Completion::new(habit_id.clone(), date);
        state.insert_completion(completion.clone())?;
        tracing::debug!("Created completion {} for habit {} on {}", completion.id, habit_id, date);
        Ok(completion)
    }

    async fn remove_completion(&self, completion_id: &CompletionId) -> StorageResult<()> {
        let mut state = self.lock()?;
        let completion = state.completions.remove(completion_id).ok_or_else(|| {
            StorageError::CompletionNotFound { completion_id: completion_id.to_string() }
        })?;
        state.by_day.remove(&(completion.habit_id, completion.date));
        tracing::debug!("Removed completion {}", completion_id);
        Ok(())
    }

    async fn list_completions(
        &self,
        habit_id: &HabitId,
        range: DateRange,
    ) -> StorageResult<Vec<Completion>> {
        let state = self.lock()?;
        let mut completions: Vec<Completion> = state
            .completions
            .values()
            .filter(|c| &c.habit_id == habit_id && range.contains(c.date))
            .cloned()
            .collect();
        completions.sort_by_key(|c| c.date);
        Ok(completions)
    }

    async fn theme_preference(&self) -> StorageResult<Option<ThemePreference>> {
        Ok(self.lock()?.settings.first().cloned())
    }

    async fn save_theme_preference(&self, preference: &ThemePreference) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.settings.retain(|p| p.id != preference.id);
        state.settings.push(preference.clone());
        state.settings.sort_by_key(|p| p.id);
        Ok(())
    }

    async fn export_all(&self) -> StorageResult<Backup> {
        let state = self.lock()?;
        let mut completions: Vec<Completion> = state.completions.values().cloned().collect();
        completions.sort_by(|a, b| a.habit_id.cmp(&b.habit_id).then(a.date.cmp(&b.date)));

        Ok(Backup {
            habits: state.sorted_habits(),
            completions,
            settings: state.settings.clone(),
        })
    }

    async fn replace_all(&self, backup: &Backup) -> StorageResult<()> {
        // Build the replacement first so a failure leaves the current state intact
        let mut next = MemoryState::default();
        for habit in &backup.habits {
            next.habits.insert(habit.id.clone(), habit.clone());
        }
        for completion in &backup.completions {
            if !next.habits.contains_key(&completion.habit_id) {
                return Err(StorageError::habit_not_found(&completion.habit_id));
            }
            next.insert_completion(completion.clone())?;
        }

        let mut state = self.lock()?;
        next.settings = if backup.settings.is_empty() {
            std::mem::take(&mut state.settings)
        } else {
            backup.settings.clone()
        };
        *state = next;

        tracing::info!(
            "Replaced store contents: {} habit(s), {} completion(s)",
            backup.habits.len(),
            backup.completions.len()
        );
        Ok(())
    }
}
