/// Test doubles shared by the integration tests
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use habit_streaks::*;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// Memory store with switchable failures
///
/// `fail_update` breaks `update_habit`, which is how a toggle persists streaks;
/// `fail_add` and `fail_remove` break the completion writes a rollback needs,
/// `fail_add_on` breaks inserts for particular days only.
/// A gate holds back the first call that reaches it until notified.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_update: AtomicBool,
    pub fail_add: AtomicBool,
    pub fail_remove: AtomicBool,
    failing_days: Mutex<HashSet<NaiveDate>>,
    add_gate: Option<Gate>,
    list_gate: Option<Gate>,
}

/// Parks the first caller until notified; later callers pass straight through
struct Gate {
    notify: Arc<Notify>,
    armed: AtomicBool,
}

impl Gate {
    fn new(notify: Arc<Notify>) -> Self {
        Self { notify, armed: AtomicBool::new(true) }
    }

    async fn pass(gate: &Option<Gate>) {
        if let Some(gate) = gate {
            if gate.armed.swap(false, Ordering::SeqCst) {
                gate.notify.notified().await;
            }
        }
    }
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `add_completion` waits for `gate`
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self { add_gate: Some(Gate::new(gate)), ..Self::default() }
    }

    /// The first `list_completions` reads, then waits for `gate` before returning
    pub fn gated_reads(gate: Arc<Notify>) -> Self {
        Self { list_gate: Some(Gate::new(gate)), ..Self::default() }
    }

    pub fn fail_add_on(&self, date: NaiveDate) {
        self.failing_days.lock().unwrap().insert(date);
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("{} failed", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl HabitStore for FlakyStore {
    async fn create_habit(&self, habit: &NewHabit) -> StorageResult<Habit> {
        self.inner.create_habit(habit).await
    }

    async fn get_habit(&self, habit_id: &HabitId) -> StorageResult<Habit> {
        self.inner.get_habit(habit_id).await
    }

    async fn list_habits(&self) -> StorageResult<Vec<Habit>> {
        self.inner.list_habits().await
    }

    async fn update_habit(
        &self,
        habit_id: &HabitId,
        changes: &[HabitChange],
    ) -> StorageResult<Habit> {
        Self::check(&self.fail_update, "update_habit")?;
        self.inner.update_habit(habit_id, changes).await
    }

    async fn delete_habit(&self, habit_id: &HabitId) -> StorageResult<()> {
        self.inner.delete_habit(habit_id).await
    }

    async fn has_completion(&self, habit_id: &HabitId, date: NaiveDate) -> StorageResult<bool> {
        self.inner.has_completion(habit_id, date).await
    }

    async fn find_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> StorageResult<Option<Completion>> {
        self.inner.find_completion(habit_id, date).await
    }

    async fn add_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> StorageResult<Completion> {
        Gate::pass(&self.add_gate).await;
        Self::check(&self.fail_add, "add_completion")?;
        if self.failing_days.lock().unwrap().contains(&date) {
            return Err(StorageError::Unavailable(format!("add_completion on {} failed", date)));
        }
        self.inner.add_completion(habit_id, date).await
    }

    async fn remove_completion(&self, completion_id: &CompletionId) -> StorageResult<()> {
        Self::check(&self.fail_remove, "remove_completion")?;
        self.inner.remove_completion(completion_id).await
    }

    async fn list_completions(
        &self,
        habit_id: &HabitId,
        range: DateRange,
    ) -> StorageResult<Vec<Completion>> {
        let completions = self.inner.list_completions(habit_id, range).await?;
        // Hand back what was read, however long the caller is held up
        Gate::pass(&self.list_gate).await;
        Ok(completions)
    }

    async fn theme_preference(&self) -> StorageResult<Option<ThemePreference>> {
        self.inner.theme_preference().await
    }

    async fn save_theme_preference(&self, preference: &ThemePreference) -> StorageResult<()> {
        self.inner.save_theme_preference(preference).await
    }

    async fn export_all(&self) -> StorageResult<Backup> {
        self.inner.export_all().await
    }

    async fn replace_all(&self, backup: &Backup) -> StorageResult<()> {
        self.inner.replace_all(backup).await
    }
}

pub fn tracker_on<S: HabitStore>(store: S) -> HabitTracker<S, FixedClock> {
    HabitTracker::with_clock(store, FixedClock(day(10)))
}
