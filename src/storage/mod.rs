/// Storage layer for persisting habit data
///
/// This module defines the persistence interface the tracker is written
/// against, along with two interchangeable implementations: an embedded
/// SQLite store and an in-process memory store.

pub mod memory;
pub mod migrations;
pub mod sqlite;

// Re-export the main storage types
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::backup::Backup;
use crate::domain::{
    Completion, CompletionId, DateRange, Habit, HabitChange, HabitId, NewHabit, ThemePreference,
};
use crate::ErrorKind;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Completion not found: {completion_id}")]
    CompletionNotFound { completion_id: String },

    #[error("Duplicate completion: habit {habit_id} already completed on {date}")]
    DuplicateCompletion { habit_id: String, date: NaiveDate },

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    pub fn habit_not_found(habit_id: &HabitId) -> Self {
        StorageError::HabitNotFound { habit_id: habit_id.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::HabitNotFound { .. } | StorageError::CompletionNotFound { .. } => {
                ErrorKind::NotFound
            }
            StorageError::DuplicateCompletion { .. } => ErrorKind::Duplicate,
            StorageError::Connection(_)
            | StorageError::Unavailable(_)
            | StorageError::Query(_)
            | StorageError::Serialization(_)
            | StorageError::Migration(_) => ErrorKind::StoreUnavailable,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence interface for habits, completions and settings
///
/// Every call may suspend. Implementations serialize their own writes and
/// enforce at most one completion per (habit, date).
#[async_trait]
pub trait HabitStore: Send + Sync {
    // Habits

    /// Create a habit, assigning its id and timestamps
    async fn create_habit(&self, habit: &NewHabit) -> StorageResult<Habit>;

    /// Get a habit by ID
    async fn get_habit(&self, habit_id: &HabitId) -> StorageResult<Habit>;

    /// All habits, oldest first
    async fn list_habits(&self) -> StorageResult<Vec<Habit>>;

    /// Apply changes to a habit and bump its `updated_at`
    async fn update_habit(&self, habit_id: &HabitId, changes: &[HabitChange])
        -> StorageResult<Habit>;

    /// Delete a habit together with all of its completions
    async fn delete_habit(&self, habit_id: &HabitId) -> StorageResult<()>;

    // Completions

    /// Whether the habit is completed on `date`
    async fn has_completion(&self, habit_id: &HabitId, date: NaiveDate) -> StorageResult<bool>;

    /// The completion for (habit, date), if any
    async fn find_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> StorageResult<Option<Completion>>;

    /// Record a completion; fails with `DuplicateCompletion` if one exists
    async fn add_completion(&self, habit_id: &HabitId, date: NaiveDate)
        -> StorageResult<Completion>;

    /// Remove a completion by id; fails with `CompletionNotFound` if absent
    async fn remove_completion(&self, completion_id: &CompletionId) -> StorageResult<()>;

    /// Completions of one habit within `range`, ascending by date
    async fn list_completions(
        &self,
        habit_id: &HabitId,
        range: DateRange,
    ) -> StorageResult<Vec<Completion>>;

    // Settings

    async fn theme_preference(&self) -> StorageResult<Option<ThemePreference>>;

    async fn save_theme_preference(&self, preference: &ThemePreference) -> StorageResult<()>;

    // Bulk

    /// Everything the store holds, as an export document
    async fn export_all(&self) -> StorageResult<Backup>;

    /// Replace habits and completions wholesale
    ///
    /// Settings are replaced only when the backup carries at least one record.
    async fn replace_all(&self, backup: &Backup) -> StorageResult<()>;
}
