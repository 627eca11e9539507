/// Public library interface for the habit streak engine
///
/// This module exports the tracker that owns habit and completion state,
/// the store implementations it can run on, and the public domain types.

use chrono::NaiveDate;
use thiserror::Error;

// Internal modules
mod analytics;
mod backup;
mod cache;
mod clock;
mod domain;
mod storage;
mod tracker;

// Re-export public modules and types
pub use analytics::{AnalyticsEngine, DashboardStats, HabitStats};
pub use backup::{Backup, BackupError};
pub use cache::HabitCache;
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::*;
pub use storage::{HabitStore, MemoryStore, SqliteStore, StorageError, StorageResult};
pub use tracker::{HabitTracker, ToggleOutcome};

/// What went wrong, independent of which layer reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before touching the store
    Validation,
    /// A referenced habit or completion does not exist
    NotFound,
    /// A second completion for the same habit and day
    Duplicate,
    /// The store is unreachable or failed; nothing was left half-applied
    StoreUnavailable,
}

/// Errors returned by tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid backup: {0}")]
    InvalidBackup(#[from] BackupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A toggle for habit {habit_id} on {date} is already in progress")]
    ToggleInFlight { habit_id: String, date: NaiveDate },

    #[error("Could not roll back completion change for habit {habit_id} after '{cause}': {rollback}")]
    RollbackFailed {
        habit_id: String,
        cause: StorageError,
        rollback: StorageError,
    },
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Domain(_)
            | TrackerError::InvalidBackup(_)
            | TrackerError::ToggleInFlight { .. } => ErrorKind::Validation,
            TrackerError::Storage(err) => err.kind(),
            TrackerError::RollbackFailed { .. } | TrackerError::Io(_) => ErrorKind::StoreUnavailable,
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
