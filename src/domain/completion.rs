/// Completion entity for tracking habit completions
///
/// A Completion records that a habit was performed on a calendar day.
/// Presence is all that matters: there is no quantity, and at most one
/// completion exists per (habit, date).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CompletionId, HabitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// Unique identifier for this completion
    pub id: CompletionId,
    /// Which habit this completion is for
    pub habit_id: HabitId,
    /// Which day the habit was performed (serialized as `YYYY-MM-DD`)
    pub date: NaiveDate,
    /// When the completion was recorded
    pub created_at: DateTime<Utc>,
}

impl Completion {
    /// A fresh completion with a new id, recorded now
    pub fn new(habit_id: HabitId, date: NaiveDate) -> Self {
        Self {
            id: CompletionId::new(),
            habit_id,
            date,
            created_at: Utc::now(),
        }
    }
}
