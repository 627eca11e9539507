/// Export/import document
///
/// The whole store as one JSON document:
/// `{ "habits": [...], "completions": [...], "settings": [...] }`.
/// Imports replace existing habits and completions wholesale.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Completion, Habit, ThemePreference};

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data format: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    Invariant(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Backup {
    pub habits: Vec<Habit>,
    pub completions: Vec<Completion>,
    #[serde(default)]
    pub settings: Vec<ThemePreference>,
}

impl Backup {
    /// Parse an import document
    ///
    /// The structure is checked first (an object with `habits` and
    /// `completions` arrays, and `settings` as an array when present) so that a
    /// wrong document is reported as such rather than as a field-level error.
    pub fn from_json(input: &str) -> Result<Self, BackupError> {
        let mut value: Value = serde_json::from_str(input)?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| BackupError::Format("expected a JSON object".to_string()))?;

        for key in ["habits", "completions"] {
            match object.get(key) {
                Some(Value::Array(_)) => {}
                Some(_) => return Err(BackupError::Format(format!("'{}' must be an array", key))),
                None => return Err(BackupError::Format(format!("missing '{}'", key))),
            }
        }

        match object.get("settings") {
            None | Some(Value::Array(_)) => {}
            Some(Value::Null) => {
                object.remove("settings");
            }
            Some(_) => return Err(BackupError::Format("'settings' must be an array".to_string())),
        }

        let backup: Backup = serde_json::from_value(value)?;
        backup.validate()?;
        Ok(backup)
    }

    pub fn to_json_pretty(&self) -> Result<String, BackupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the data-model invariants the store relies on
    pub fn validate(&self) -> Result<(), BackupError> {
        let mut habit_ids = HashSet::new();
        for habit in &self.habits {
            if !habit_ids.insert(&habit.id) {
                return Err(BackupError::Invariant(format!("duplicate habit id {}", habit.id)));
            }
            habit
                .validate()
                .map_err(|e| BackupError::Invariant(format!("habit {}: {}", habit.id, e)))?;
        }

        let mut completion_ids = HashSet::new();
        let mut days = HashSet::new();
        for completion in &self.completions {
            if !habit_ids.contains(&completion.habit_id) {
                return Err(BackupError::Invariant(format!(
                    "completion {} references unknown habit {}",
                    completion.id, completion.habit_id
                )));
            }
            if !completion_ids.insert(&completion.id) {
                return Err(BackupError::Invariant(format!(
                    "duplicate completion id {}",
                    completion.id
                )));
            }
            if !days.insert((&completion.habit_id, completion.date)) {
                return Err(BackupError::Invariant(format!(
                    "habit {} has more than one completion on {}",
                    completion.habit_id, completion.date
                )));
            }
        }

        Ok(())
    }
}
