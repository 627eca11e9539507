/// Habit entity and related functionality
///
/// This module defines the core Habit struct that represents a user's habit
/// they want to track, the input used to create one, and the per-field
/// changes that can be applied to it.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Color, DomainError, Frequency, HabitId, Streak};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_TARGET: u32 = 10_000;

/// A habit represents something the user wants to do regularly
///
/// `current_streak` and `longest_streak` are a cache over the habit's
/// completions. They are refreshed after every toggle and can be recomputed
/// from the completion store at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Unique identifier, assigned by the store
    pub id: HabitId,
    /// Display name (e.g., "Morning Run", "Read for 30min")
    pub name: String,
    /// Optional detailed description
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: Frequency,
    pub color: Color,
    /// Times per period
    pub target: u32,
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default, with = "crate::domain::types::hhmm")]
    pub reminder_time: Option<NaiveTime>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Build a stored habit from validated input
    ///
    /// Stores call this when they assign the identity; both streaks start at zero.
    pub fn from_new(id: HabitId, new: &NewHabit, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name.trim().to_string(),
            description: normalize_description(&new.description),
            frequency: new.frequency,
            color: new.color.clone(),
            target: new.target,
            reminder_enabled: new.reminder_enabled,
            reminder_time: new.reminder_time,
            current_streak: 0,
            longest_streak: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The cached streak fields
    pub fn streak(&self) -> Streak {
        Streak {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
        }
    }

    /// Apply one change without validation
    ///
    /// Callers validate with [`HabitChange::validate`] first; stores only apply.
    pub fn apply(&mut self, change: &HabitChange) {
        match change {
            HabitChange::Name(name) => self.name = name.trim().to_string(),
            HabitChange::Description(description) => {
                self.description = normalize_description(description)
            }
            HabitChange::Frequency(frequency) => self.frequency = *frequency,
            HabitChange::Color(color) => self.color = color.clone(),
            HabitChange::Target(target) => self.target = *target,
            HabitChange::Reminder { enabled, time } => {
                self.reminder_enabled = *enabled;
                self.reminder_time = *time;
            }
            HabitChange::Streaks(streak) => {
                self.current_streak = streak.current_streak;
                self.longest_streak = streak.longest_streak;
            }
        }
    }

    /// Check every field against the business rules
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;
        validate_description(&self.description)?;
        validate_target(self.target)?;
        validate_reminder(self.reminder_enabled, self.reminder_time)
    }
}

/// Input for creating a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "default_target")]
    pub target: u32,
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default, with = "crate::domain::types::hhmm")]
    pub reminder_time: Option<NaiveTime>,
}

fn default_target() -> u32 {
    1
}

impl NewHabit {
    /// A daily habit with default color, target 1 and no reminder
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            frequency: Frequency::Daily,
            color: Color::default(),
            target: default_target(),
            reminder_enabled: false,
            reminder_time: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_target(mut self, target: u32) -> Self {
        self.target = target;
        self
    }

    pub fn with_reminder(mut self, time: NaiveTime) -> Self {
        self.reminder_enabled = true;
        self.reminder_time = Some(time);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;
        validate_description(&self.description)?;
        validate_target(self.target)?;
        validate_reminder(self.reminder_enabled, self.reminder_time)
    }
}

/// One edit to a single habit field
///
/// Each variant carries everything needed to validate it on its own, so a
/// batch of changes can be rejected before anything reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub enum HabitChange {
    Name(String),
    Description(Option<String>),
    Frequency(Frequency),
    Color(Color),
    Target(u32),
    Reminder { enabled: bool, time: Option<NaiveTime> },
    /// Refreshed streak cache; written by the tracker, never by user edits
    Streaks(Streak),
}

impl HabitChange {
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            HabitChange::Name(name) => validate_name(name),
            HabitChange::Description(description) => validate_description(description),
            HabitChange::Frequency(_) | HabitChange::Color(_) => Ok(()),
            HabitChange::Target(target) => validate_target(*target),
            HabitChange::Reminder { enabled, time } => validate_reminder(*enabled, *time),
            HabitChange::Streaks(streak) => {
                if streak.longest_streak < streak.current_streak {
                    return Err(DomainError::InvalidValue {
                        message: "Longest streak cannot be shorter than the current streak"
                            .to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Whether this change is part of the user-editable surface
    pub fn is_user_editable(&self) -> bool {
        !matches!(self, HabitChange::Streaks(_))
    }
}

// Validation helpers

fn normalize_description(description: &Option<String>) -> Option<String> {
    description
        .as_ref()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(DomainError::InvalidHabitName(
            "Habit name cannot be empty".to_string(),
        ));
    }

    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::InvalidHabitName(format!(
            "Habit name cannot be longer than {} characters",
            MAX_NAME_LEN
        )));
    }

    Ok(())
}

fn validate_description(description: &Option<String>) -> Result<(), DomainError> {
    if let Some(desc) = description {
        if desc.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(DomainError::validation(format!(
                "Description cannot be longer than {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
    }
    Ok(())
}

fn validate_target(target: u32) -> Result<(), DomainError> {
    if target == 0 {
        return Err(DomainError::InvalidValue {
            message: "Target must be greater than 0".to_string(),
        });
    }
    if target > MAX_TARGET {
        return Err(DomainError::InvalidValue {
            message: format!("Target cannot exceed {}", MAX_TARGET),
        });
    }
    Ok(())
}

fn validate_reminder(enabled: bool, time: Option<NaiveTime>) -> Result<(), DomainError> {
    if enabled && time.is_none() {
        return Err(DomainError::validation(
            "A reminder time is required when reminders are enabled",
        ));
    }
    Ok(())
}
