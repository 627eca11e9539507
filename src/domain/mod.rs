/// Domain module containing core business logic and data types
///
/// This module defines the core entities (Habit, Completion, Streak) and their
/// validation rules. These types represent the fundamental concepts in our
/// habit tracking system.

pub mod completion;
pub mod habit;
pub mod settings;
pub mod streak;
pub mod types;

// Re-export public types for easy access
pub use completion::*;
pub use habit::*;
pub use settings::*;
pub use streak::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation { message: message.into() }
    }
}
