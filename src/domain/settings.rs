/// Theme preference record
///
/// The only settings the app persists. It travels with habits and
/// completions in the export document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id of the single preference record
pub const THEME_PREFERENCE_ID: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePreference {
    pub id: u32,
    pub theme_mode: ThemeMode,
    pub theme_color: String,
    pub updated_at: DateTime<Utc>,
}

impl ThemePreference {
    pub fn new(theme_mode: ThemeMode, theme_color: impl Into<String>) -> Self {
        Self {
            id: THEME_PREFERENCE_ID,
            theme_mode,
            theme_color: theme_color.into(),
            updated_at: Utc::now(),
        }
    }
}

impl Default for ThemePreference {
    /// Light mode, blue palette
    fn default() -> Self {
        Self::new(ThemeMode::Light, "blue")
    }
}
