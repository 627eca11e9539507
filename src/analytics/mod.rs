/// Analytics engine for habit statistics
///
/// Turns a habit's cached streaks and its recent completions into the
/// figures shown on the statistics dashboard.

use serde::Serialize;

use crate::domain::Habit;

/// Days in the statistics window
pub const DEFAULT_WINDOW_DAYS: u32 = 365;

/// Statistics for one habit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Completions inside the window
    pub total_completions: u32,
    /// Percentage of days in the window that were completed
    pub completion_rate: f64,
}

/// Statistics across all habits
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub habit_count: u32,
    pub total_completions: u32,
    /// Mean current streak, rounded to the nearest day
    pub average_current_streak: u32,
    /// Best longest streak of any habit
    pub best_longest_streak: u32,
    pub completion_rate: f64,
}

/// Computes statistics over a fixed window of days
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    window_days: u32,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_DAYS)
    }

    pub fn with_window(window_days: u32) -> Self {
        Self {
            window_days: window_days.max(1),
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Stats for one habit given how many completions fall inside the window
    pub fn habit_stats(&self, habit: &Habit, completions_in_window: usize) -> HabitStats {
        let total = completions_in_window as u32;
        HabitStats {
            current_streak: habit.current_streak,
            longest_streak: habit.longest_streak,
            total_completions: total,
            completion_rate: self.rate(total, 1),
        }
    }

    /// Stats across habits, each paired with its completions inside the window
    pub fn dashboard_stats(&self, habits: &[(Habit, usize)]) -> DashboardStats {
        let habit_count = habits.len() as u32;
        let total_completions: u32 = habits.iter().map(|(_, count)| *count as u32).sum();
        let streak_sum: u32 = habits.iter().map(|(habit, _)| habit.current_streak).sum();
        let best_longest_streak = habits
            .iter()
            .map(|(habit, _)| habit.longest_streak)
            .max()
            .unwrap_or(0);

        let average_current_streak =
            (f64::from(streak_sum) / f64::from(habit_count.max(1))).round() as u32;

        DashboardStats {
            habit_count,
            total_completions,
            average_current_streak,
            best_longest_streak,
            completion_rate: self.rate(total_completions, habit_count),
        }
    }

    fn rate(&self, completions: u32, habits: u32) -> f64 {
        if habits == 0 {
            return 0.0;
        }
        f64::from(completions) / (f64::from(self.window_days) * f64::from(habits)) * 100.0
    }
}
