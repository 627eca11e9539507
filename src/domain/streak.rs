/// Streak calculation
///
/// Derives a habit's current and longest streak from the set of days it was
/// completed on. This is a pure function of the completion dates and "today";
/// the values stored on a habit are only a cache of its result.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::Completion;

/// Current and longest run of consecutive completed days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    /// Unbroken run ending today, or ending yesterday when today is not marked yet
    pub current_streak: u32,
    /// Longest unbroken run anywhere in history
    pub longest_streak: u32,
}

impl Streak {
    /// Calculate streaks from completion dates
    ///
    /// Dates may arrive in any order and may repeat; each calendar day counts once.
    pub fn calculate<I>(dates: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let days: BTreeSet<NaiveDate> = dates.into_iter().collect();
        if days.is_empty() {
            return Self::default();
        }

        Self {
            current_streak: Self::calculate_current_streak(&days, today),
            longest_streak: Self::calculate_longest_streak(&days),
        }
    }

    /// Calculate streaks from a habit's completion records
    pub fn from_completions(completions: &[Completion], today: NaiveDate) -> Self {
        Self::calculate(completions.iter().map(|c| c.date), today)
    }

    /// Count consecutive days backwards from today
    ///
    /// An unmarked today does not break the run: counting then starts at
    /// yesterday. The loop is bounded by the number of recorded days.
    fn calculate_current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
        let mut checking_date = if days.contains(&today) {
            today
        } else {
            today - Duration::days(1)
        };

        let mut current_streak = 0;
        while days.contains(&checking_date) {
            current_streak += 1;
            checking_date = match checking_date.pred_opt() {
                Some(previous) => previous,
                None => break,
            };
        }

        current_streak
    }

    /// Longest run of consecutive days in ascending order
    fn calculate_longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
        let mut longest_streak = 0;
        let mut current_run = 0;
        let mut last_date: Option<NaiveDate> = None;

        for &date in days {
            current_run = match last_date {
                Some(last) if (date - last).num_days() == 1 => current_run + 1,
                _ => 1,
            };
            longest_streak = longest_streak.max(current_run);
            last_date = Some(date);
        }

        longest_streak
    }
}

/// Compute `(current, longest)` streaks over a set of completion dates
pub fn compute_streaks<I>(dates: I, today: NaiveDate) -> Streak
where
    I: IntoIterator<Item = NaiveDate>,
{
    Streak::calculate(dates, today)
}
