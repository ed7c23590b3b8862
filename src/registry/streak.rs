use chrono::NaiveDate;

use crate::{storage::entities::Habit, utils::time::days_backwards};

/// Number of consecutive days, ending at `today`, on which `habit` was completed.
///
/// The run has to include `today` itself: a habit whose last completion was yesterday has a streak
/// of 0. Dates after `today` are ignored.
pub fn streak(habit: &Habit, today: NaiveDate) -> u32 {
    let mut dates = habit
        .completed_dates
        .iter()
        .copied()
        .filter(|date| *date <= today)
        .collect::<Vec<_>>();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let length = dates
        .into_iter()
        .zip(days_backwards(today))
        .take_while(|(completed, expected)| completed == expected)
        .count();
    u32::try_from(length).unwrap_or(u32::MAX)
}
