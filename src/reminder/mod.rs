//! Daily reminders. [monitor::ReminderMonitor] periodically compares the current minute with the
//! reminder time of every habit and notifies about habits that are still incomplete today.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::storage::entities::{Habit, ReminderTime};

use notifier::Notification;

pub mod monitor;
pub mod notifier;
pub mod source;

pub const REMINDER_TITLE: &str = "Habit Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// Permission wasn't granted or reminders were turned off.
    Disabled,
    Enabled,
}

/// Switch for reminders. Enabling asks the platform for permission to show notifications first
/// and leaves reminders disabled if it's not granted.
#[async_trait]
pub trait ReminderControl: Send + Sync {
    async fn is_enabled(&self) -> bool;

    async fn enable(&self) -> ReminderState;

    async fn disable(&self);
}

/// Habits that should be reminded about at `now`: the reminder time matches the current minute
/// and the habit isn't completed on the current date.
pub fn due_reminders(habits: &[Habit], now: NaiveDateTime) -> impl Iterator<Item = &Habit> {
    let minute = ReminderTime::of(now.time());
    let today = now.date();
    habits
        .iter()
        .filter(move |v| v.reminder_time == Some(minute) && !v.is_completed_on(today))
}

pub fn reminder_notification(habit: &Habit) -> Notification {
    Notification {
        title: REMINDER_TITLE.into(),
        body: format!("Time to complete: {}", habit.name),
        icon: habit.icon.glyph().into(),
    }
}
