use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::NaiveDate;

use crate::{
    registry::{streak::streak, tracker::HabitTracker, Confirm},
    reminder::ReminderControl,
    storage::{
        entities::{Habit, Icon, ReminderTime},
        key_value::KeyValueStore,
    },
    utils::time::format_date,
};

const EMPTY_TEXT: &str = "No habits yet. Start building your routine!";

pub async fn add_habit<K: KeyValueStore, R: ReminderControl>(
    tracker: &mut HabitTracker<K, R>,
    name: &str,
    icon: Icon,
    reminder: Option<ReminderTime>,
) -> Result<()> {
    match tracker.add(name, icon, reminder).await? {
        Some(habit) => println!("Added {} {} ({})", habit.icon, habit.name, habit.id),
        None => println!("Habit name can't be empty, nothing was added"),
    }
    Ok(())
}

pub async fn toggle_habit<K: KeyValueStore, R: ReminderControl>(
    tracker: &mut HabitTracker<K, R>,
    reference: &str,
    date: NaiveDate,
) -> Result<()> {
    let Some(id) = tracker.registry().resolve(reference) else {
        println!("No habit matches {reference:?}");
        return Ok(());
    };
    match tracker.toggle(&id, date).await? {
        Some(true) => println!("Completed on {}", format_date(date)),
        Some(false) => println!("Not completed on {} anymore", format_date(date)),
        None => println!("No habit matches {reference:?}"),
    }
    Ok(())
}

pub async fn remove_habit<K: KeyValueStore, R: ReminderControl>(
    tracker: &mut HabitTracker<K, R>,
    reference: &str,
    confirm: &dyn Confirm,
) -> Result<()> {
    let Some(id) = tracker.registry().resolve(reference) else {
        println!("No habit matches {reference:?}");
        return Ok(());
    };
    if tracker.remove(&id, confirm).await? {
        println!("Deleted");
    } else {
        println!("Nothing was deleted");
    }
    Ok(())
}

pub fn print_habits(habits: &[Habit], today: NaiveDate) {
    if habits.is_empty() {
        println!("{EMPTY_TEXT}");
        return;
    }
    for habit in habits {
        let mark = if habit.is_completed_on(today) {
            Colour::Green.bold().paint("✓")
        } else {
            Style::new().dimmed().paint("○")
        };
        println!("{mark} {}", describe_habit(habit, today));
    }
}

/// Single line describing a habit, without the completion mark.
fn describe_habit(habit: &Habit, today: NaiveDate) -> String {
    let mut line = format!(
        "{} {}\t🔥 {} day streak",
        habit.icon,
        habit.name,
        streak(habit, today)
    );
    if let Some(reminder) = habit.reminder_time {
        line += &format!("\t🔔 {reminder}");
    }
    line += &format!("\t[{}]", habit.id);
    line
}
