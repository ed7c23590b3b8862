use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Identifier of a habit. It's derived from the creation time, but should be treated as an opaque
/// string everywhere outside of [crate::registry].
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed set of glyphs a habit can be decorated with. Stored on disk as the glyph itself.
#[derive(
    PartialEq, Eq, Debug, Default, Clone, Copy, Serialize, Deserialize, ValueEnum,
)]
pub enum Icon {
    #[default]
    #[serde(rename = "⭐")]
    Star,
    #[serde(rename = "💪")]
    Strength,
    #[serde(rename = "📚")]
    Reading,
    #[serde(rename = "🏃")]
    Running,
    #[serde(rename = "🧘")]
    Meditation,
    #[serde(rename = "💧")]
    Water,
    #[serde(rename = "🥗")]
    Salad,
    #[serde(rename = "😴")]
    Sleep,
    #[serde(rename = "✍️")]
    Writing,
    #[serde(rename = "🎯")]
    Target,
}

impl Icon {
    pub fn glyph(&self) -> &'static str {
        match self {
            Icon::Star => "⭐",
            Icon::Strength => "💪",
            Icon::Reading => "📚",
            Icon::Running => "🏃",
            Icon::Meditation => "🧘",
            Icon::Water => "💧",
            Icon::Salad => "🥗",
            Icon::Sleep => "😴",
            Icon::Writing => "✍️",
            Icon::Target => "🎯",
        }
    }
}

impl Display for Icon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Daily time of a reminder. Only hours and minutes are kept, so that it can be compared with the
/// current time truncated to a minute.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime(NaiveTime);

impl ReminderTime {
    pub fn from_hm_opt(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Truncates `time` to its minute.
    pub fn of(time: NaiveTime) -> Self {
        Self(time.with_second(0).and_then(|v| v.with_nanosecond(0)).unwrap_or(time))
    }
}

impl Display for ReminderTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for ReminderTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|e| anyhow!("Can't parse {s} into HH:MM time: {e}"))
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReminderTime> for String {
    fn from(value: ReminderTime) -> Self {
        value.to_string()
    }
}

/// A habit as it is kept in the registry and on disk.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    #[serde(default)]
    pub icon: Icon,
    pub created_at: DateTime<Utc>,
    /// Logically a set. Order follows the order in which days were marked.
    #[serde(default)]
    pub completed_dates: Vec<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<ReminderTime>,
}

impl Habit {
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completed_dates.contains(&date)
    }

    /// Adds `date` if it's missing, removes it otherwise. Returns whether the date is completed
    /// afterwards.
    pub fn toggle_date(&mut self, date: NaiveDate) -> bool {
        match self.completed_dates.iter().position(|v| *v == date) {
            Some(index) => {
                self.completed_dates.remove(index);
                false
            }
            None => {
                self.completed_dates.push(date);
                true
            }
        }
    }
}
