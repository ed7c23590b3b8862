use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, warn};

use super::{entities::Habit, key_value::KeyValueStore};

/// Key under which the list of habits is kept.
pub const HABITS_KEY: &str = "habits";

/// Bridges the registry and the [KeyValueStore]: the whole list of habits is a single JSON array
/// stored under [HABITS_KEY].
pub struct HabitStore<K> {
    storage: K,
}

impl<K: KeyValueStore> HabitStore<K> {
    pub fn new(storage: K) -> Self {
        Self { storage }
    }

    /// Reads the stored habits. Missing or corrupted data results in an empty list, individual
    /// records that can't be parsed are skipped.
    pub async fn load(&self) -> Vec<Habit> {
        let stored = match self.storage.get(HABITS_KEY).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                debug!("No habits stored yet");
                return vec![];
            }
            Err(e) => {
                warn!("Failed to read stored habits, starting empty: {e:?}");
                return vec![];
            }
        };

        let records = match serde_json::from_str::<Vec<serde_json::Value>>(&stored) {
            Ok(v) => v,
            Err(e) => {
                warn!("Stored habits are not a list, starting empty: {e}");
                return vec![];
            }
        };

        let habits = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Habit>(record.clone()) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Skipping illegal habit record {record}: {e}");
                    None
                }
            })
            .collect();
        sanitize(habits)
    }

    /// Overwrites stored habits with `habits`. An empty list is stored as well.
    pub async fn save(&self, habits: &[Habit]) -> Result<()> {
        let value = serde_json::to_string(habits)?;
        self.storage.set(HABITS_KEY, value).await?;
        debug!("Saved {} habits", habits.len());
        Ok(())
    }
}

/// Restores the invariants of the registry for data that might have been edited by hand.
fn sanitize(habits: Vec<Habit>) -> Vec<Habit> {
    let mut ids = HashSet::new();
    habits
        .into_iter()
        .filter_map(|mut habit| {
            let name = habit.name.trim();
            if name.is_empty() {
                warn!("Dropping habit {} without a name", habit.id);
                return None;
            }
            if !ids.insert(habit.id.clone()) {
                warn!("Dropping habit with duplicate id {}", habit.id);
                return None;
            }
            habit.name = name.to_string();
            let mut seen = HashSet::new();
            habit.completed_dates.retain(|date| seen.insert(*date));
            Some(habit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::storage::{
        entities::{Habit, HabitId, Icon, ReminderTime},
        key_value::{FileKeyValueStore, KeyValueStore},
    };

    use super::{HabitStore, HABITS_KEY};

    fn habits() -> Vec<Habit> {
        vec![
            Habit {
                id: HabitId::new("1"),
                name: "Meditate".into(),
                icon: Icon::Meditation,
                created_at: Utc.with_ymd_and_hms(2024, 2, 27, 8, 30, 0).unwrap(),
                completed_dates: vec![
                    NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
                ],
                reminder_time: ReminderTime::from_hm_opt(7, 0),
            },
            Habit {
                id: HabitId::new("2"),
                name: "Drink water".into(),
                icon: Icon::Water,
                created_at: Utc.with_ymd_and_hms(2024, 2, 28, 12, 0, 0).unwrap(),
                completed_dates: vec![],
                reminder_time: None,
            },
        ]
    }

    #[tokio::test]
    async fn test_load_reproduces_saved_habits() -> Result<()> {
        let dir = tempdir()?;
        let store = HabitStore::new(FileKeyValueStore::new(dir.path().to_owned())?);
        store.save(&habits()).await?;
        assert_eq!(store.load().await, habits());
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_list_is_persisted() -> Result<()> {
        let dir = tempdir()?;
        let store = HabitStore::new(FileKeyValueStore::new(dir.path().to_owned())?);
        store.save(&habits()).await?;
        store.save(&[]).await?;
        assert!(store.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_data_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = HabitStore::new(FileKeyValueStore::new(dir.path().to_owned())?);
        assert!(store.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_data_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileKeyValueStore::new(dir.path().to_owned())?;
        storage.set(HABITS_KEY, "[{\"id\": \"1\", \"na".into()).await?;
        let store = HabitStore::new(storage);
        assert!(store.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_illegal_records_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileKeyValueStore::new(dir.path().to_owned())?;
        let mut records = serde_json::to_value(habits())?;
        records
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({"id": "3", "name": "No timestamp"}));
        storage.set(HABITS_KEY, records.to_string()).await?;
        let store = HabitStore::new(storage);
        assert_eq!(store.load().await, habits());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_restores_invariants() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileKeyValueStore::new(dir.path().to_owned())?;
        let mut stored = habits();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        stored[0].completed_dates = vec![day, day];
        stored[1].name = "  Drink water ".into();
        let mut duplicate = stored[0].clone();
        duplicate.name = "Duplicate".into();
        let mut unnamed = stored[1].clone();
        unnamed.id = HabitId::new("4");
        unnamed.name = "   ".into();
        stored.push(duplicate);
        stored.push(unnamed);
        storage
            .set(HABITS_KEY, serde_json::to_string(&stored)?)
            .await?;

        let loaded = HabitStore::new(storage).load().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].completed_dates, vec![day]);
        assert_eq!(loaded[1].name, "Drink water");
        Ok(())
    }
}
