//! In-memory state of a session. [HabitRegistry] is the single source of truth for habits while the
//! application runs and writes every change through to [HabitStore].

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    storage::{
        entities::{Habit, HabitId, Icon, ReminderTime},
        habit_store::HabitStore,
        key_value::KeyValueStore,
    },
    utils::clock::Clock,
};

pub mod streak;
pub mod tracker;

/// Immutable view of the registry. Every mutation publishes a new one, so readers holding an old
/// snapshot are never affected by changes.
pub type Snapshot = Arc<[Habit]>;

pub const DELETE_PROMPT: &str = "Delete this habit?";

/// Asks the user to approve a destructive action.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

pub struct HabitRegistry<K> {
    store: HabitStore<K>,
    clock: Box<dyn Clock>,
    snapshot: watch::Sender<Snapshot>,
}

impl<K: KeyValueStore> HabitRegistry<K> {
    /// Creates the registry from whatever is stored. Broken storage results in an empty registry.
    pub async fn init(store: HabitStore<K>, clock: Box<dyn Clock>) -> Self {
        let habits = store.load().await;
        info!("Loaded {} habits", habits.len());
        let (snapshot, _) = watch::channel(Snapshot::from(habits));
        Self {
            store,
            clock,
            snapshot,
        }
    }

    /// Current habits in insertion order.
    pub fn all(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that always yields the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    pub fn find(&self, id: &HabitId) -> Option<Habit> {
        self.snapshot.borrow().iter().find(|v| v.id == *id).cloned()
    }

    /// Finds a habit either by its exact id or by its name, as long as the name is unambiguous.
    pub fn resolve(&self, reference: &str) -> Option<HabitId> {
        let habits = self.snapshot.borrow();
        let reference = reference.trim();
        if let Some(habit) = habits.iter().find(|v| v.id.as_str() == reference) {
            return Some(habit.id.clone());
        }
        let mut by_name = habits
            .iter()
            .filter(|v| v.name.to_lowercase() == reference.to_lowercase());
        match (by_name.next(), by_name.next()) {
            (Some(habit), None) => Some(habit.id.clone()),
            _ => None,
        }
    }

    /// Appends a new habit. Names that are empty after trimming are ignored and `None` is
    /// returned.
    pub async fn add(
        &mut self,
        name: &str,
        icon: Icon,
        reminder_time: Option<ReminderTime>,
    ) -> Result<Option<Habit>> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring habit without a name");
            return Ok(None);
        }

        let mut habits = self.all().to_vec();
        let habit = Habit {
            id: self.next_id(&habits),
            name: name.to_string(),
            icon,
            created_at: self.clock.time(),
            completed_dates: vec![],
            reminder_time,
        };
        habits.push(habit.clone());
        self.publish(habits).await?;
        info!("Added habit {} ({})", habit.name, habit.id);
        Ok(Some(habit))
    }

    /// Marks `date` as completed, or unmarks it if it already was. Returns `None` for unknown
    /// habits, otherwise whether `date` is completed afterwards.
    pub async fn toggle(&mut self, id: &HabitId, date: NaiveDate) -> Result<Option<bool>> {
        let mut habits = self.all().to_vec();
        let Some(habit) = habits.iter_mut().find(|v| v.id == *id) else {
            debug!("Toggling unknown habit {id}");
            return Ok(None);
        };
        let completed = habit.toggle_date(date);
        self.publish(habits).await?;
        info!("Habit {id} completed on {date}: {completed}");
        Ok(Some(completed))
    }

    /// Deletes a habit after `confirm` approves it. Returns whether anything was deleted.
    pub async fn remove(&mut self, id: &HabitId, confirm: &dyn Confirm) -> Result<bool> {
        let habits = self.all();
        if !habits.iter().any(|v| v.id == *id) {
            debug!("Removing unknown habit {id}");
            return Ok(false);
        }
        if !confirm.confirm(DELETE_PROMPT) {
            debug!("Removal of {id} was not confirmed");
            return Ok(false);
        }
        let remaining = habits
            .iter()
            .filter(|v| v.id != *id)
            .cloned()
            .collect::<Vec<_>>();
        self.publish(remaining).await?;
        info!("Removed habit {id}");
        Ok(true)
    }

    /// Ids come from the creation time in milliseconds. Habits created within the same
    /// millisecond get the next free value.
    fn next_id(&self, habits: &[Habit]) -> HabitId {
        let mut candidate = self.clock.time().timestamp_millis();
        while habits.iter().any(|v| v.id.as_str() == candidate.to_string()) {
            candidate += 1;
        }
        HabitId::new(candidate.to_string())
    }

    async fn publish(&mut self, habits: Vec<Habit>) -> Result<()> {
        let snapshot = Snapshot::from(habits);
        self.snapshot.send_replace(snapshot.clone());
        self.store.save(&snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::{tempdir, TempDir};

    use crate::{
        storage::{
            entities::{HabitId, Icon, ReminderTime},
            habit_store::HabitStore,
            key_value::FileKeyValueStore,
        },
        utils::clock::test_clock::TestClock,
    };

    use super::{HabitRegistry, MockConfirm, DELETE_PROMPT};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn store(dir: &TempDir) -> Result<HabitStore<FileKeyValueStore>> {
        Ok(HabitStore::new(FileKeyValueStore::new(dir.path().to_owned())?))
    }

    async fn registry(dir: &TempDir) -> Result<HabitRegistry<FileKeyValueStore>> {
        Ok(HabitRegistry::init(store(dir)?, Box::new(TestClock::new(now()))).await)
    }

    fn confirming(answer: bool) -> MockConfirm {
        let mut confirm = MockConfirm::new();
        confirm
            .expect_confirm()
            .withf(|prompt| prompt.to_string() == DELETE_PROMPT)
            .return_const(answer);
        confirm
    }

    #[tokio::test]
    async fn test_add_appends_one_habit() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        registry.add("Read", Icon::Reading, None).await?;
        let added = registry
            .add("  Stretch  ", Icon::default(), ReminderTime::from_hm_opt(9, 0))
            .await?
            .unwrap();

        let habits = registry.all();
        assert_eq!(habits.len(), 2);
        assert_eq!(habits[1], added);
        assert_eq!(added.name, "Stretch");
        assert_eq!(added.icon, Icon::Star);
        assert!(added.completed_dates.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_blank_name_is_ignored() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        assert!(registry.add("   ", Icon::Water, None).await?.is_none());
        assert!(registry.all().is_empty());
        assert!(store(&dir)?.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_ids_are_unique_within_a_millisecond() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let first = registry.add("One", Icon::Star, None).await?.unwrap();
        let second = registry.add("Two", Icon::Star, None).await?.unwrap();
        assert_ne!(first.id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_dates() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let habit = registry.add("Read", Icon::Reading, None).await?.unwrap();
        let day = now().date();

        assert_eq!(registry.toggle(&habit.id, day).await?, Some(true));
        assert_eq!(registry.find(&habit.id).unwrap().completed_dates, vec![day]);
        assert_eq!(registry.toggle(&habit.id, day).await?, Some(false));
        assert_eq!(registry.find(&habit.id).unwrap(), habit);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_unknown_habit() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        registry.add("Read", Icon::Reading, None).await?;
        let before = registry.all();
        assert_eq!(
            registry.toggle(&HabitId::new("missing"), now().date()).await?,
            None
        );
        assert_eq!(registry.all(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_requires_confirmation() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let keep = registry.add("Keep", Icon::Star, None).await?.unwrap();
        let drop = registry.add("Drop", Icon::Star, None).await?.unwrap();

        assert!(!registry.remove(&drop.id, &confirming(false)).await?);
        assert_eq!(registry.all().len(), 2);

        assert!(registry.remove(&drop.id, &confirming(true)).await?);
        assert_eq!(registry.all().to_vec(), vec![keep]);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_unknown_does_not_prompt() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().never();
        assert!(!registry.remove(&HabitId::new("missing"), &confirm).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_removing_last_habit_is_persisted() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let habit = registry.add("Only", Icon::Star, None).await?.unwrap();
        registry.remove(&habit.id, &confirming(true)).await?;

        let reloaded = HabitRegistry::init(store(&dir)?, Box::new(TestClock::new(now()))).await;
        assert!(reloaded.all().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_changes_survive_reload() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let habit = registry.add("Read", Icon::Reading, None).await?.unwrap();
        registry.toggle(&habit.id, now().date()).await?;

        let reloaded = HabitRegistry::init(store(&dir)?, Box::new(TestClock::new(now()))).await;
        assert_eq!(reloaded.all(), registry.all());
        Ok(())
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_snapshot() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let receiver = registry.subscribe();
        let old = registry.all();
        registry.add("Read", Icon::Reading, None).await?;

        assert!(old.is_empty());
        assert_eq!(receiver.borrow().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_by_id_or_unique_name() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = registry(&dir).await?;
        let read = registry.add("Read", Icon::Reading, None).await?.unwrap();
        registry.add("Walk", Icon::Running, None).await?;
        registry.add("walk", Icon::Running, None).await?;

        assert_eq!(registry.resolve(read.id.as_str()), Some(read.id.clone()));
        assert_eq!(registry.resolve("read"), Some(read.id));
        assert_eq!(registry.resolve("Walk"), None);
        assert_eq!(registry.resolve("Swim"), None);
        Ok(())
    }
}
