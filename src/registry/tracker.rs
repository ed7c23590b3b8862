use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::info;

use crate::{
    reminder::{ReminderControl, ReminderState},
    storage::{
        entities::{Habit, HabitId, Icon, ReminderTime},
        habit_store::HabitStore,
        key_value::KeyValueStore,
    },
    utils::clock::Clock,
};

use super::{Confirm, HabitRegistry, Snapshot};

/// State of a single session: the registry together with the reminders that watch it. Created
/// with [HabitTracker::init] and finished with [HabitTracker::teardown].
pub struct HabitTracker<K, R> {
    registry: HabitRegistry<K>,
    reminders: R,
}

impl<K: KeyValueStore, R: ReminderControl> HabitTracker<K, R> {
    pub async fn init(store: HabitStore<K>, reminders: R, clock: Box<dyn Clock>) -> Self {
        Self::init_with(store, clock, |_| reminders).await
    }

    /// Creates the registry first and then the reminders, which receive the registry's snapshots.
    pub async fn init_with(
        store: HabitStore<K>,
        clock: Box<dyn Clock>,
        reminders: impl FnOnce(watch::Receiver<Snapshot>) -> R,
    ) -> Self {
        let registry = HabitRegistry::init(store, clock).await;
        let reminders = reminders(registry.subscribe());
        Self {
            registry,
            reminders,
        }
    }

    pub fn registry(&self) -> &HabitRegistry<K> {
        &self.registry
    }

    pub fn reminders(&self) -> &R {
        &self.reminders
    }

    pub fn all(&self) -> Snapshot {
        self.registry.all()
    }

    /// Adds a habit. A habit with a reminder time also asks for reminders to be enabled if they
    /// aren't yet.
    pub async fn add(
        &mut self,
        name: &str,
        icon: Icon,
        reminder_time: Option<ReminderTime>,
    ) -> Result<Option<Habit>> {
        let habit = self.registry.add(name, icon, reminder_time).await?;
        if habit.as_ref().is_some_and(|v| v.reminder_time.is_some())
            && !self.reminders.is_enabled().await
        {
            match self.reminders.enable().await {
                ReminderState::Enabled => info!("Reminders were enabled for a new habit"),
                ReminderState::Disabled => info!("Reminders remain disabled"),
            }
        }
        Ok(habit)
    }

    pub async fn toggle(&mut self, id: &HabitId, date: NaiveDate) -> Result<Option<bool>> {
        self.registry.toggle(id, date).await
    }

    pub async fn remove(&mut self, id: &HabitId, confirm: &dyn Confirm) -> Result<bool> {
        self.registry.remove(id, confirm).await
    }

    /// Stops the reminders that belong to the session.
    pub async fn teardown(self) {
        self.reminders.disable().await;
    }
}
