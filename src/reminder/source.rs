use async_trait::async_trait;
use tokio::sync::watch;

use crate::{
    registry::Snapshot,
    storage::{habit_store::HabitStore, key_value::KeyValueStore},
};

/// Provides the habits a reminder check works with. Every call must return the latest state, never
/// a copy captured earlier.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    async fn latest(&self) -> Snapshot;
}

/// Snapshots of a registry living in the same process.
#[async_trait]
impl SnapshotSource for watch::Receiver<Snapshot> {
    async fn latest(&self) -> Snapshot {
        self.borrow().clone()
    }
}

/// Reads habits from the store on every call. Used when habits are changed by another process.
pub struct StoreSnapshots<K> {
    store: HabitStore<K>,
}

impl<K: KeyValueStore> StoreSnapshots<K> {
    pub fn new(store: HabitStore<K>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<K: KeyValueStore + 'static> SnapshotSource for StoreSnapshots<K> {
    async fn latest(&self) -> Snapshot {
        self.store.load().await.into()
    }
}
