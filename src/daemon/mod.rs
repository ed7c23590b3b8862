use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    registry::tracker::HabitTracker,
    reminder::{
        monitor::ReminderMonitor,
        notifier::{default_notifier, Notifier},
        source::StoreSnapshots,
        ReminderControl, ReminderState,
    },
    storage::{habit_store::HabitStore, key_value::FileKeyValueStore, store_dir},
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod shutdown;

type DaemonTracker = HabitTracker<Arc<FileKeyValueStore>, ReminderMonitor>;

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: &Path, check_interval: Duration) -> Result<()> {
    let shutdown_token = CancellationToken::new();
    let notifier: Arc<dyn Notifier> = default_notifier().into();
    let tracker =
        create_tracker(dir, notifier, &shutdown_token, check_interval, DefaultClock).await?;

    let (_, session_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        run_session(&tracker, &shutdown_token),
    );
    tracker.teardown().await;
    session_result
}

/// The daemon doesn't change habits. Its reminders read them from the store on every check, so
/// changes made through the cli are picked up without a restart.
async fn create_tracker(
    dir: &Path,
    notifier: Arc<dyn Notifier>,
    shutdown_token: &CancellationToken,
    check_interval: Duration,
    clock: impl Clock + Clone,
) -> Result<DaemonTracker> {
    let storage = Arc::new(FileKeyValueStore::new(store_dir(dir))?);
    let monitor = ReminderMonitor::new(
        notifier,
        Box::new(StoreSnapshots::new(HabitStore::new(storage.clone()))),
        Box::new(clock.clone()),
        check_interval,
        shutdown_token,
    );
    Ok(HabitTracker::init(HabitStore::new(storage), monitor, Box::new(clock)).await)
}

/// Keeps reminders running until shutdown is requested. Returns right away when notifications
/// aren't permitted.
async fn run_session(tracker: &DaemonTracker, shutdown_token: &CancellationToken) -> Result<()> {
    if tracker.reminders().enable().await == ReminderState::Disabled {
        warn!("Notifications are not permitted, stopping");
        shutdown_token.cancel();
        return Ok(());
    }
    info!("Watching reminders of {} habits", tracker.all().len());
    shutdown_token.cancelled().await;
    Ok(())
}
