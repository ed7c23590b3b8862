use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::utils::clock::Clock;

use super::{
    due_reminders,
    notifier::{Notifier, Permission},
    reminder_notification,
    source::SnapshotSource,
    ReminderControl, ReminderState,
};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Runs reminder checks in the background once notifications are permitted.
pub struct ReminderMonitor {
    checks: Arc<ReminderChecks>,
    interval: Duration,
    shutdown: CancellationToken,
    running: Mutex<Option<RunningChecks>>,
}

struct ReminderChecks {
    notifier: Arc<dyn Notifier>,
    source: Box<dyn SnapshotSource>,
    clock: Box<dyn Clock>,
}

struct RunningChecks {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReminderMonitor {
    /// The monitor starts disabled. Cancelling `shutdown` stops the checks as well.
    pub fn new(
        notifier: Arc<dyn Notifier>,
        source: Box<dyn SnapshotSource>,
        clock: Box<dyn Clock>,
        interval: Duration,
        shutdown: &CancellationToken,
    ) -> Self {
        Self {
            checks: Arc::new(ReminderChecks {
                notifier,
                source,
                clock,
            }),
            interval,
            shutdown: shutdown.clone(),
            running: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> ReminderState {
        if self.is_enabled().await {
            ReminderState::Enabled
        } else {
            ReminderState::Disabled
        }
    }

    /// Runs a single check right away. Returns amount of notifications sent.
    pub async fn check_now(&self) -> usize {
        self.checks.check().await
    }

    async fn permission(&self) -> Permission {
        match self.checks.notifier.permission() {
            Permission::Granted => Permission::Granted,
            Permission::Denied => match self.checks.notifier.request_permission().await {
                Ok(v) => v,
                Err(e) => {
                    warn!("Failed to request notification permission {e:?}");
                    Permission::Denied
                }
            },
        }
    }
}

impl ReminderChecks {
    async fn check(&self) -> usize {
        let habits = self.source.latest().await;
        let now = self.clock.local_now();
        let mut sent = 0;
        for habit in due_reminders(&habits, now) {
            debug!("Reminding about {}", habit.id);
            match self.notifier.notify(reminder_notification(habit)) {
                Ok(_) => sent += 1,
                Err(e) => error!("Failed to send reminder for {}: {e:?}", habit.id),
            }
        }
        sent
    }

    /// Executes the check loop. The first check happens one interval after the start.
    async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut check_point = self.clock.instant();
        loop {
            check_point += interval;

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Reminder checks cancelled");
                    return
                }
                _ = self.clock.sleep_until(check_point) => ()
            }

            let sent = self
                .check()
                .instrument(info_span!("Checking reminders"))
                .await;
            if sent > 0 {
                info!("Sent {sent} reminders");
            }
        }
    }
}

#[async_trait]
impl ReminderControl for ReminderMonitor {
    async fn is_enabled(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|v| !v.handle.is_finished())
    }

    async fn enable(&self) -> ReminderState {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|v| !v.handle.is_finished()) {
            return ReminderState::Enabled;
        }

        if self.permission().await != Permission::Granted {
            info!("Notifications aren't permitted, reminders stay disabled");
            return ReminderState::Disabled;
        }

        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(self.checks.clone().run(self.interval, cancel.clone()));
        *running = Some(RunningChecks { cancel, handle });
        info!("Reminders enabled, checking every {:?}", self.interval);
        ReminderState::Enabled
    }

    async fn disable(&self) {
        let Some(RunningChecks { cancel, handle }) = self.running.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if let Err(e) = handle.await {
            error!("Reminder checks ended abnormally {e:?}");
        }
        info!("Reminders disabled");
    }
}
