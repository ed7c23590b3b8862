//! Contains the ways of showing notifications on different platforms.
//! [default_notifier] picks the one that works in the current environment.

use std::{ffi::OsString, path::PathBuf, process::Stdio, sync::OnceLock};

use ansi_term::{Colour, Style};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Glyph of the habit.
    pub icon: String,
}

/// Intended to serve as a contract every notification platform must implement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Permission the platform currently grants, without asking the user.
    fn permission(&self) -> Permission;

    async fn request_permission(&self) -> Result<Permission>;

    /// Shows a notification without waiting for it to be displayed. Should only be used once
    /// permission is granted.
    fn notify(&self, notification: Notification) -> Result<()>;
}

const NOTIFY_SEND: &str = "notify-send";

/// Desktop notifications through `notify-send`. Having the program available is what counts as
/// a granted permission.
pub struct DesktopNotifier {
    /// Directories to search instead of `PATH`.
    search_path: Option<OsString>,
    program: OnceLock<PathBuf>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::searching(None)
    }

    fn searching(search_path: Option<OsString>) -> Self {
        let program = OnceLock::new();
        if let Some(found) = find_program(search_path.as_ref()) {
            let _ = program.set(found);
        }
        Self {
            search_path,
            program,
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn permission(&self) -> Permission {
        match self.program.get() {
            Some(_) => Permission::Granted,
            None => Permission::Denied,
        }
    }

    async fn request_permission(&self) -> Result<Permission> {
        if self.program.get().is_some() {
            return Ok(Permission::Granted);
        }
        let search_path = self.search_path.clone();
        let found = tokio::task::spawn_blocking(move || find_program(search_path.as_ref())).await?;
        Ok(match found {
            Some(program) => {
                debug!("Found {program:?}");
                let _ = self.program.set(program);
                Permission::Granted
            }
            None => Permission::Denied,
        })
    }

    fn notify(&self, notification: Notification) -> Result<()> {
        let Some(program) = self.program.get() else {
            anyhow::bail!("{NOTIFY_SEND} is not available");
        };
        debug!("Sending {notification:?} through {program:?}");
        // The child is dropped right away. Tokio reaps it in the background.
        let _ = tokio::process::Command::new(program)
            .arg("--app-name=habitual")
            .arg(format!("{} {}", notification.icon, notification.title))
            .arg(notification.body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

/// Prints notifications into the console. Always permitted.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Result<Permission> {
        Ok(Permission::Granted)
    }

    fn notify(&self, notification: Notification) -> Result<()> {
        info!("Notification {notification:?}");
        println!(
            "{} {}: {}",
            notification.icon,
            Style::new().bold().fg(Colour::Yellow).paint(&notification.title),
            notification.body
        );
        Ok(())
    }
}

/// Desktop notifications where the platform supports them, console otherwise.
pub fn default_notifier() -> Box<dyn Notifier> {
    cfg_if::cfg_if! {
        if #[cfg(all(unix, not(target_os = "macos")))] {
            desktop_or_console()
        } else {
            Box::new(ConsoleNotifier)
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn desktop_or_console() -> Box<dyn Notifier> {
    let desktop = DesktopNotifier::new();
    if desktop.permission() == Permission::Granted {
        info!("Using desktop notifications");
        Box::new(desktop)
    } else {
        info!("{NOTIFY_SEND} wasn't found, using console notifications");
        Box::new(ConsoleNotifier)
    }
}

fn find_program(search_path: Option<&OsString>) -> Option<PathBuf> {
    match search_path {
        Some(paths) => {
            let cwd = std::env::current_dir().ok()?;
            which::which_in(NOTIFY_SEND, Some(paths), cwd).ok()
        }
        None => which::which(NOTIFY_SEND).ok(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{ConsoleNotifier, DesktopNotifier, Notification, Notifier, Permission};

    fn reminder() -> Notification {
        Notification {
            title: "Habit Reminder".into(),
            body: "Time to complete: Read".into(),
            icon: "📚".into(),
        }
    }

    #[tokio::test]
    async fn test_console_is_always_permitted() -> Result<()> {
        let notifier = ConsoleNotifier;
        assert_eq!(notifier.permission(), Permission::Granted);
        assert_eq!(notifier.request_permission().await?, Permission::Granted);
        notifier.notify(reminder())?;
        Ok(())
    }

    #[tokio::test]
    async fn test_desktop_without_program_is_denied() -> Result<()> {
        let dir = tempdir()?;
        let notifier = DesktopNotifier::searching(Some(dir.path().into()));
        assert_eq!(notifier.permission(), Permission::Denied);
        assert_eq!(notifier.request_permission().await?, Permission::Denied);
        assert!(notifier.notify(reminder()).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_granted_request_makes_desktop_notify_work() -> Result<()> {
        let dir = tempdir()?;
        let notifier = DesktopNotifier::searching(Some(dir.path().into()));
        assert_eq!(notifier.permission(), Permission::Denied);

        // Installed after the notifier was created.
        std::os::unix::fs::symlink(which::which("true")?, dir.path().join("notify-send"))?;

        assert_eq!(notifier.request_permission().await?, Permission::Granted);
        assert_eq!(notifier.permission(), Permission::Granted);
        notifier.notify(reminder())?;
        Ok(())
    }
}
