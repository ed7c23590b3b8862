use std::{
    env,
    ffi::OsString,
    path::{self, Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sysinfo::{get_current_pid, Signal, System};
use tracing::{error, info, warn};

use crate::reminder::{
    notifier::{Notifier, Permission},
    ReminderControl, ReminderState,
};

use crate::utils::dir::create_application_default_path;

use super::daemon_path::to_daemon_path;

fn daemon_executable() -> Result<PathBuf> {
    Ok(to_daemon_path(env::current_exe()?))
}

fn is_server(process: &sysinfo::Process, name: &Path) -> bool {
    process
        .exe()
        .filter(|v| v.exists())
        .filter(|v| name == *v)
        .is_some()
}

/// Directory passed to a daemon through `--dir`.
fn served_dir(cmd: &[OsString]) -> Option<PathBuf> {
    let mut args = cmd.iter().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--dir" {
            return args.next().map(PathBuf::from);
        }
        if let Some(dir) = arg.to_str().and_then(|v| v.strip_prefix("--dir=")) {
            return Some(PathBuf::from(dir));
        }
    }
    None
}

/// Whether `process` is a daemon serving the absolute `dir`.
fn is_server_for(process: &sysinfo::Process, name: &Path, dir: &Path) -> bool {
    is_server(process, name)
        && served_dir(process.cmd())
            .or_else(|| create_application_default_path().ok())
            .is_some_and(|v| v == dir)
}

pub fn is_server_running(name: &Path, dir: &Path) -> bool {
    let system = System::new_all();
    system
        .processes()
        .values()
        .any(|v| is_server_for(v, name, dir))
}

/// Stops daemons serving `dir`. Daemons of other directories keep running.
pub fn kill_previous_servers(name: &Path, dir: &Path) -> Result<()> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if is_server_for(process, name, dir) {
            info!("Stopping daemon {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
        }
    }
    Ok(())
}

/// Shuts down previous daemon and starts a new one watching `dir`.
pub fn restart_server(dir: &Path) -> Result<()> {
    let daemon = daemon_executable()?;
    // The daemon changes its working directory, so relative paths wouldn't survive.
    let dir = path::absolute(dir)?;
    kill_previous_servers(&daemon, &dir)?;
    let mut command = std::process::Command::new(&daemon);
    command.arg("--dir").arg(&dir);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    #[cfg(unix)]
    {
        // The daemon detaches by itself, so this only waits for the intermediate process.
        let status = command.status()?;
        if !status.success() {
            return Err(anyhow!("Daemon failed to start: {status}"));
        }
    }
    #[cfg(not(unix))]
    {
        command.arg("--force");
        #[allow(clippy::zombie_processes)]
        let _ = command.spawn()?;
    }

    info!("Started daemon {daemon:?}");
    Ok(())
}

/// Reminders provided by the background daemon. Enabled means that the daemon is running.
pub struct DaemonReminders {
    dir: PathBuf,
    notifier: Box<dyn Notifier>,
}

impl DaemonReminders {
    pub fn new(dir: PathBuf, notifier: Box<dyn Notifier>) -> Self {
        Self { dir, notifier }
    }

    /// Daemon executable and the absolute directory it serves.
    fn locate(&self) -> Result<(PathBuf, PathBuf)> {
        Ok((daemon_executable()?, path::absolute(&self.dir)?))
    }

    async fn permission(&self) -> Permission {
        match self.notifier.permission() {
            Permission::Granted => Permission::Granted,
            Permission::Denied => self
                .notifier
                .request_permission()
                .await
                .inspect_err(|e| warn!("Permission request failed {e:?}"))
                .unwrap_or(Permission::Denied),
        }
    }
}

#[async_trait]
impl ReminderControl for DaemonReminders {
    async fn is_enabled(&self) -> bool {
        match self.locate() {
            Ok((daemon, dir)) => is_server_running(&daemon, &dir),
            Err(e) => {
                warn!("Can't locate daemon {e:?}");
                false
            }
        }
    }

    async fn enable(&self) -> ReminderState {
        if self.permission().await != Permission::Granted {
            info!("Notifications aren't permitted, daemon wasn't started");
            return ReminderState::Disabled;
        }
        match restart_server(&self.dir) {
            Ok(_) => ReminderState::Enabled,
            Err(e) => {
                error!("Failed to start daemon {e:?}");
                ReminderState::Disabled
            }
        }
    }

    async fn disable(&self) {
        let result = self
            .locate()
            .and_then(|(daemon, dir)| kill_previous_servers(&daemon, &dir));
        if let Err(e) = result {
            error!("Failed to stop daemon {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsString, path::PathBuf};

    use super::served_dir;

    fn cmd(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_served_dir_is_read_from_arguments() {
        assert_eq!(
            served_dir(&cmd(&["habitual-daemon", "--dir", "/home/a/habits"])),
            Some(PathBuf::from("/home/a/habits"))
        );
        assert_eq!(
            served_dir(&cmd(&["habitual-daemon", "--force", "--dir=/tmp/other"])),
            Some(PathBuf::from("/tmp/other"))
        );
    }

    #[test]
    fn test_daemon_without_dir_serves_nothing_explicit() {
        assert_eq!(served_dir(&cmd(&["habitual-daemon", "--force"])), None);
        assert_eq!(served_dir(&cmd(&["habitual-daemon", "--dir"])), None);
        // The program name is never taken for an argument.
        assert_eq!(served_dir(&cmd(&["--dir"])), None);
    }
}
