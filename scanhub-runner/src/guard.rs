//! Scoped process-group termination

use std::time::Duration;

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::debug;

/// Owns a child's process group and tears it down when dropped.
///
/// On drop the group receives SIGTERM; anything still alive after the grace
/// period receives SIGKILL. This runs on every exit path (normal completion,
/// timeout, cancellation, panic unwinding), so scanner grandchildren are never
/// left behind.
#[derive(Debug)]
pub struct ProcessGroupGuard {
    pgid: Option<Pid>,
    grace: Duration,
}

impl ProcessGroupGuard {
    /// `pid` is the child spawned as leader of its own group.
    pub fn new(pid: Option<u32>, grace: Duration) -> Self {
        Self {
            pgid: pid.and_then(|p| i32::try_from(p).ok()).map(Pid::from_raw),
            grace,
        }
    }

    pub fn pgid(&self) -> Option<i32> {
        self.pgid.map(Pid::as_raw)
    }

    /// Signal the group now. Idempotent.
    pub fn terminate(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        if !group_alive(pgid) {
            return;
        }
        debug!(pgid = pgid.as_raw(), "Terminating process group");
        let _ = killpg(pgid, Signal::SIGTERM);
        schedule_kill(pgid, self.grace);
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn group_alive(pgid: Pid) -> bool {
    killpg(pgid, None).is_ok()
}

fn force_kill(pgid: Pid) {
    if group_alive(pgid) {
        debug!(pgid = pgid.as_raw(), "Process group survived SIGTERM, sending SIGKILL");
        let _ = killpg(pgid, Signal::SIGKILL);
    }
}

fn schedule_kill(pgid: Pid, grace: Duration) {
    if grace.is_zero() {
        force_kill(pgid);
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(grace).await;
                force_kill(pgid);
            });
        }
        Err(_) => {
            std::thread::spawn(move || {
                std::thread::sleep(grace);
                force_kill(pgid);
            });
        }
    }
}
