// Fire-and-forget termination dispatch

use super::source::ProcessCandidate;
use nix::sys::signal::{self, killpg, Signal};
use nix::unistd::{getpgid, Pid};

/// One-way termination request sink.
///
/// A dispatch is a command, not a call: no acknowledgment, no retry. The
/// host environment confirms the actual exit through the candidate's
/// `exit_requested` flag on later passes.
pub trait TerminationDispatcher {
    fn dispatch(&self, victim: &ProcessCandidate);
}

/// Dispatcher that delivers SIGKILL, optionally to the whole process group.
pub struct SignalDispatcher {
    kill_group: bool,
}

impl SignalDispatcher {
    pub fn new(kill_group: bool) -> Self {
        Self { kill_group }
    }
}

impl TerminationDispatcher for SignalDispatcher {
    fn dispatch(&self, victim: &ProcessCandidate) {
        let pid = Pid::from_raw(victim.pid);

        let result = if self.kill_group {
            match getpgid(Some(pid)) {
                Ok(pgid) => {
                    log::debug!("killing process group {} (leader pid {})", pgid, victim.pid);
                    killpg(pgid, Signal::SIGKILL)
                }
                Err(e) => {
                    log::warn!(
                        "failed to get process group for pid {}: {}, killing single process",
                        victim.pid,
                        e
                    );
                    signal::kill(pid, Signal::SIGKILL)
                }
            }
        } else {
            signal::kill(pid, Signal::SIGKILL)
        };

        match result {
            Ok(()) => {}
            // Raced with a normal exit; the next snapshot simply won't
            // contain this pid.
            Err(nix::errno::Errno::ESRCH) => {
                log::debug!("victim pid {} already gone", victim.pid);
            }
            Err(e) => {
                log::warn!("failed to signal pid {}: {}", victim.pid, e);
            }
        }
    }
}

/// Dispatcher that only logs, for dry-run mode.
pub struct NoopDispatcher;

impl TerminationDispatcher for NoopDispatcher {
    fn dispatch(&self, victim: &ProcessCandidate) {
        log::info!("DRY RUN: would kill {victim}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(pid: i32) -> ProcessCandidate {
        ProcessCandidate {
            pid,
            name: "victim".to_string(),
            priority: 10,
            rss_kb: 100,
            exit_requested: false,
            kernel_thread: false,
        }
    }

    #[test]
    fn test_dispatch_nonexistent_pid_does_not_panic() {
        // Pid 999999 should not exist; ESRCH is absorbed
        SignalDispatcher::new(false).dispatch(&candidate(999_999));
    }

    #[test]
    fn test_noop_dispatcher() {
        NoopDispatcher.dispatch(&candidate(1));
    }
}
