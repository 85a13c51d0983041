// Process-set abstraction consumed by the victim scan

use std::sync::Mutex;

/// One live process as seen during a single reclaim pass.
///
/// A transient view: the underlying process may exit at any time, and no
/// reference is retained past the pass that observed it.
#[derive(Debug, Clone)]
pub struct ProcessCandidate {
    pub pid: i32,
    pub name: String,
    /// Kill priority; higher = more expendable (oom_score_adj semantics)
    pub priority: i16,
    /// Resident set size in KiB; non-positive means nothing to reclaim
    pub rss_kb: i64,
    /// Set once a termination has been requested for this process
    pub exit_requested: bool,
    /// Kernel threads and other host-internal helpers are never victims
    pub kernel_thread: bool,
}

impl std::fmt::Display for ProcessCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' (pid {}), priority {}, rss {} KiB",
            self.name, self.pid, self.priority, self.rss_kb
        )
    }
}

/// Source of the live process set.
///
/// Implementations must tolerate processes appearing and disappearing
/// between (and during) enumerations; a vanished process is simply absent
/// from the next snapshot, never an error. `mark_exit_requested` is the
/// feedback channel through which a dispatched kill becomes visible as
/// `exit_requested` on subsequent snapshots.
pub trait ProcessSource {
    /// Snapshot the current candidate set
    fn candidates(&self) -> Vec<ProcessCandidate>;

    /// Record that termination has been requested for `pid`
    fn mark_exit_requested(&self, pid: i32);
}

/// In-memory process source for tests and simulations.
pub struct FixtureSource {
    processes: Mutex<Vec<ProcessCandidate>>,
}

impl FixtureSource {
    pub fn new(processes: Vec<ProcessCandidate>) -> Self {
        Self {
            processes: Mutex::new(processes),
        }
    }

    /// Replace the fixture's process set
    pub fn set_processes(&self, processes: Vec<ProcessCandidate>) {
        *self.processes.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = processes;
    }
}

impl ProcessSource for FixtureSource {
    fn candidates(&self) -> Vec<ProcessCandidate> {
        self.processes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn mark_exit_requested(&self, pid: i32) {
        let mut processes = self
            .processes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for p in processes.iter_mut() {
            if p.pid == pid {
                p.exit_requested = true;
            }
        }
    }
}
