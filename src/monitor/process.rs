// Live process enumeration over /proc

use crate::reaper::{ProcessCandidate, ProcessSource};
use anyhow::Result;
use procfs::process::Process;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::sync::{Mutex, PoisonError};

/// Process source backed by the live /proc table.
///
/// Enumeration tolerates processes exiting mid-scan: any pid that cannot
/// be read any more is simply left out of the snapshot. Kill requests are
/// remembered in an internal set so later snapshots report the victim as
/// exit-requested until it actually disappears.
pub struct ProcSource {
    /// Processes matching any of these patterns are never candidates
    protected: Vec<Regex>,
    own_pid: i32,
    exit_requested: Mutex<HashSet<i32>>,
}

impl ProcSource {
    pub fn new(protected: Vec<Regex>) -> Self {
        Self {
            protected,
            own_pid: std::process::id() as i32,
            exit_requested: Mutex::new(HashSet::new()),
        }
    }

    fn is_protected(&self, name: &str, cmdline: &str) -> bool {
        self.protected
            .iter()
            .any(|pattern| pattern.is_match(name) || pattern.is_match(cmdline))
    }

    /// Read one candidate; `None` when the process vanished or is excluded
    fn read_candidate(&self, pid: i32, exiting: &HashSet<i32>) -> Option<ProcessCandidate> {
        // The reaper itself and init are never candidates
        if pid == self.own_pid || pid == 1 {
            return None;
        }

        let (candidate, cmdline) = Self::read_process(pid, exiting.contains(&pid)).ok()?;

        if self.is_protected(&candidate.name, &cmdline) {
            log::trace!("skipping protected process {}", candidate);
            return None;
        }

        Some(candidate)
    }

    fn read_process(pid: i32, exit_requested: bool) -> Result<(ProcessCandidate, String)> {
        let process = Process::new(pid)?;
        let stat = process.stat()?;

        // RSS in KiB (stat.rss is in pages)
        let page_size = procfs::page_size();
        let rss_kb = (stat.rss * page_size / 1024) as i64;

        // Kernel threads have no command line
        let cmdline = process.cmdline().unwrap_or_default().join(" ");
        let kernel_thread = cmdline.is_empty();

        let priority = read_oom_score_adj(pid)?;

        let candidate = ProcessCandidate {
            pid,
            name: stat.comm,
            priority,
            rss_kb,
            exit_requested,
            kernel_thread,
        };

        Ok((candidate, cmdline))
    }
}

/// Read the kill priority (oom_score_adj) for a pid
fn read_oom_score_adj(pid: i32) -> Result<i16> {
    let raw = fs::read_to_string(format!("/proc/{pid}/oom_score_adj"))?;
    Ok(raw.trim().parse()?)
}

impl ProcessSource for ProcSource {
    fn candidates(&self) -> Vec<ProcessCandidate> {
        let mut exiting = self
            .exit_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();

        if let Ok(entries) = fs::read_dir("/proc") {
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let name = file_name.to_string_lossy();

                if let Ok(pid) = name.parse::<i32>() {
                    seen.insert(pid);
                    if let Some(candidate) = self.read_candidate(pid, &exiting) {
                        candidates.push(candidate);
                    }
                }
            }
        }

        // Forget kill marks for pids that finished exiting
        exiting.retain(|pid| seen.contains(pid));

        candidates
    }

    fn mark_exit_requested(&self, pid: i32) {
        self.exit_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_excluded() {
        let source = ProcSource::new(Vec::new());
        let own_pid = std::process::id() as i32;
        assert!(source
            .candidates()
            .iter()
            .all(|c| c.pid != own_pid && c.pid != 1));
    }

    #[test]
    fn test_protected_pattern_excludes() {
        let source = ProcSource::new(vec![Regex::new(".*").unwrap()]);
        assert!(source.candidates().is_empty());
    }

    #[test]
    fn test_mark_exit_requested_visible_while_alive() {
        let source = ProcSource::new(Vec::new());

        // Any long-lived process other than ourselves will do; fall back
        // to skipping when the scan comes back empty (restricted /proc).
        let Some(target) = source.candidates().first().map(|c| c.pid) else {
            return;
        };

        source.mark_exit_requested(target);
        let snapshot = source.candidates();
        if let Some(candidate) = snapshot.iter().find(|c| c.pid == target) {
            assert!(candidate.exit_requested);
        }
    }
}
