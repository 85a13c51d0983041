// One reclaim pass: evaluate pressure, pick a victim, dispatch, cool down

use super::dispatch::TerminationDispatcher;
use super::pressure::{PressureEvaluator, PressureReading};
use super::selector::select_victim;
use super::source::ProcessSource;
use super::tier::TierTable;
use crate::notify::{EventSink, ReapEvent};
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Window after a kill during which further kills are suppressed while the
/// victim is presumed still exiting. Fixed, not per-tier.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Terminal outcome of one reclaim pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Pressure not severe enough to act
    Idle,
    /// A previous victim is still exiting inside the grace period
    Deferred,
    /// Pressure warranted a kill but no candidate was eligible
    NoVictim,
    /// A kill was dispatched; `freed_kb` is the victim's resident size
    Killed { pid: i32, freed_kb: u64 },
}

impl PassOutcome {
    /// Estimated KiB freed by this pass (zero unless a kill was dispatched)
    pub fn freed_kb(self) -> u64 {
        match self {
            Self::Killed { freed_kb, .. } => freed_kb,
            _ => 0,
        }
    }
}

/// Diagnostic counters, no correctness dependency
#[derive(Debug, Clone, Copy, Default)]
pub struct ReclaimCounters {
    pub pass_count: u64,
    pub cumulative_time: Duration,
}

/// Orchestrates reclaim passes over a process source.
///
/// Safe to call from multiple threads: the tier table is an immutable
/// snapshot swapped whole on reconfiguration, and the cooldown state is
/// held under a mutex for the duration of a pass so two concurrent passes
/// cannot both dispatch inside one grace period.
pub struct ReapCoordinator {
    table: RwLock<Arc<TierTable>>,
    evaluator: PressureEvaluator,
    dispatcher: Box<dyn TerminationDispatcher + Send + Sync>,
    sink: Box<dyn EventSink + Send + Sync>,
    /// Do not attempt another kill before this instant
    cooldown_deadline: Mutex<Option<Instant>>,
    pass_count: AtomicU64,
    busy_micros: AtomicU64,
}

impl ReapCoordinator {
    pub fn new(
        table: TierTable,
        evaluator: PressureEvaluator,
        dispatcher: Box<dyn TerminationDispatcher + Send + Sync>,
        sink: Box<dyn EventSink + Send + Sync>,
    ) -> Self {
        Self {
            table: RwLock::new(Arc::new(table)),
            evaluator,
            dispatcher,
            sink,
            cooldown_deadline: Mutex::new(None),
            pass_count: AtomicU64::new(0),
            busy_micros: AtomicU64::new(0),
        }
    }

    /// Run one reclaim pass and return the estimated KiB freed.
    pub fn reclaim(
        &self,
        reading: &PressureReading,
        source: &dyn ProcessSource,
        now: Instant,
    ) -> u64 {
        self.reclaim_pass(reading, source, now).freed_kb()
    }

    /// Run one reclaim pass and return its terminal outcome.
    pub fn reclaim_pass(
        &self,
        reading: &PressureReading,
        source: &dyn ProcessSource,
        now: Instant,
    ) -> PassOutcome {
        let started = Instant::now();
        let outcome = self.run_pass(reading, source, now);

        self.pass_count.fetch_add(1, Ordering::Relaxed);
        self.busy_micros
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);

        outcome
    }

    fn run_pass(
        &self,
        reading: &PressureReading,
        source: &dyn ProcessSource,
        now: Instant,
    ) -> PassOutcome {
        // One consistent table version per pass
        let table = Arc::clone(
            &self
                .table
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );

        // Held for the rest of the pass: the pending-exit check and the
        // deadline update below must observe and produce a consistent
        // cooldown state even under concurrent passes.
        let mut deadline = self
            .cooldown_deadline
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let candidates = source.candidates();

        if let Some(d) = *deadline {
            if now < d && candidates.iter().any(|c| c.exit_requested) {
                log::debug!("kill pending and grace period not elapsed, deferring");
                return PassOutcome::Deferred;
            }
        }

        let Some(eval) = self.evaluator.evaluate(reading, &table) else {
            return PassOutcome::Idle;
        };

        let Some(victim) = select_victim(&candidates, eval.cutoff) else {
            log::debug!("no eligible victim at cutoff {}", eval.cutoff);
            return PassOutcome::NoVictim;
        };

        self.dispatcher.dispatch(victim);
        source.mark_exit_requested(victim.pid);
        *deadline = Some(now + KILL_GRACE_PERIOD);

        self.sink.kill_dispatched(&ReapEvent {
            pid: victim.pid,
            name: victim.name.clone(),
            priority: victim.priority,
            rss_kb: victim.rss_kb,
            cutoff: eval.cutoff,
            min_free_kb: eval.min_free_kb,
            free_kb: reading.free_kb,
            file_kb: reading.file_kb,
        });

        PassOutcome::Killed {
            pid: victim.pid,
            freed_kb: victim.rss_kb.max(0) as u64,
        }
    }

    /// Atomically replace the tier table.
    ///
    /// Mismatched list lengths truncate to the shorter list; priorities
    /// are validated against the allowed range. Passes already running
    /// keep their snapshot; subsequent passes see the new table.
    pub fn set_tier_table(&self, priorities: &[i16], thresholds_kb: &[u64]) -> Result<()> {
        let table = TierTable::from_lists(priorities, thresholds_kb)?;
        log::info!("tier table replaced, {} effective tiers", table.len());
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
        Ok(())
    }

    pub fn get_counters(&self) -> ReclaimCounters {
        ReclaimCounters {
            pass_count: self.pass_count.load(Ordering::Relaxed),
            cumulative_time: Duration::from_micros(self.busy_micros.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaper::source::{FixtureSource, ProcessCandidate};
    use std::sync::Mutex as StdMutex;

    struct RecordingDispatcher {
        dispatched: StdMutex<Vec<i32>>,
    }

    impl RecordingDispatcher {
        fn new() -> Self {
            Self {
                dispatched: StdMutex::new(Vec::new()),
            }
        }
    }

    impl TerminationDispatcher for RecordingDispatcher {
        fn dispatch(&self, victim: &ProcessCandidate) {
            self.dispatched.lock().unwrap().push(victim.pid);
        }
    }

    fn candidate(pid: i32, priority: i16, rss_kb: i64) -> ProcessCandidate {
        ProcessCandidate {
            pid,
            name: format!("proc-{pid}"),
            priority,
            rss_kb,
            exit_requested: false,
            kernel_thread: false,
        }
    }

    fn coordinator() -> (ReapCoordinator, Arc<RecordingEvents>) {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = ReapCoordinator::new(
            TierTable::from_lists(&[0, 8], &[1024, 4096]).unwrap(),
            PressureEvaluator::default(),
            Box::new(RecordingDispatcher::new()),
            Box::new(Arc::clone(&events)),
        );
        (coordinator, events)
    }

    #[derive(Default)]
    struct RecordingEvents {
        events: StdMutex<Vec<ReapEvent>>,
    }

    impl EventSink for Arc<RecordingEvents> {
        fn kill_dispatched(&self, event: &ReapEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn reading(free_kb: u64) -> PressureReading {
        PressureReading {
            free_kb,
            ..PressureReading::default()
        }
    }

    #[test]
    fn test_idle_when_no_pressure() {
        let (coordinator, _) = coordinator();
        let source = FixtureSource::new(vec![candidate(10, 12, 500)]);

        // Scenario C: free above every threshold
        let outcome = coordinator.reclaim_pass(&reading(5000), &source, Instant::now());
        assert_eq!(outcome, PassOutcome::Idle);
        assert_eq!(outcome.freed_kb(), 0);
        assert!(!source.candidates()[0].exit_requested);
    }

    #[test]
    fn test_kill_marks_exit_and_reports_rss() {
        let (coordinator, events) = coordinator();
        let source = FixtureSource::new(vec![candidate(10, 12, 500), candidate(11, 3, 900)]);

        let freed = coordinator.reclaim(&reading(900), &source, Instant::now());
        assert_eq!(freed, 500);

        let snapshot = source.candidates();
        assert!(snapshot.iter().any(|c| c.pid == 10 && c.exit_requested));
        assert!(snapshot.iter().any(|c| c.pid == 11 && !c.exit_requested));

        let events = events.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pid, 10);
        assert_eq!(events[0].cutoff, 0);
        assert_eq!(events[0].min_free_kb, 1024);
    }

    #[test]
    fn test_no_victim_outcome() {
        let (coordinator, _) = coordinator();
        // Only candidate is below the cutoff at moderate pressure
        let source = FixtureSource::new(vec![candidate(10, 3, 500)]);

        let outcome = coordinator.reclaim_pass(&reading(2000), &source, Instant::now());
        assert_eq!(outcome, PassOutcome::NoVictim);
    }

    #[test]
    fn test_scenario_e_deferred_inside_grace_period() {
        let (coordinator, _) = coordinator();
        let source = FixtureSource::new(vec![candidate(10, 12, 500), candidate(11, 12, 400)]);

        let t0 = Instant::now();
        let outcome = coordinator.reclaim_pass(&reading(900), &source, t0);
        assert!(matches!(outcome, PassOutcome::Killed { pid: 10, .. }));

        // Victim still listed as exiting, grace period not elapsed:
        // deferred regardless of pressure.
        let outcome = coordinator.reclaim_pass(&reading(100), &source, t0 + Duration::from_millis(200));
        assert_eq!(outcome, PassOutcome::Deferred);
        assert_eq!(outcome.freed_kb(), 0);
    }

    #[test]
    fn test_second_kill_after_grace_elapsed() {
        let (coordinator, _) = coordinator();
        let source = FixtureSource::new(vec![candidate(10, 12, 500), candidate(11, 12, 400)]);

        let t0 = Instant::now();
        coordinator.reclaim_pass(&reading(900), &source, t0);

        // First victim finally exits right as the grace period lapses;
        // the next pass is free to pick a new one.
        source.set_processes(vec![candidate(11, 12, 400)]);
        let outcome =
            coordinator.reclaim_pass(&reading(900), &source, t0 + KILL_GRACE_PERIOD + Duration::from_millis(1));
        assert!(matches!(outcome, PassOutcome::Killed { pid: 11, .. }));
    }

    #[test]
    fn test_cooldown_without_pending_exit_does_not_defer() {
        let (coordinator, _) = coordinator();
        let source = FixtureSource::new(vec![candidate(10, 12, 500), candidate(11, 12, 400)]);

        let t0 = Instant::now();
        coordinator.reclaim_pass(&reading(900), &source, t0);

        // Victim fully gone before the grace period ends: nothing is
        // marked exiting any more, so the pass proceeds.
        source.set_processes(vec![candidate(11, 12, 400)]);
        let outcome =
            coordinator.reclaim_pass(&reading(900), &source, t0 + Duration::from_millis(100));
        assert!(matches!(outcome, PassOutcome::Killed { pid: 11, .. }));
    }

    #[test]
    fn test_set_tier_table_swaps_atomically() {
        let (coordinator, _) = coordinator();
        let source = FixtureSource::new(vec![candidate(10, 5, 500)]);

        // Under the initial table, free=2000 requires priority >= 8
        let outcome = coordinator.reclaim_pass(&reading(2000), &source, Instant::now());
        assert_eq!(outcome, PassOutcome::NoVictim);

        // Relax the second tier down to priority 4
        coordinator.set_tier_table(&[0, 4], &[1024, 4096]).unwrap();
        let outcome = coordinator.reclaim_pass(&reading(2000), &source, Instant::now());
        assert!(matches!(outcome, PassOutcome::Killed { pid: 10, .. }));
    }

    #[test]
    fn test_set_tier_table_rejects_bad_priority() {
        let (coordinator, _) = coordinator();
        assert!(coordinator.set_tier_table(&[2000], &[1024]).is_err());
    }

    #[test]
    fn test_counters_increment_on_every_outcome() {
        let (coordinator, _) = coordinator();
        let source = FixtureSource::new(vec![candidate(10, 12, 500)]);

        assert_eq!(coordinator.get_counters().pass_count, 0);
        coordinator.reclaim_pass(&reading(5000), &source, Instant::now()); // Idle
        coordinator.reclaim_pass(&reading(900), &source, Instant::now()); // Killed
        coordinator.reclaim_pass(&reading(900), &source, Instant::now()); // Deferred
        assert_eq!(coordinator.get_counters().pass_count, 3);
    }

    #[test]
    fn test_concurrent_passes_single_kill_per_grace_period() {
        use std::thread;

        let (coordinator, _) = coordinator();
        let coordinator = Arc::new(coordinator);
        let source = Arc::new(FixtureSource::new(vec![
            candidate(10, 12, 500),
            candidate(11, 12, 400),
        ]));

        let now = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            let source = Arc::clone(&source);
            handles.push(thread::spawn(move || {
                coordinator.reclaim_pass(&reading(900), source.as_ref(), now)
            }));
        }

        let kills = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, PassOutcome::Killed { .. }))
            .count();
        assert_eq!(kills, 1);
    }
}
