// Main daemon service implementation

use crate::config::{CachePolicyArg, Config};
use crate::monitor::{MemInfo, ProcSource};
use crate::notify::hooks::HookValidator;
use crate::notify::NotificationManager;
use crate::reaper::{
    InactiveCache, NoopDispatcher, PassOutcome, PressureEvaluator, ReapCoordinator,
    ReclaimableCache, SignalDispatcher, TerminationDispatcher,
};
use anyhow::{anyhow, Context, Result};
use nix::libc::{setpriority, PRIO_PROCESS};
use std::fs;
use std::io::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Set daemon priority using the configured value
fn set_daemon_priority(priority: i32) {
    // Set niceness to the specified value
    let result = unsafe { setpriority(PRIO_PROCESS, 0, priority) };

    if result != 0 {
        let err = Error::last_os_error();
        log::warn!(
            "Failed to set niceness to {}: {}. May need root privileges.",
            priority,
            err
        );
    } else {
        log::info!("Set daemon niceness to {} (priority)", priority);
    }

    // Protect the reaper itself from the kernel OOM killer
    match fs::write("/proc/self/oom_score_adj", "-1000") {
        Ok(()) => log::info!("Set oom_score_adj to -1000 (protected from OOM killer)"),
        Err(e) => log::warn!(
            "Failed to set oom_score_adj: {}. Daemon may be killed under extreme memory pressure.",
            e
        ),
    }
}

/// Daemon service that polls memory pressure and runs reclaim passes
pub struct DaemonService {
    config: Config,
    coordinator: ReapCoordinator,
    source: ProcSource,
    last_report: Instant,
    running: Arc<AtomicBool>,
}

impl DaemonService {
    /// Create a new daemon service
    pub fn new(config: Config) -> Result<Self> {
        HookValidator::validate_hooks(config.post_kill_script.as_deref())?;

        let table = config.tier_table().context("Invalid tier table")?;

        let evaluator = match config.cache_policy {
            CachePolicyArg::ReclaimableCache => {
                PressureEvaluator::new(Box::new(ReclaimableCache))
            }
            CachePolicyArg::InactiveCache => PressureEvaluator::new(Box::new(InactiveCache)),
        };

        let dispatcher: Box<dyn TerminationDispatcher + Send + Sync> = if config.dry_run {
            Box::new(NoopDispatcher)
        } else {
            Box::new(SignalDispatcher::new(config.kill_group))
        };

        let sink = Box::new(NotificationManager::new(config.post_kill_script.clone()));

        let coordinator = ReapCoordinator::new(table, evaluator, dispatcher, sink);
        let source = ProcSource::new(config.protect.clone());

        Ok(Self {
            config,
            coordinator,
            source,
            last_report: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get the running flag for signal handling
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Main run loop
    pub fn run(&mut self) -> Result<()> {
        if let Some(priority) = self.config.priority {
            set_daemon_priority(priority);
        }

        self.print_startup_info()?;

        self.running.store(true, Ordering::SeqCst);
        self.last_report = Instant::now();

        self.setup_signal_handlers()?;

        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.run_reclaim_pass() {
                log::error!("Error in main loop: {}", e);
            }

            // Periodic status report
            if self.last_report.elapsed() >= self.config.report_interval {
                self.report_status();
                self.last_report = Instant::now();
            }

            std::thread::sleep(self.config.check_interval);
        }

        log::info!("lowmem-reaper daemon shutting down gracefully");
        Ok(())
    }

    /// Setup signal handlers for graceful shutdown
    fn setup_signal_handlers(&self) -> Result<()> {
        let running = Arc::clone(&self.running);

        // Handle SIGTERM and SIGINT
        ctrlc::set_handler(move || {
            log::info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })
        .map_err(|e| anyhow!("Failed to set signal handler: {}", e))?;

        Ok(())
    }

    /// Print startup information
    fn print_startup_info(&self) -> Result<()> {
        let meminfo = MemInfo::read()?;

        log::info!(
            "=== lowmem-reaper v{} starting ===",
            env!("CARGO_PKG_VERSION")
        );
        log::info!("{}", meminfo);

        log::info!("Tiers (priority -> minfree):");
        let table = self.config.tier_table().context("Invalid tier table")?;
        for entry in table.entries() {
            log::info!(
                "  kill priority >= {:4} when effective free < {}",
                entry.min_priority,
                MemInfo::format_size(entry.min_free_kb)
            );
        }

        log::info!(
            "Cache policy: {:?}, reserved: {} KiB",
            self.config.cache_policy,
            self.config.reserved_kb
        );

        if !self.config.protect.is_empty() {
            log::info!("Protected processes: {} pattern(s)", self.config.protect.len());
        }

        if self.config.dry_run {
            log::warn!("DRY RUN MODE - will not actually kill processes");
        }

        if self.config.kill_group {
            log::info!("Kill process groups enabled");
        }

        log::info!(
            "Check interval: {}s, report interval: {}s",
            self.config.check_interval.as_secs(),
            self.config.report_interval.as_secs()
        );
        log::info!("==========================================");

        Ok(())
    }

    /// Run one reclaim pass against current readings
    fn run_reclaim_pass(&mut self) -> Result<()> {
        let meminfo = MemInfo::read().context("Failed to read memory info")?;
        let reading = meminfo.pressure_reading(self.config.reserved_kb);

        log::debug!("Current memory status: {}", meminfo);

        let outcome = self
            .coordinator
            .reclaim_pass(&reading, &self.source, Instant::now());

        match outcome {
            PassOutcome::Idle => {}
            PassOutcome::Deferred => {
                log::debug!("Previous victim still exiting, pass deferred");
            }
            PassOutcome::NoVictim => {
                log::warn!("Memory pressure but no eligible victim found");
            }
            PassOutcome::Killed { pid, freed_kb } => {
                log::info!(
                    "Dispatched kill for pid {}, expecting to free {}",
                    pid,
                    MemInfo::format_size(freed_kb)
                );
            }
        }

        Ok(())
    }

    /// Report current status
    fn report_status(&self) {
        match MemInfo::read() {
            Ok(meminfo) => log::info!("Status Report: {}", meminfo),
            Err(e) => log::warn!("Status Report: failed to read memory info: {}", e),
        }

        let counters = self.coordinator.get_counters();
        log::info!(
            "Reclaim passes: {}, time in passes: {:.1}ms",
            counters.pass_count,
            counters.cumulative_time.as_secs_f64() * 1000.0
        );
    }
}
