// Memory-pressure evaluation against the tier table

use super::tier::TierTable;

/// Raw memory figures for one reclaim pass, in KiB.
///
/// Supplied by the caller each pass; the evaluator never reads system state
/// itself. Free and cache quantities are carried separately because the
/// policy decides how they combine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PressureReading {
    /// Free memory
    pub free_kb: u64,
    /// Page-cache / file-backed memory
    pub file_kb: u64,
    /// Shared memory counted inside `file_kb` but not reclaimable
    pub shmem_kb: u64,
    /// Unevictable memory counted inside `file_kb`
    pub unevictable_kb: u64,
    /// Swap-cache pages counted inside `file_kb`
    pub swapcache_kb: u64,
    /// File cache on the active list
    pub active_file_kb: u64,
    /// Memory reserved/pinned by the platform, never available for reclaim
    pub reserved_kb: u64,
}

/// Policy for combining a reading into one "effectively free" figure.
///
/// The composition differs across platforms (some count all reclaimable
/// cache as free, some only the inactive portion), so it is pluggable
/// rather than a fixed formula. May go negative when reserves exceed free
/// memory.
pub trait FreePolicy {
    fn effective_free_kb(&self, reading: &PressureReading) -> i64;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Default policy: free memory above reserves plus all reclaimable file
/// cache (file pages minus shmem, unevictable and swap-cache pages).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReclaimableCache;

impl FreePolicy for ReclaimableCache {
    fn effective_free_kb(&self, r: &PressureReading) -> i64 {
        let other_free = r.free_kb as i64 - r.reserved_kb as i64;
        let other_file = r.file_kb as i64
            - r.shmem_kb as i64
            - r.unevictable_kb as i64
            - r.swapcache_kb as i64;
        other_free + other_file
    }

    fn name(&self) -> &'static str {
        "reclaimable-cache"
    }
}

/// Stricter policy that only counts inactive file cache as reclaimable,
/// on the theory that active pages will be faulted right back in.
#[derive(Debug, Clone, Copy, Default)]
pub struct InactiveCache;

impl FreePolicy for InactiveCache {
    fn effective_free_kb(&self, r: &PressureReading) -> i64 {
        ReclaimableCache.effective_free_kb(r) - r.active_file_kb as i64
    }

    fn name(&self) -> &'static str {
        "inactive-cache"
    }
}

/// Result of a pressure evaluation: the active cutoff and the threshold
/// that triggered it (kept for diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalResult {
    pub cutoff: i16,
    pub min_free_kb: u64,
}

/// Pure evaluator: policy-combined free memory against the tier table.
pub struct PressureEvaluator {
    policy: Box<dyn FreePolicy + Send + Sync>,
}

impl PressureEvaluator {
    pub fn new(policy: Box<dyn FreePolicy + Send + Sync>) -> Self {
        Self { policy }
    }

    /// Compute the minimum priority eligible for termination under the
    /// current reading, or `None` when pressure is not severe enough to
    /// act. Deterministic; no side effects.
    pub fn evaluate(&self, reading: &PressureReading, table: &TierTable) -> Option<EvalResult> {
        let effective = self.policy.effective_free_kb(reading);

        let result = table.lookup(effective).map(|entry| EvalResult {
            cutoff: entry.min_priority,
            min_free_kb: entry.min_free_kb,
        });

        log::trace!(
            "evaluate: policy={} effective_free={} KiB -> {:?}",
            self.policy.name(),
            effective,
            result
        );

        result
    }
}

impl Default for PressureEvaluator {
    fn default() -> Self {
        Self::new(Box::new(ReclaimableCache))
    }
}
