// Tier table mapping free-memory thresholds to minimum kill priorities

use anyhow::{bail, Result};

/// Maximum number of tiers a table can hold
pub const MAX_TIERS: usize = 6;

/// Lowest valid priority value (fully protected)
pub const PRIORITY_MIN: i16 = -1000;

/// Highest valid priority value (most expendable)
pub const PRIORITY_MAX: i16 = 1000;

/// One tier: processes at or above `min_priority` become eligible for
/// termination once effective free memory drops below `min_free_kb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEntry {
    pub min_priority: i16,
    pub min_free_kb: u64,
}

/// Ordered tier table, consulted in ascending threshold order.
///
/// Immutable once built; runtime reconfiguration replaces the whole table
/// (see `ReapCoordinator::set_tier_table`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierTable {
    entries: Vec<TierEntry>,
}

impl TierTable {
    /// Build a table from parallel priority/threshold lists.
    ///
    /// The effective length is the shorter of the two lists, capped at
    /// `MAX_TIERS`. Mismatched lengths are silently truncated rather than
    /// rejected, matching the classic lowmemorykiller module-parameter
    /// behavior.
    pub fn from_lists(priorities: &[i16], thresholds_kb: &[u64]) -> Result<Self> {
        let len = priorities
            .len()
            .min(thresholds_kb.len())
            .min(MAX_TIERS);

        for &adj in &priorities[..len] {
            if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&adj) {
                bail!(
                    "priority {} out of range ({}..={})",
                    adj,
                    PRIORITY_MIN,
                    PRIORITY_MAX
                );
            }
        }

        let entries = priorities[..len]
            .iter()
            .zip(&thresholds_kb[..len])
            .map(|(&min_priority, &min_free_kb)| TierEntry {
                min_priority,
                min_free_kb,
            })
            .collect();

        Ok(Self { entries })
    }

    /// Find the active tier for the given effective free memory.
    ///
    /// Walks entries in table order and returns the first whose threshold
    /// strictly exceeds `free_kb`, or `None` when free memory satisfies
    /// every tier (no action needed). An empty table always returns `None`.
    pub fn lookup(&self, free_kb: i64) -> Option<&TierEntry> {
        self.entries
            .iter()
            .find(|entry| free_kb < entry.min_free_kb as i64)
    }

    /// Number of effective tiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no effective tiers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate tiers in table order
    pub fn entries(&self) -> impl Iterator<Item = &TierEntry> {
        self.entries.iter()
    }
}
