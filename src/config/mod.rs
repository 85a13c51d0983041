// Configuration module

mod args;
mod env;

pub use args::{Args, CachePolicyArg};
use crate::reaper::{TierTable, MAX_TIERS, PRIORITY_MAX, PRIORITY_MIN};
use anyhow::{bail, Context, Result};
use regex::{Regex, RegexBuilder};
use std::time::Duration;

/// Maximum allowed length for regex patterns to prevent ReDoS attacks
const MAX_REGEX_PATTERN_LENGTH: usize = 256;

/// Maximum compiled regex size in bytes (10MB) to prevent memory exhaustion
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Compile a regex pattern with safety limits to prevent ReDoS attacks.
///
/// Limits pattern length and compiled size; protect patterns come from
/// the command line or environment and may be hostile.
fn compile_safe_regex(pattern: &str) -> Result<Regex> {
    if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
        bail!(
            "Regex pattern too long (max {} chars): {}...",
            MAX_REGEX_PATTERN_LENGTH,
            &pattern[..50.min(pattern.len())]
        );
    }

    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .context(format!("Invalid regex pattern: {}", pattern))
}

/// Parse a comma-separated priority list, e.g. "0,1,6,12"
pub(crate) fn parse_adj_list(s: &str) -> Result<Vec<i16>> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<i16>()
                .with_context(|| format!("Invalid priority value: {part}"))
        })
        .collect()
}

/// Parse a comma-separated KiB threshold list, e.g. "6144,8192"
pub(crate) fn parse_minfree_list(s: &str) -> Result<Vec<u64>> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid threshold value: {part}"))
        })
        .collect()
}

/// Main configuration struct for the reaper daemon
#[derive(Debug, Clone)]
pub struct Config {
    // Tier table: parallel lists, paired positionally
    pub adj: Vec<i16>,        // Minimum kill priority per tier
    pub minfree_kb: Vec<u64>, // Free-memory threshold per tier, KiB

    // Pressure composition
    pub reserved_kb: u64,             // Platform-reserved memory, KiB
    pub cache_policy: CachePolicyArg, // How cache counts toward free

    // Monitoring intervals
    pub check_interval: Duration,  // How often to run a reclaim pass
    pub report_interval: Duration, // How often to report status

    // Process selection
    pub protect: Vec<Regex>, // Never kill matching processes

    // Behavior flags
    pub dry_run: bool, // Don't actually kill processes
    pub debug: bool,   // Enable debug logging
    pub kill_group: bool, // Kill entire process group

    // Hooks
    pub post_kill_script: Option<String>,

    // Daemon priority (niceness)
    pub priority: Option<i32>,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config = Self::default();

        if let Some(adj_str) = args.adj {
            config.adj = parse_adj_list(&adj_str)?;
        }
        if let Some(minfree_str) = args.minfree {
            config.minfree_kb = parse_minfree_list(&minfree_str)?;
        }

        if let Some(reserved) = args.reserved_kb {
            config.reserved_kb = reserved;
        }
        if let Some(policy) = args.cache_policy {
            config.cache_policy = policy;
        }

        // Monitoring intervals
        if let Some(interval) = args.interval {
            config.check_interval = Duration::from_secs(interval);
        }
        if let Some(report) = args.report {
            config.report_interval = Duration::from_secs(report);
        }

        // Compile regex patterns with safety limits (ReDoS protection)
        for pattern in args.protect {
            config.protect.push(compile_safe_regex(&pattern)?);
        }

        // Behavior flags
        config.dry_run = args.dry_run;
        config.debug = args.debug;
        config.kill_group = args.kill_group;

        // Hooks
        config.post_kill_script = args.post_kill_script;

        // Priority
        config.priority = args.priority;

        // Apply environment variable overrides
        config = env::apply_env_overrides(config)?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Build the initial tier table from the configured lists
    pub fn tier_table(&self) -> Result<TierTable> {
        TierTable::from_lists(&self.adj, &self.minfree_kb)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.adj.is_empty() || self.minfree_kb.is_empty() {
            bail!("adj and minfree lists must not be empty");
        }

        for &adj in &self.adj {
            if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&adj) {
                bail!(
                    "adj value {} out of range ({}..={})",
                    adj,
                    PRIORITY_MIN,
                    PRIORITY_MAX
                );
            }
        }

        // Mismatched lengths truncate to the shorter list, same as the
        // kernel module parameters did
        if self.adj.len() != self.minfree_kb.len() {
            log::warn!(
                "adj ({}) and minfree ({}) lengths differ, extra entries are ignored",
                self.adj.len(),
                self.minfree_kb.len()
            );
        }
        if self.adj.len().max(self.minfree_kb.len()) > MAX_TIERS {
            log::warn!("more than {MAX_TIERS} tiers configured, extra entries are ignored");
        }

        // Tables are documented as ascending; a descending threshold
        // shadows every tier behind it
        if self.minfree_kb.windows(2).any(|w| w[0] > w[1]) {
            log::warn!("minfree thresholds are not ascending, later tiers may never match");
        }
        if self.adj.windows(2).any(|w| w[0] > w[1]) {
            log::warn!("adj values are not ascending");
        }

        // Validate priority range
        if let Some(priority) = self.priority {
            if !(-20..=19).contains(&priority) {
                bail!("priority must be between -20 and 19");
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Classic lowmemorykiller defaults (thresholds converted from
            // pages to KiB): 6, 8, 16 and 64 MiB
            adj: vec![0, 1, 6, 12],
            minfree_kb: vec![6144, 8192, 16384, 65536],
            reserved_kb: 0,
            cache_policy: CachePolicyArg::ReclaimableCache,
            check_interval: Duration::from_secs(1),
            report_interval: Duration::from_secs(60),
            protect: Vec::new(),
            dry_run: false,
            debug: false,
            kill_group: false,
            post_kill_script: None,
            priority: None,
        }
    }
}
