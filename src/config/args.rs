// Command-line argument parsing

use clap::{Parser, ValueEnum};

/// Which figures count toward "effectively free" memory
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicyArg {
    /// Free memory plus all reclaimable file cache
    ReclaimableCache,
    /// Free memory plus inactive file cache only
    InactiveCache,
}

/// lowmem-reaper - Tiered low-memory process reaper
///
/// Watches free memory against a configurable tier table and terminates
/// the least important, largest process once a tier's threshold is
/// crossed, the way the classic Android lowmemorykiller did in kernel
/// space.
#[derive(Parser, Debug)]
#[command(name = "lowmem-reaper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tiered low-memory process reaper", long_about = None)]
pub struct Args {
    /// Minimum kill priorities, comma separated in ascending order
    /// (default: 0,1,6,12). Paired positionally with --minfree; extra
    /// entries on either side are ignored.
    #[arg(long = "adj", value_name = "LIST")]
    pub adj: Option<String>,

    /// Free-memory thresholds in KiB, comma separated in ascending order
    /// (default: 6144,8192,16384,65536)
    #[arg(long = "minfree", value_name = "LIST")]
    pub minfree: Option<String>,

    /// KiB considered reserved by the platform and never reclaimable
    #[arg(long = "reserved", value_name = "KIB")]
    pub reserved_kb: Option<u64>,

    /// How file cache counts toward free memory
    #[arg(long = "cache-policy", value_enum, value_name = "POLICY")]
    pub cache_policy: Option<CachePolicyArg>,

    /// Memory check interval in seconds (default: 1)
    #[arg(short = 'i', long = "interval", value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Status report interval in seconds (default: 60)
    #[arg(short = 'r', long = "report", value_name = "SECONDS")]
    pub report: Option<u64>,

    /// Never kill processes matching this regex (can be used multiple times)
    #[arg(long = "protect", value_name = "REGEX")]
    pub protect: Vec<String>,

    /// Script to run after a kill is dispatched
    #[arg(short = 'N', long = "post-kill-script", value_name = "PATH")]
    pub post_kill_script: Option<String>,

    /// Kill entire process group instead of just the process
    #[arg(short = 'g', long = "kill-group")]
    pub kill_group: bool,

    /// Set daemon priority (-20 to 19, lower = higher priority)
    #[arg(short = 'p', long = "set-priority", value_name = "PRIORITY")]
    pub priority: Option<i32>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Dry run mode - don't actually kill processes, just report
    #[arg(long = "dryrun")]
    pub dry_run: bool,

    /// Use syslog instead of stdout/stderr for logging
    #[arg(long = "syslog")]
    pub syslog: bool,
}

impl Args {
    /// Parse arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_tier_flags() {
        use clap::Parser;
        let args =
            Args::parse_from(["lowmem-reaper", "--adj", "0,8", "--minfree", "1024,4096"]);
        assert_eq!(args.adj.as_deref(), Some("0,8"));
        assert_eq!(args.minfree.as_deref(), Some("1024,4096"));
    }
}
