// Environment variable configuration support

use super::{parse_adj_list, parse_minfree_list, Config};
use anyhow::Result;
use std::env;
use std::time::Duration;

/// Apply environment variable overrides to configuration
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    // Tier table lists
    if let Ok(val) = env::var("LOWMEM_REAPER_ADJ") {
        config.adj = parse_adj_list(&val)?;
    }
    if let Ok(val) = env::var("LOWMEM_REAPER_MINFREE") {
        config.minfree_kb = parse_minfree_list(&val)?;
    }

    // Pressure composition
    if let Ok(val) = env::var("LOWMEM_REAPER_RESERVED") {
        config.reserved_kb = val.parse()?;
    }

    // Monitoring intervals
    if let Ok(val) = env::var("LOWMEM_REAPER_INTERVAL") {
        config.check_interval = Duration::from_secs(val.parse()?);
    }
    if let Ok(val) = env::var("LOWMEM_REAPER_REPORT") {
        config.report_interval = Duration::from_secs(val.parse()?);
    }

    // Behavior flags
    if let Ok(val) = env::var("LOWMEM_REAPER_DRY_RUN") {
        config.dry_run = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("LOWMEM_REAPER_DEBUG") {
        config.debug = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("LOWMEM_REAPER_KILL_GROUP") {
        config.kill_group = parse_bool(&val)?;
    }

    // Priority
    if let Ok(val) = env::var("LOWMEM_REAPER_PRIORITY") {
        config.priority = Some(val.parse()?);
    }

    Ok(config)
}

/// Parse boolean value from string
/// Accepts: true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid boolean value: {}", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(parse_bool("yes").unwrap());
        assert!(parse_bool("on").unwrap());

        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("FALSE").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(!parse_bool("no").unwrap());
        assert!(!parse_bool("off").unwrap());

        assert!(parse_bool("invalid").is_err());
    }
}
