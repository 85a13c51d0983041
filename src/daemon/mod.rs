// Daemon module - polling loop standing in for a memory-pressure notifier

mod service;

pub use service::DaemonService;

use crate::config::Config;
use anyhow::Result;

/// Run the reaper daemon with the given configuration
pub fn run(config: Config) -> Result<()> {
    let mut service = DaemonService::new(config)?;
    service.run()
}
