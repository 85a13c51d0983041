// lowmem-reaper - Tiered low-memory process reaper library

pub mod config;
pub mod daemon;
pub mod monitor;
pub mod notify;
pub mod reaper;

// Re-export commonly used types
pub use config::Config;
pub use monitor::{MemInfo, ProcSource};
pub use reaper::{
    PassOutcome, PressureReading, ProcessCandidate, ReapCoordinator, TierTable,
};
