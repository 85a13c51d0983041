// Memory information parsing from /proc/meminfo

use crate::reaper::PressureReading;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Memory figures needed to build a pressure reading, all in KiB
#[derive(Debug, Clone, Copy, Default)]
pub struct MemInfo {
    /// Total physical memory
    pub mem_total: u64,
    /// Free memory
    pub mem_free: u64,
    /// Page-cache memory
    pub cached: u64,
    /// Shared memory (tmpfs etc.), counted inside `cached`
    pub shmem: u64,
    /// Memory that cannot be evicted
    pub unevictable: u64,
    /// Swap-cache pages
    pub swap_cached: u64,
    /// File cache on the active list
    pub active_file: u64,
}

impl MemInfo {
    /// Read memory information from /proc/meminfo
    pub fn read() -> Result<Self> {
        Self::read_from_path("/proc/meminfo")
    }

    /// Read memory information from a specific path (for testing)
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut info = Self::default();

        for line in reader.lines() {
            let line = line?;
            let parts: Vec<&str> = line.split_whitespace().collect();

            if parts.len() < 2 {
                continue;
            }

            let key = parts[0].trim_end_matches(':');
            let value: u64 = parts[1]
                .parse()
                .with_context(|| format!("Failed to parse value for {key}"))?;

            match key {
                "MemTotal" => info.mem_total = value,
                "MemFree" => info.mem_free = value,
                "Cached" => info.cached = value,
                "Shmem" => info.shmem = value,
                "Unevictable" => info.unevictable = value,
                "SwapCached" => info.swap_cached = value,
                "Active(file)" => info.active_file = value,
                _ => {}
            }
        }

        // Validate that we got the required fields
        if info.mem_total == 0 {
            anyhow::bail!("Failed to read MemTotal from {}", path.display());
        }

        Ok(info)
    }

    /// Build a per-pass pressure reading; `reserved_kb` stands in for
    /// memory the platform keeps pinned and never hands out.
    pub const fn pressure_reading(&self, reserved_kb: u64) -> PressureReading {
        PressureReading {
            free_kb: self.mem_free,
            file_kb: self.cached,
            shmem_kb: self.shmem,
            unevictable_kb: self.unevictable,
            swapcache_kb: self.swap_cached,
            active_file_kb: self.active_file,
            reserved_kb,
        }
    }

    /// Percentage of memory that is free
    pub fn mem_free_percent(&self) -> f64 {
        if self.mem_total == 0 {
            return 0.0;
        }
        (self.mem_free as f64 / self.mem_total as f64) * 100.0
    }

    /// Format memory size in human-readable format
    pub fn format_size(kb: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if kb >= GB {
            format!("{:.2} GiB", kb as f64 / GB as f64)
        } else if kb >= MB {
            format!("{:.2} MiB", kb as f64 / MB as f64)
        } else if kb >= KB {
            format!("{:.2} KiB", kb as f64 / KB as f64)
        } else {
            format!("{kb} KiB")
        }
    }
}

impl std::fmt::Display for MemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Memory: {}/{} free ({:.1}%), cache: {} (shmem {}, unevictable {})",
            Self::format_size(self.mem_free),
            Self::format_size(self.mem_total),
            self.mem_free_percent(),
            Self::format_size(self.cached),
            Self::format_size(self.shmem),
            Self::format_size(self.unevictable),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
MemTotal:       16000000 kB
MemFree:         2000000 kB
MemAvailable:    8000000 kB
Cached:          5000000 kB
SwapCached:        40000 kB
Active(file):    3000000 kB
Unevictable:       16000 kB
Shmem:            800000 kB
";

    fn sample_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_meminfo() {
        let file = sample_file();
        let info = MemInfo::read_from_path(file.path()).unwrap();

        assert_eq!(info.mem_total, 16_000_000);
        assert_eq!(info.mem_free, 2_000_000);
        assert_eq!(info.cached, 5_000_000);
        assert_eq!(info.swap_cached, 40_000);
        assert_eq!(info.active_file, 3_000_000);
        assert_eq!(info.unevictable, 16_000);
        assert_eq!(info.shmem, 800_000);
    }

    #[test]
    fn test_missing_mem_total_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"MemFree: 100 kB\n").unwrap();
        assert!(MemInfo::read_from_path(file.path()).is_err());
    }

    #[test]
    fn test_pressure_reading_fields() {
        let file = sample_file();
        let info = MemInfo::read_from_path(file.path()).unwrap();
        let reading = info.pressure_reading(12_000);

        assert_eq!(reading.free_kb, 2_000_000);
        assert_eq!(reading.file_kb, 5_000_000);
        assert_eq!(reading.shmem_kb, 800_000);
        assert_eq!(reading.unevictable_kb, 16_000);
        assert_eq!(reading.swapcache_kb, 40_000);
        assert_eq!(reading.active_file_kb, 3_000_000);
        assert_eq!(reading.reserved_kb, 12_000);
    }

    #[test]
    fn test_mem_free_percent() {
        let info = MemInfo {
            mem_total: 16_000_000,
            mem_free: 4_000_000,
            ..MemInfo::default()
        };
        assert_eq!(info.mem_free_percent(), 25.0);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(MemInfo::format_size(512), "512 KiB");
        assert_eq!(MemInfo::format_size(1536), "1.50 KiB");
        assert_eq!(MemInfo::format_size(1024 * 1024), "1.00 MiB");
        assert_eq!(MemInfo::format_size(1024 * 1024 * 1024), "1.00 GiB");
    }
}
