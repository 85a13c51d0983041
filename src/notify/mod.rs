// Structured event sink for kill dispatches

pub mod hooks;

use log::{error, info, warn};
use std::process::Command;

/// Sanitize a string for safe use in environment variables and shell scripts
fn sanitize_env_value(s: &str) -> String {
    // Remove or replace potentially dangerous characters
    s.chars()
        .map(|c| match c {
            // Allow alphanumeric, spaces, dots, hyphens, underscores
            c if c.is_alphanumeric() => c,
            ' ' | '.' | '-' | '_' | '/' => c,
            // Replace control characters and shell metacharacters
            _ => '_',
        })
        .take(256) // Limit length
        .collect()
}

/// One record per kill dispatch: victim identity plus the memory figures
/// that drove the decision.
#[derive(Debug, Clone)]
pub struct ReapEvent {
    pub pid: i32,
    pub name: String,
    pub priority: i16,
    pub rss_kb: i64,
    pub cutoff: i16,
    pub min_free_kb: u64,
    pub free_kb: u64,
    pub file_kb: u64,
}

/// Receiver for dispatch records. Audit/trace only: the reclaim pass never
/// depends on a sink succeeding.
pub trait EventSink {
    fn kill_dispatched(&self, event: &ReapEvent);
}

/// Sink that logs each dispatch and optionally runs a post-kill script.
pub struct NotificationManager {
    post_kill_script: Option<String>,
}

impl NotificationManager {
    pub fn new(post_kill_script: Option<String>) -> Self {
        Self { post_kill_script }
    }

    fn execute_script(&self, script_path: &str, event: &ReapEvent) {
        let safe_name = sanitize_env_value(&event.name);

        let output = Command::new(script_path)
            .env("LOWMEM_REAPER_PID", event.pid.to_string())
            .env("LOWMEM_REAPER_NAME", &safe_name)
            .env("LOWMEM_REAPER_RSS", event.rss_kb.to_string())
            .env("LOWMEM_REAPER_PRIORITY", event.priority.to_string())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                info!("Script {} executed successfully", script_path);
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!(
                    "Script {} failed with status {}: {}",
                    script_path,
                    output.status,
                    stderr.trim()
                );
            }
            Err(e) => error!("Failed to execute script {}: {}", script_path, e),
        }
    }
}

impl EventSink for NotificationManager {
    fn kill_dispatched(&self, event: &ReapEvent) {
        warn!(
            "Killing '{}' (pid {}), priority {}, to free {} KiB because \
             free memory {} KiB (cache {} KiB) is below limit {} KiB for priority {}",
            sanitize_env_value(&event.name),
            event.pid,
            event.priority,
            event.rss_kb,
            event.free_kb,
            event.file_kb,
            event.min_free_kb,
            event.cutoff,
        );

        if let Some(script) = &self.post_kill_script {
            self.execute_script(script, event);
        }
    }
}
