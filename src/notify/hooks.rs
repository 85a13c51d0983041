// Validation for post-kill hook scripts

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub struct HookValidator;

impl HookValidator {
    /// Validates that a hook script exists and is executable
    pub fn validate_hook_script(script_path: &str) -> Result<()> {
        let path = Path::new(script_path);

        // Check if file exists
        if !path.exists() {
            return Err(anyhow::anyhow!("Script does not exist: {}", script_path));
        }

        // Check if it's a file (not a directory)
        if !path.is_file() {
            return Err(anyhow::anyhow!("Path is not a file: {}", script_path));
        }

        // Check if it's executable
        let metadata = fs::metadata(path)
            .context(format!("Failed to read metadata for: {}", script_path))?;
        let permissions = metadata.permissions();

        #[cfg(unix)]
        {
            let mode = permissions.mode();
            if mode & 0o111 == 0 {
                warn!(
                    "Script {} is not executable (permissions: {:o})",
                    script_path, mode
                );
                return Err(anyhow::anyhow!(
                    "Script is not executable: {}. Use 'chmod +x {}'",
                    script_path,
                    script_path
                ));
            }
            debug!(
                "Script {} is valid and executable (permissions: {:o})",
                script_path, mode
            );
        }

        Ok(())
    }

    /// Validates the post-kill script if one is configured
    pub fn validate_hooks(post_kill_script: Option<&str>) -> Result<()> {
        if let Some(script) = post_kill_script {
            info!("Validating post-kill script: {}", script);
            if let Err(e) = Self::validate_hook_script(script) {
                error!("Post-kill script validation failed: {}", e);
                return Err(e);
            }
            info!("Post-kill script validated successfully");
        }

        Ok(())
    }
}
