// src/services/script.rs

//! Default scripting host
//!
//! Runs package-supplied automation scripts (`chocolateyInstall.ps1`,
//! `chocolateyUninstall.ps1`, `chocolateyBeforeModify.ps1`) through
//! PowerShell. The package script is dot-sourced from a generated wrapper
//! staged in a temp directory so the interpreter session carries strict
//! error handling regardless of what the script sets.
//!
//! - stdin is nullified to prevent hangs
//! - execution is bounded by the configuration's timeout
//! - stdout/stderr are forwarded line by line into the log
//! - installer exit codes 1605/1614/1641/3010 count as success

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use super::{env_vars, ScriptingHost};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::results::PackageResult;

/// Exit codes a package script may return without failing the package
const SUCCESS_EXIT_CODES: [i32; 5] = [0, 1605, 1614, 1641, 3010];

/// Fallback bound when the configuration carries no timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2700);

/// PowerShell-backed scripting host
pub struct PowerShellHost {
    interpreter: PathBuf,
}

impl PowerShellHost {
    pub fn new() -> Self {
        let interpreter = if cfg!(windows) { "powershell" } else { "pwsh" };
        Self {
            interpreter: PathBuf::from(interpreter),
        }
    }

    pub fn with_interpreter(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Locate a script under `tools/` first, then the package root
    fn find_script(&self, install_location: &Path, script: &str) -> Option<PathBuf> {
        let tools = install_location.join("tools").join(script);
        if tools.is_file() {
            return Some(tools);
        }
        let root = install_location.join(script);
        root.is_file().then_some(root)
    }

    fn run_script(
        &self,
        script_name: &str,
        config: &Configuration,
        result: &mut PackageResult,
    ) -> Result<bool> {
        if config.features.skip_automation_scripts {
            debug!("Automation scripts are disabled; skipping {}", script_name);
            return Ok(false);
        }
        if !config.features.use_powershell_host {
            debug!("Built-in host disabled; handing {} to the system shell", script_name);
        }
        let Some(location) = result.install_location.clone() else {
            return Ok(false);
        };
        let Some(script_path) = self.find_script(&location, script_name) else {
            debug!("'{}' has no {}", result.name, script_name);
            return Ok(false);
        };

        info!(
            "Running {} for {} v{}",
            script_name, result.name, result.version
        );

        let temp_dir = TempDir::new()
            .map_err(|e| Error::ScriptError(format!("failed to stage script wrapper: {}", e)))?;
        let wrapper = stage_wrapper(temp_dir.path(), &script_path)?;

        let timeout = if config.execution_timeout > 0 {
            Duration::from_secs(config.execution_timeout as u64)
        } else {
            DEFAULT_TIMEOUT
        };

        let spawned = Command::new(&self.interpreter)
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-ExecutionPolicy")
            .arg("Bypass")
            .arg("-File")
            .arg(&wrapper)
            .env("ChocolateyPackageName", &result.name)
            .env("ChocolateyPackageVersion", &result.version)
            .env("ChocolateyPackageFolder", &location)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                result.fail(format!(
                    "{} could not start ({}): {}",
                    script_name,
                    self.interpreter.display(),
                    e
                ));
                return Ok(true);
            }
        };

        match child.wait_timeout(timeout)? {
            Some(_status) => {
                let output = child.wait_with_output()?;
                for line in String::from_utf8_lossy(&output.stdout).lines() {
                    info!("[{}] {}", result.name, line);
                }
                for line in String::from_utf8_lossy(&output.stderr).lines() {
                    warn!("[{}] {}", result.name, line);
                }

                let code = output.status.code().unwrap_or(-1);
                result.exit_code = code;
                if SUCCESS_EXIT_CODES.contains(&code) {
                    debug!("{} completed with exit code {}", script_name, code);
                } else {
                    result.fail(format!("{} exited {}", script_name, code));
                }
                Ok(true)
            }
            None => {
                let _ = child.kill();
                result.fail(format!(
                    "{} timed out after {} seconds",
                    script_name,
                    timeout.as_secs()
                ));
                Ok(true)
            }
        }
    }
}

impl Default for PowerShellHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptingHost for PowerShellHost {
    fn install(&self, config: &Configuration, result: &mut PackageResult) -> Result<bool> {
        self.run_script("chocolateyInstall.ps1", config, result)
    }

    fn uninstall(&self, config: &Configuration, result: &mut PackageResult) -> Result<bool> {
        self.run_script("chocolateyUninstall.ps1", config, result)
    }

    fn before_modify(&self, config: &Configuration, result: &mut PackageResult) -> Result<bool> {
        self.run_script("chocolateyBeforeModify.ps1", config, result)
    }

    fn install_noop(&self, _config: &Configuration, result: &PackageResult) {
        info!("Would have run chocolateyInstall.ps1 for '{}'", result.name);
    }

    fn uninstall_noop(&self, _config: &Configuration, result: &PackageResult) {
        info!("Would have run chocolateyUninstall.ps1 for '{}'", result.name);
    }
}

/// Write the wrapper that dot-sources the package script with strict
/// error handling, mirroring the exit code back to the caller.
fn stage_wrapper(temp_dir: &Path, script_path: &Path) -> Result<PathBuf> {
    let wrapper_path = temp_dir.join("wrapper.ps1");
    let content = format!(
        "$ErrorActionPreference = 'Stop'\ntry {{\n  . '{}'\n}} catch {{\n  Write-Error $_\n  exit 1\n}}\nexit $LASTEXITCODE\n",
        script_path.display()
    );

    let mut file = File::create(&wrapper_path)
        .map_err(|e| Error::ScriptError(format!("failed to create wrapper script: {}", e)))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::ScriptError(format!("failed to write wrapper script: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&wrapper_path)?.permissions();
        perms.set_mode(0o700);
        std::fs::set_permissions(&wrapper_path, perms)?;
    }

    Ok(wrapper_path)
}
