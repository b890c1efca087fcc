// src/layout.rs

//! Filesystem layout of the install root
//!
//! All durable state lives under a single install root:
//!
//! - `lib/` — installed packages, one directory per package
//! - `lib-bad/` — quarantined failures, mirroring `lib/` relative paths
//! - `lib-bkp/` — prior-version snapshots used for rollback
//! - `extensions/`, `templates/`, `hooks/` — sideload staging roots
//! - `.chocolatey/` — durable per-package metadata records
//!
//! The pending marker `.chocolateyPending` is written inside a package's
//! install location, not under a dedicated root.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-package "operation in progress" marker file
pub const PENDING_FILE_NAME: &str = ".chocolateyPending";

/// Paths derived from the install root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    install_root: PathBuf,
}

impl InstallLayout {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Root of installed packages (`lib/`)
    pub fn packages_root(&self) -> PathBuf {
        self.install_root.join("lib")
    }

    /// Quarantine root for failed operations (`lib-bad/`)
    pub fn package_failures_root(&self) -> PathBuf {
        self.install_root.join("lib-bad")
    }

    /// Rollback snapshot root (`lib-bkp/`)
    pub fn package_backup_root(&self) -> PathBuf {
        self.install_root.join("lib-bkp")
    }

    pub fn extensions_root(&self) -> PathBuf {
        self.install_root.join("extensions")
    }

    pub fn templates_root(&self) -> PathBuf {
        self.install_root.join("templates")
    }

    pub fn hooks_root(&self) -> PathBuf {
        self.install_root.join("hooks")
    }

    /// Durable per-package metadata records (`.chocolatey/`)
    pub fn package_info_root(&self) -> PathBuf {
        self.install_root.join(".chocolatey")
    }

    /// Install location of one package under the packages root
    pub fn package_path(&self, name: &str) -> PathBuf {
        self.packages_root().join(name)
    }

    /// Pending marker path inside an install location
    pub fn pending_path(install_location: &Path) -> PathBuf {
        install_location.join(PENDING_FILE_NAME)
    }

    /// True when `path` is the install root or the packages root; both are
    /// refused as targets of destructive operations.
    pub fn is_protected_root(&self, path: &Path) -> bool {
        path == self.install_root || path == self.packages_root()
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.packages_root(),
            self.package_failures_root(),
            self.package_backup_root(),
            self.extensions_root(),
            self.templates_root(),
            self.hooks_root(),
            self.package_info_root(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| {
                Error::IoError(format!("failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Resolve the default install root.
///
/// `ChocolateyInstall` wins when set; otherwise a per-platform default.
pub fn default_install_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("ChocolateyInstall") {
        if !root.trim().is_empty() {
            return Ok(PathBuf::from(root));
        }
    }

    if cfg!(windows) {
        let program_data = std::env::var("ProgramData")
            .map_err(|_| Error::IoError("ProgramData is not set; cannot resolve install root".to_string()))?;
        return Ok(PathBuf::from(program_data).join("chocolatey"));
    }

    let home = std::env::var("HOME")
        .map_err(|_| Error::IoError("HOME is not set; cannot resolve install root".to_string()))?;
    Ok(PathBuf::from(home).join(".chocolatey"))
}
