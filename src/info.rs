// src/info.rs

//! Durable per-package metadata
//!
//! A [`PackageInformation`] record exists from first install until the
//! store drops it, and is updated exactly once per successful
//! post-pipeline run. The default store keeps one JSON document per
//! package id + version under the `.chocolatey/` root.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::{FilesSnapshot, RegistrySnapshot};

/// Durable record for one installed package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInformation {
    pub package_id: String,
    pub version: String,
    /// Installed-program keys this package's operation introduced
    pub registry_snapshot: Option<RegistrySnapshot>,
    /// Files present under the install location after the pipeline
    pub files_snapshot: Option<FilesSnapshot>,
    pub has_silent_uninstall: bool,
    pub is_side_by_side: bool,
    pub is_pinned: bool,
    /// Encrypted argument-replay blob; opaque to the core
    pub arguments: Option<String>,
}

impl PackageInformation {
    pub fn new(package_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            version: version.into(),
            ..Default::default()
        }
    }
}

/// Persistence seam for package records
pub trait PackageInfoStore {
    /// Load the record for a package, or a fresh one when none exists
    fn get(&self, package_id: &str, version: &str) -> Result<PackageInformation>;
    fn save(&self, info: &PackageInformation) -> Result<()>;
    fn remove(&self, package_id: &str, version: &str) -> Result<()>;
}

/// One JSON document per package under the package-info root
pub struct JsonPackageInfoStore {
    root: PathBuf,
}

impl JsonPackageInfoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, package_id: &str, version: &str) -> PathBuf {
        let version = if version.is_empty() { "unknown" } else { version };
        // Versions carry dots, so the extension is appended by hand.
        self.root
            .join(format!("{}.{}.json", package_id.to_lowercase(), version))
    }
}

impl PackageInfoStore for JsonPackageInfoStore {
    fn get(&self, package_id: &str, version: &str) -> Result<PackageInformation> {
        let path = self.record_path(package_id, version);
        if !path.exists() {
            return Ok(PackageInformation::new(package_id, version));
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| Error::IoError(format!("failed to read {}: {}", path.display(), e)))?;
        let info = serde_json::from_str(&raw).map_err(|e| {
            Error::ParseError(format!("corrupt package record {}: {}", path.display(), e))
        })?;
        Ok(info)
    }

    fn save(&self, info: &PackageInformation) -> Result<()> {
        let path = self.record_path(&info.package_id, &info.version);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(info)?;
        fs::write(&path, json)
            .map_err(|e| Error::IoError(format!("failed to write {}: {}", path.display(), e)))?;
        debug!("Saved package record {}", path.display());
        Ok(())
    }

    fn remove(&self, package_id: &str, version: &str) -> Result<()> {
        let path = self.record_path(package_id, version);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                Error::IoError(format!("failed to remove {}: {}", path.display(), e))
            })?;
            debug!("Removed package record {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::InstallerKey;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonPackageInfoStore) {
        let temp = TempDir::new().unwrap();
        let store = JsonPackageInfoStore::new(temp.path().join(".chocolatey"));
        (temp, store)
    }

    #[test]
    fn test_get_missing_returns_fresh_record() {
        let (_temp, store) = store();
        let info = store.get("vim", "9.1.0").unwrap();
        assert_eq!(info.package_id, "vim");
        assert_eq!(info.version, "9.1.0");
        assert!(info.registry_snapshot.is_none());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let (_temp, store) = store();
        let mut info = PackageInformation::new("vim", "9.1.0");
        info.is_pinned = true;
        info.has_silent_uninstall = true;
        info.registry_snapshot = Some(RegistrySnapshot {
            keys: vec![InstallerKey {
                key_path: "HKLM\\...\\vim".to_string(),
                display_name: "Vim".to_string(),
                display_version: "9.1".to_string(),
                uninstall_command: "unins.exe /S".to_string(),
                install_location: Some("C:\\tools\\vim".to_string()),
                has_quiet_uninstall: true,
            }],
        });
        store.save(&info).unwrap();

        let loaded = store.get("VIM", "9.1.0").unwrap();
        assert_eq!(loaded, info);
    }

    #[test]
    fn test_remove_drops_record() {
        let (_temp, store) = store();
        store.save(&PackageInformation::new("vim", "9.1.0")).unwrap();
        store.remove("vim", "9.1.0").unwrap();
        let info = store.get("vim", "9.1.0").unwrap();
        assert!(info.arguments.is_none());
        assert!(!info.is_pinned);
    }
}
