// src/pending.rs

//! Per-package pending markers
//!
//! A `.chocolateyPending` file inside an install location marks a package
//! whose post-pipeline is in flight; a marker still present outside the
//! pipeline identifies a broken install. When
//! `lock_transactional_install_files` is enabled the marker is also held
//! under an exclusive `flock`, handle retained in a process-local map
//! keyed by lowercased package name so the lock survives until
//! [`remove_pending`] (or scope teardown) drops it.
//!
//! Failing to acquire the lock is fatal to the operation.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::layout::InstallLayout;
use crate::results::PackageResult;

/// Process-local registry of held pending-marker locks
///
/// Exactly one writer (the coordinator) inserts; lookups happen only on
/// removal. The map tolerates being poisoned-free because every access is
/// short and panic-free.
#[derive(Default)]
pub struct PendingLocks {
    held: Mutex<HashMap<String, File>>,
}

impl PendingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn retain(&self, name: &str, file: File) {
        self.held
            .lock()
            .expect("pending lock map poisoned")
            .insert(name.to_lowercase(), file);
    }

    /// Drop the retained handle for `name`, releasing the lock. Returns
    /// true when a handle was held.
    pub fn release(&self, name: &str) -> bool {
        self.held
            .lock()
            .expect("pending lock map poisoned")
            .remove(&name.to_lowercase())
            .is_some()
    }

    /// True when a lock handle is retained for `name`
    pub fn is_held(&self, name: &str) -> bool {
        self.held
            .lock()
            .expect("pending lock map poisoned")
            .contains_key(&name.to_lowercase())
    }
}

/// Guard that releases a retained pending lock on every exit path,
/// including unwinding. [`remove_pending`] releases first in the normal
/// flow; dropping after that is a no-op.
pub struct PendingScope<'a> {
    locks: &'a PendingLocks,
    name: String,
}

impl<'a> PendingScope<'a> {
    pub fn new(locks: &'a PendingLocks, name: impl Into<String>) -> Self {
        Self {
            locks,
            name: name.into(),
        }
    }
}

impl Drop for PendingScope<'_> {
    fn drop(&mut self) {
        if self.locks.release(&self.name) {
            warn!(
                "Pending lock for '{}' released by scope teardown",
                self.name
            );
        }
    }
}

/// Write the pending marker for `result`'s install location.
///
/// Refuses (recording an error on the result) when the install location
/// is the install root or the packages root. Lock acquisition failure is
/// returned as [`Error::LockError`] and must abort the operation.
pub fn set_pending(
    result: &mut PackageResult,
    config: &Configuration,
    layout: &InstallLayout,
    locks: &PendingLocks,
) -> Result<()> {
    let Some(location) = result.install_location.clone() else {
        return Ok(());
    };

    if layout.is_protected_root(&location) {
        result.fail(format!(
            "Install location '{}' is not a package directory; refusing to mark it pending",
            location.display()
        ));
        return Ok(());
    }

    let marker = InstallLayout::pending_path(&location);
    if let Some(parent) = marker.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::IoError(format!("failed to create {}: {}", parent.display(), e)))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&marker)
        .map_err(|e| {
            Error::IoError(format!(
                "failed to write pending marker {}: {}",
                marker.display(),
                e
            ))
        })?;
    file.write_all(result.name.as_bytes()).map_err(|e| {
        Error::IoError(format!(
            "failed to write pending marker {}: {}",
            marker.display(),
            e
        ))
    })?;

    if config.features.lock_transactional_install_files {
        file.try_lock_exclusive().map_err(|e| {
            Error::LockError(format!(
                "could not take exclusive hold of {}: {}",
                marker.display(),
                e
            ))
        })?;
        locks.retain(&result.name, file);
        debug!("Holding pending marker lock for '{}'", result.name);
    }

    Ok(())
}

/// Release the retained lock (if any) and delete the marker when the
/// result is successful. Applies the same protected-root guard as
/// [`set_pending`].
pub fn remove_pending(
    result: &mut PackageResult,
    _config: &Configuration,
    layout: &InstallLayout,
    locks: &PendingLocks,
) -> Result<()> {
    let Some(location) = result.install_location.clone() else {
        return Ok(());
    };

    if layout.is_protected_root(&location) {
        result.fail(format!(
            "Install location '{}' is not a package directory; refusing to clear pending state",
            location.display()
        ));
        return Ok(());
    }

    locks.release(&result.name);

    let marker = InstallLayout::pending_path(&location);
    if result.success && marker.exists() {
        fs::remove_file(&marker).map_err(|e| {
            Error::IoError(format!(
                "failed to remove pending marker {}: {}",
                marker.display(),
                e
            ))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn harness() -> (TempDir, InstallLayout, Configuration, PendingLocks) {
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path().to_path_buf());
        layout.ensure_base_dirs().unwrap();
        (temp, layout, Configuration::default(), PendingLocks::new())
    }

    fn result_at(layout: &InstallLayout, name: &str) -> PackageResult {
        let mut result = PackageResult::new(name, "1.0.0");
        result.install_location = Some(layout.package_path(name));
        result
    }

    #[test]
    fn test_set_and_remove_pending() {
        let (_temp, layout, config, locks) = harness();
        let mut result = result_at(&layout, "vim");

        set_pending(&mut result, &config, &layout, &locks).unwrap();
        let marker = InstallLayout::pending_path(&layout.package_path("vim"));
        assert!(marker.exists());
        assert_eq!(fs::read_to_string(&marker).unwrap(), "vim");

        remove_pending(&mut result, &config, &layout, &locks).unwrap();
        assert!(!marker.exists());
    }

    #[test]
    fn test_marker_survives_failed_result() {
        let (_temp, layout, config, locks) = harness();
        let mut result = result_at(&layout, "vim");

        set_pending(&mut result, &config, &layout, &locks).unwrap();
        result.fail("installer exited 1603");
        remove_pending(&mut result, &config, &layout, &locks).unwrap();

        let marker = InstallLayout::pending_path(&layout.package_path("vim"));
        assert!(marker.exists(), "failed installs keep their marker");
    }

    #[test]
    fn test_protected_root_is_refused() {
        let (_temp, layout, config, locks) = harness();
        let mut result = PackageResult::new("vim", "1.0.0");
        result.install_location = Some(layout.packages_root());

        set_pending(&mut result, &config, &layout, &locks).unwrap();
        assert!(!result.success);
        assert!(!InstallLayout::pending_path(&layout.packages_root()).exists());
    }

    #[test]
    fn test_lock_retained_and_released() {
        let (_temp, layout, mut config, locks) = harness();
        config.features.lock_transactional_install_files = true;
        let mut result = result_at(&layout, "vim");

        set_pending(&mut result, &config, &layout, &locks).unwrap();
        assert!(locks.is_held("VIM"), "map is keyed case-insensitively");

        remove_pending(&mut result, &config, &layout, &locks).unwrap();
        assert!(!locks.is_held("vim"));
    }

    #[test]
    fn test_scope_teardown_releases_lock() {
        let (_temp, layout, mut config, locks) = harness();
        config.features.lock_transactional_install_files = true;
        let mut result = result_at(&layout, "vim");

        set_pending(&mut result, &config, &layout, &locks).unwrap();
        {
            let _scope = PendingScope::new(&locks, "vim");
        }
        assert!(!locks.is_held("vim"));
    }

    #[test]
    fn test_missing_install_location_is_noop() {
        let (_temp, layout, config, locks) = harness();
        let mut result = PackageResult::new("vim", "1.0.0");
        result.install_location = None;
        set_pending(&mut result, &config, &layout, &locks).unwrap();
        assert!(result.success);
    }
}
