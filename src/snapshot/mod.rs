// src/snapshot/mod.rs

//! System-state snapshots and diffs
//!
//! Installed-program registry entries and environment variables are
//! captured before and after an operation; the diff tells uninstall what
//! the operation left behind. Capture goes through the
//! [`RegistryService`](crate::services::RegistryService) collaborator; the
//! diff functions are pure and own nothing.
//!
//! Off Windows every capture is empty and no registry read is attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::services::RegistryService;

/// Scope an environment variable was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnvScope {
    User,
    Machine,
}

/// One environment variable at capture time
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvVar {
    pub scope: EnvScope,
    pub name: String,
    pub value: String,
}

/// Unordered set of user + machine environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub vars: BTreeSet<EnvVar>,
}

/// Changes between two environment snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDiff {
    /// Variables added or whose value changed
    pub added_or_changed: Vec<EnvVar>,
    pub removed: Vec<EnvVar>,
}

impl EnvDiff {
    pub fn is_empty(&self) -> bool {
        self.added_or_changed.is_empty() && self.removed.is_empty()
    }
}

/// One installed-program entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerKey {
    pub key_path: String,
    pub display_name: String,
    pub display_version: String,
    pub uninstall_command: String,
    pub install_location: Option<String>,
    /// Derived from the uninstall command at capture time
    pub has_quiet_uninstall: bool,
}

/// Ordered set of installed-program entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub keys: Vec<InstallerKey>,
}

impl RegistrySnapshot {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// One captured file under an install location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFile {
    pub path: String,
    pub checksum: String,
}

/// Files present under an install location at capture time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesSnapshot {
    pub files: Vec<CapturedFile>,
    pub captured_at: Option<DateTime<Utc>>,
}

/// On-demand capture over the registry collaborator
///
/// Callers own the before/after snapshots; nothing is persisted here.
pub struct Snapshotter<'a> {
    registry: &'a dyn RegistryService,
    windows: bool,
}

impl<'a> Snapshotter<'a> {
    pub fn new(registry: &'a dyn RegistryService, windows: bool) -> Self {
        Self { registry, windows }
    }

    /// Capture user + machine environment variables
    pub fn snapshot_env(&self) -> EnvironmentSnapshot {
        if !self.windows {
            return EnvironmentSnapshot::default();
        }
        match self.registry.environment_values() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Environment capture failed: {}", e);
                EnvironmentSnapshot::default()
            }
        }
    }

    /// Capture installed-program registry entries
    pub fn snapshot_installers(&self) -> RegistrySnapshot {
        if !self.windows {
            return RegistrySnapshot::default();
        }
        match self.registry.installer_keys() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Installer key capture failed: {}", e);
                RegistrySnapshot::default()
            }
        }
    }
}

/// Set-based diff on `(scope, name)`; a value difference counts as
/// "changed" and lands in `added_or_changed`.
pub fn diff_env(before: &EnvironmentSnapshot, after: &EnvironmentSnapshot) -> EnvDiff {
    let after_names: BTreeSet<(EnvScope, &str)> = after
        .vars
        .iter()
        .map(|v| (v.scope, v.name.as_str()))
        .collect();

    // An exact (scope, name, value) match is unchanged; anything else in
    // `after` is either new or carries a changed value.
    let added_or_changed = after
        .vars
        .iter()
        .filter(|v| !before.vars.contains(v))
        .cloned()
        .collect();
    let removed = before
        .vars
        .iter()
        .filter(|v| !after_names.contains(&(v.scope, v.name.as_str())))
        .cloned()
        .collect();

    EnvDiff {
        added_or_changed,
        removed,
    }
}

/// New installer keys only, matched by key path
pub fn diff_installers(before: &RegistrySnapshot, after: &RegistrySnapshot) -> RegistrySnapshot {
    let known: BTreeSet<&str> = before.keys.iter().map(|k| k.key_path.as_str()).collect();
    RegistrySnapshot {
        keys: after
            .keys
            .iter()
            .filter(|k| !known.contains(k.key_path.as_str()))
            .cloned()
            .collect(),
    }
}

/// Log environment changes, redacting values unless the run opted into
/// logging them.
pub fn log_env_changes(diff: &EnvDiff, log_values: bool) {
    for var in &diff.added_or_changed {
        if log_values {
            debug!("Environment variable set: {}={}", var.name, var.value);
        } else {
            debug!("Environment variable set: {}", var.name);
        }
    }
    for var in &diff.removed {
        debug!("Environment variable removed: {}", var.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(scope: EnvScope, name: &str, value: &str) -> EnvVar {
        EnvVar {
            scope,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn env(vars: Vec<EnvVar>) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            vars: vars.into_iter().collect(),
        }
    }

    fn key(path: &str) -> InstallerKey {
        InstallerKey {
            key_path: path.to_string(),
            display_name: path.to_string(),
            display_version: "1.0".to_string(),
            uninstall_command: format!("{} /uninstall", path),
            install_location: None,
            has_quiet_uninstall: false,
        }
    }

    #[test]
    fn test_diff_env_identity_is_empty() {
        let snapshot = env(vec![
            var(EnvScope::User, "PATH", "/usr/bin"),
            var(EnvScope::Machine, "TEMP", "/tmp"),
        ]);
        let diff = diff_env(&snapshot, &snapshot);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_env_added_removed_changed() {
        let before = env(vec![
            var(EnvScope::User, "KEEP", "1"),
            var(EnvScope::User, "CHANGE", "old"),
            var(EnvScope::Machine, "DROP", "x"),
        ]);
        let after = env(vec![
            var(EnvScope::User, "KEEP", "1"),
            var(EnvScope::User, "CHANGE", "new"),
            var(EnvScope::User, "NEW", "y"),
        ]);

        let diff = diff_env(&before, &after);
        let names: Vec<&str> = diff
            .added_or_changed
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert!(names.contains(&"CHANGE"));
        assert!(names.contains(&"NEW"));
        assert!(!names.contains(&"KEEP"));
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].name, "DROP");
    }

    #[test]
    fn test_diff_env_same_name_other_scope_is_added() {
        let before = env(vec![var(EnvScope::User, "PATH", "/usr/bin")]);
        let after = env(vec![
            var(EnvScope::User, "PATH", "/usr/bin"),
            var(EnvScope::Machine, "PATH", "/usr/bin"),
        ]);
        let diff = diff_env(&before, &after);
        assert_eq!(diff.added_or_changed.len(), 1);
        assert_eq!(diff.added_or_changed[0].scope, EnvScope::Machine);
    }

    #[test]
    fn test_diff_installers_identity_is_empty() {
        let snapshot = RegistrySnapshot {
            keys: vec![key("HKLM\\...\\vim"), key("HKLM\\...\\git")],
        };
        assert!(diff_installers(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn test_diff_installers_new_keys_only() {
        let before = RegistrySnapshot {
            keys: vec![key("HKLM\\...\\vim")],
        };
        let after = RegistrySnapshot {
            keys: vec![key("HKLM\\...\\vim"), key("HKLM\\...\\git")],
        };
        let diff = diff_installers(&before, &after);
        assert_eq!(diff.keys.len(), 1);
        assert_eq!(diff.keys[0].key_path, "HKLM\\...\\git");
    }
}
