// src/coordinator/failure.rs

//! Failure handling: quarantine moves and backup rollback
//!
//! A failed package never stays under the packages root looking healthy.
//! The handler moves the install directory into the failures root
//! (mirroring its relative path) and, when a rollback snapshot exists,
//! offers to restore it. User-cancelled installers (1602/15608) roll back
//! without prompting.
//!
//! The install root and the packages root themselves are never moved or
//! deleted; hitting either aborts with a manual-cleanup directive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::exit;
use crate::layout::InstallLayout;
use crate::results::{MessageKind, PackageResult};
use crate::services::InteractivePrompt;

/// What the handler is allowed to do for this failure
#[derive(Debug, Clone, Copy)]
pub struct FailureOptions {
    /// Move the install directory into the failures root
    pub quarantine: bool,
    /// Restore a backup snapshot into the packages root
    pub rollback: bool,
}

pub fn handle_failure(
    result: &mut PackageResult,
    config: &Configuration,
    layout: &InstallLayout,
    prompt: &dyn InteractivePrompt,
    options: FailureOptions,
) {
    if result.exit_code == 0 {
        result.exit_code = exit::FAILURE;
    }

    for message in &result.messages {
        if message.kind == MessageKind::Error {
            error!("{}: {}", result.name, message.text);
        }
    }

    let location = result
        .install_location
        .clone()
        .unwrap_or_else(|| layout.package_path(&result.name));

    if layout.is_protected_root(&location) {
        error!(
            "'{}' points at '{}'; refusing to move or roll back. Clean up manually.",
            result.name,
            location.display()
        );
        return;
    }

    let relative = location
        .strip_prefix(layout.packages_root())
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(&result.name));

    if options.quarantine {
        quarantine(&location, &layout.package_failures_root().join(&relative));
    }

    if options.rollback {
        attempt_rollback(result, config, layout, prompt, &relative);
    }

    // Whatever happened above, nothing may linger under the backup root
    // for this package.
    clear_backup(layout, &result.name, &relative);
}

fn quarantine(location: &Path, quarantine_path: &Path) {
    if !location.exists() {
        return;
    }
    if let Some(parent) = quarantine_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Could not create {}: {}", parent.display(), e);
            return;
        }
    }
    if quarantine_path.exists() {
        if let Err(e) = fs::remove_dir_all(quarantine_path) {
            warn!(
                "Could not clear old quarantine {}: {}",
                quarantine_path.display(),
                e
            );
        }
    }
    match move_directory(location, quarantine_path) {
        Ok(()) => info!(
            "Moved failed install to {}",
            quarantine_path.display()
        ),
        Err(e) => warn!(
            "Could not quarantine {}: {}",
            location.display(),
            e
        ),
    }
}

fn attempt_rollback(
    result: &mut PackageResult,
    config: &Configuration,
    layout: &InstallLayout,
    prompt: &dyn InteractivePrompt,
    relative: &Path,
) {
    let Some(backup) = find_backup(layout, &result.name, relative) else {
        debug!("No rollback snapshot for '{}'", result.name);
        return;
    };

    // Defense against escapes: the chosen path must live strictly below
    // the backup root.
    if !backup.starts_with(layout.package_backup_root()) || backup == layout.package_backup_root() {
        warn!(
            "Refusing rollback from suspicious path {}",
            backup.display()
        );
        return;
    }

    let confirmed = if exit::is_user_cancelled(result.exit_code) {
        true
    } else if config.prompt_for_confirmation {
        matches!(
            prompt
                .prompt_for_confirmation(
                    &format!(
                        "Failure while running '{}'. Roll back the previous version?",
                        result.name
                    ),
                    &["yes", "no"],
                    "no",
                )
                .as_deref(),
            Ok("yes")
        )
    } else {
        true
    };
    if !confirmed {
        info!("Rollback of '{}' declined", result.name);
        return;
    }

    let restore_to = layout.packages_root().join(relative);
    if restore_to.exists() {
        if let Err(e) = fs::remove_dir_all(&restore_to) {
            warn!("Could not clear {}: {}", restore_to.display(), e);
            return;
        }
    }
    if let Some(parent) = restore_to.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Could not create {}: {}", parent.display(), e);
            return;
        }
    }
    match move_directory(&backup, &restore_to) {
        Ok(()) => {
            result.note(format!("Rolled back previous version of '{}'", result.name));
            info!("Restored {}", restore_to.display());
        }
        Err(e) => warn!("Rollback of '{}' failed: {}", result.name, e),
    }
}

/// Prefer the mirror of the package's relative path; otherwise the
/// lexicographically greatest `<name>*` sibling under the backup root.
fn find_backup(layout: &InstallLayout, name: &str, relative: &Path) -> Option<PathBuf> {
    let mirror = layout.package_backup_root().join(relative);
    if mirror.exists() {
        return Some(mirror);
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(layout.package_backup_root())
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(name))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates.pop()
}

fn clear_backup(layout: &InstallLayout, name: &str, relative: &Path) {
    for lingering in [
        layout.package_backup_root().join(relative),
        layout.package_backup_root().join(name),
    ] {
        if lingering.exists() {
            if let Err(e) = fs::remove_dir_all(&lingering) {
                warn!("Could not clear rollback dir {}: {}", lingering.display(), e);
            }
        }
    }
}

/// Rename, falling back to copy + delete for cross-filesystem moves
fn move_directory(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_tree(src, dst)?;
            fs::remove_dir_all(src)
        }
    }
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
