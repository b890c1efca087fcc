// src/sideload.rs

//! Sideload staging for extension, template, and hook packages
//!
//! Packages whose name ends in a reserved suffix do not deliver a tool;
//! their payload is staged into a sibling root (`extensions/`,
//! `templates/`, `hooks/`) under a slug computed by stripping the suffix.
//! `acme.extension` and `acme.extensions` map to the same slug, so removal
//! always clears both spellings.
//!
//! Extension files may be loaded by the host process, so replacing them
//! uses a rename dance: stale `*.dll.old` files are deleted, live `*.dll`
//! files are renamed aside, and only then is everything else removed.
//! Every step tolerates per-file failures.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::error::Result;
use crate::layout::InstallLayout;
use crate::results::PackageResult;
use crate::services::{env_vars, ProcessState};

pub const EXTENSION_SUFFIXES: [&str; 2] = [".extension", ".extensions"];
pub const TEMPLATE_SUFFIX: &str = ".template";
pub const HOOK_SUFFIX: &str = ".hook";

/// Sideload family a package name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideloadKind {
    Extension,
    Template,
    Hook,
}

/// Detect a sideload package and compute its slug
pub fn detect(name: &str) -> Option<(SideloadKind, String)> {
    let lower = name.to_lowercase();
    for suffix in EXTENSION_SUFFIXES {
        if lower.ends_with(suffix) {
            return Some((
                SideloadKind::Extension,
                name[..name.len() - suffix.len()].to_string(),
            ));
        }
    }
    if lower.ends_with(TEMPLATE_SUFFIX) {
        return Some((
            SideloadKind::Template,
            name[..name.len() - TEMPLATE_SUFFIX.len()].to_string(),
        ));
    }
    if lower.ends_with(HOOK_SUFFIX) {
        return Some((
            SideloadKind::Hook,
            name[..name.len() - HOOK_SUFFIX.len()].to_string(),
        ));
    }
    None
}

pub fn is_sideload(name: &str) -> bool {
    detect(name).is_some()
}

/// Stage (or on uninstall, remove) a sideload package's payload.
///
/// Per-file problems are logged and skipped; this never fails the
/// package.
pub fn handle_sideload(
    result: &mut PackageResult,
    config: &Configuration,
    layout: &InstallLayout,
    process: &dyn ProcessState,
) -> Result<()> {
    let Some((kind, slug)) = detect(&result.name) else {
        return Ok(());
    };

    let dst_root = match kind {
        SideloadKind::Extension => layout.extensions_root().join(&slug),
        SideloadKind::Template => layout.templates_root().join(&slug),
        SideloadKind::Hook => layout.hooks_root().join(&slug),
    };

    if config.command_name == "uninstall" {
        remove_directory(&dst_root);
        if kind == SideloadKind::Extension {
            for suffix in EXTENSION_SUFFIXES {
                remove_directory(&suffixed_sibling(&dst_root, suffix));
            }
        }
        result.note(format!("Uninstalled {}", slug));
        return Ok(());
    }

    remove_destinations(kind, &dst_root);

    let Some(install_location) = result.install_location.clone() else {
        return Ok(());
    };
    let payload_dir = match kind {
        SideloadKind::Extension => install_location.join("extensions"),
        SideloadKind::Template => install_location.join("templates"),
        SideloadKind::Hook => install_location.join("hook"),
    };
    let src = if payload_dir.is_dir() {
        payload_dir
    } else {
        install_location
    };

    copy_directory(&src, &dst_root);
    if kind == SideloadKind::Template {
        activate_template_manifests(&dst_root);
    }

    process.set_env_var(
        env_vars::PACKAGE_INSTALL_LOCATION,
        &dst_root.to_string_lossy(),
    );
    result.note(format!("Installed {} to {}", slug, dst_root.display()));
    Ok(())
}

/// Clear the staged destination(s) ahead of a fresh copy; extensions use
/// the locked-file rename dance and also clear their suffixed spellings.
fn remove_destinations(kind: SideloadKind, dst_root: &Path) {
    match kind {
        SideloadKind::Extension => {
            clear_extension_directory(dst_root);
            for suffix in EXTENSION_SUFFIXES {
                let variant = suffixed_sibling(dst_root, suffix);
                remove_directory(&variant);
            }
        }
        SideloadKind::Template | SideloadKind::Hook => remove_directory(dst_root),
    }
}

fn suffixed_sibling(dst_root: &Path, suffix: &str) -> PathBuf {
    let mut name = dst_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(suffix);
    dst_root.with_file_name(name)
}

fn remove_directory(dir: &Path) {
    if !dir.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!("Could not remove {}: {}", dir.display(), e);
    }
}

/// Deletion protocol for a directory whose dlls may be loaded:
/// delete stale `*.dll.old`, rename live `*.dll` aside, delete the rest.
fn clear_extension_directory(dir: &Path) {
    if !dir.exists() {
        return;
    }

    for_each_file(dir, &mut |path| {
        if path.to_string_lossy().to_lowercase().ends_with(".dll.old") {
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not delete stale {}: {}", path.display(), e);
            }
        }
    });

    for_each_file(dir, &mut |path| {
        if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("dll"))
        {
            let aside = PathBuf::from(format!("{}.old", path.display()));
            if let Err(e) = fs::rename(path, &aside) {
                warn!("Could not rename {} aside: {}", path.display(), e);
            }
        }
    });

    for_each_file(dir, &mut |path| {
        if !path.to_string_lossy().to_lowercase().ends_with(".dll.old") {
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not delete {}: {}", path.display(), e);
            }
        }
    });
}

fn for_each_file(dir: &Path, op: &mut dyn FnMut(&Path)) {
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            op(entry.path());
        }
    }
}

/// Copy a tree, tolerating individual file failures
fn copy_directory(src: &Path, dst: &Path) {
    if let Err(e) = fs::create_dir_all(dst) {
        warn!("Could not create {}: {}", dst.display(), e);
        return;
    }
    for entry in walkdir::WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            if let Err(e) = fs::create_dir_all(&target) {
                warn!("Could not create {}: {}", target.display(), e);
            }
        } else if let Err(e) = fs::copy(entry.path(), &target) {
            warn!(
                "Could not copy {} to {}: {}",
                entry.path().display(),
                target.display(),
                e
            );
        }
    }
    debug!("Staged {} into {}", src.display(), dst.display());
}

/// `*.nuspec.template` files become live `*.nuspec` manifests once staged
fn activate_template_manifests(dir: &Path) {
    let mut renames = Vec::new();
    for_each_file(dir, &mut |path| {
        let name = path.to_string_lossy().into_owned();
        if name.to_lowercase().ends_with(".nuspec.template") {
            renames.push((
                path.to_path_buf(),
                PathBuf::from(&name[..name.len() - ".template".len()]),
            ));
        }
    });
    for (from, to) in renames {
        if let Err(e) = fs::rename(&from, &to) {
            warn!("Could not activate {}: {}", from.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ProcessState, SystemProcessState};
    use tempfile::TempDir;

    fn harness() -> (TempDir, InstallLayout) {
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path().to_path_buf());
        layout.ensure_base_dirs().unwrap();
        (temp, layout)
    }

    fn sideload_result(layout: &InstallLayout, name: &str) -> PackageResult {
        let mut result = PackageResult::new(name, "1.0.0");
        let location = layout.package_path(name);
        fs::create_dir_all(&location).unwrap();
        result.install_location = Some(location);
        result
    }

    #[test]
    fn test_detect_slugs() {
        assert_eq!(
            detect("acme.extension"),
            Some((SideloadKind::Extension, "acme".to_string()))
        );
        assert_eq!(
            detect("acme.extensions"),
            Some((SideloadKind::Extension, "acme".to_string()))
        );
        assert_eq!(
            detect("starter.template"),
            Some((SideloadKind::Template, "starter".to_string()))
        );
        assert_eq!(detect("audit.hook"), Some((SideloadKind::Hook, "audit".to_string())));
        assert_eq!(detect("vim"), None);
    }

    #[test]
    fn test_extension_staged_from_payload_dir() {
        let (_temp, layout) = harness();
        let mut result = sideload_result(&layout, "acme.extension");
        let payload = result.install_location.clone().unwrap().join("extensions");
        fs::create_dir_all(&payload).unwrap();
        fs::write(payload.join("acme.dll"), b"new").unwrap();

        let config = Configuration {
            command_name: "install".to_string(),
            ..Default::default()
        };
        let process = SystemProcessState::new();
        handle_sideload(&mut result, &config, &layout, &process).unwrap();

        let staged = layout.extensions_root().join("acme/acme.dll");
        assert_eq!(fs::read(staged).unwrap(), b"new");
        assert_eq!(
            process.env_var(env_vars::PACKAGE_INSTALL_LOCATION).unwrap(),
            layout.extensions_root().join("acme").to_string_lossy()
        );
    }

    #[test]
    fn test_existing_dll_renamed_aside() {
        let (_temp, layout) = harness();
        let dst = layout.extensions_root().join("acme");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("acme.dll"), b"old").unwrap();
        fs::write(dst.join("stale.dll.old"), b"stale").unwrap();
        fs::write(dst.join("notes.txt"), b"x").unwrap();

        let mut result = sideload_result(&layout, "acme.extension");
        let payload = result.install_location.clone().unwrap().join("extensions");
        fs::create_dir_all(&payload).unwrap();
        fs::write(payload.join("acme.dll"), b"new").unwrap();

        let config = Configuration {
            command_name: "upgrade".to_string(),
            ..Default::default()
        };
        handle_sideload(&mut result, &config, &layout, &SystemProcessState::new()).unwrap();

        assert_eq!(fs::read(dst.join("acme.dll")).unwrap(), b"new");
        assert_eq!(fs::read(dst.join("acme.dll.old")).unwrap(), b"old");
        assert!(!dst.join("stale.dll.old").exists());
        assert!(!dst.join("notes.txt").exists());
    }

    #[test]
    fn test_uninstall_clears_both_extension_spellings() {
        let (_temp, layout) = harness();
        for dir in ["acme", "acme.extension", "acme.extensions"] {
            let path = layout.extensions_root().join(dir);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("f.txt"), b"x").unwrap();
        }

        let mut result = PackageResult::new("acme.extensions", "1.0.0");
        let config = Configuration {
            command_name: "uninstall".to_string(),
            ..Default::default()
        };
        handle_sideload(&mut result, &config, &layout, &SystemProcessState::new()).unwrap();

        assert!(!layout.extensions_root().join("acme").exists());
        assert!(!layout.extensions_root().join("acme.extension").exists());
        assert!(!layout.extensions_root().join("acme.extensions").exists());
        assert!(result
            .messages
            .iter()
            .any(|m| m.text.contains("Uninstalled acme")));
    }

    #[test]
    fn test_template_manifests_are_activated() {
        let (_temp, layout) = harness();
        let mut result = sideload_result(&layout, "starter.template");
        let payload = result.install_location.clone().unwrap().join("templates");
        fs::create_dir_all(&payload).unwrap();
        fs::write(payload.join("starter.nuspec.template"), b"<spec/>").unwrap();
        fs::write(payload.join("tools.ps1"), b"").unwrap();

        let config = Configuration {
            command_name: "install".to_string(),
            ..Default::default()
        };
        handle_sideload(&mut result, &config, &layout, &SystemProcessState::new()).unwrap();

        let dst = layout.templates_root().join("starter");
        assert!(dst.join("starter.nuspec").is_file());
        assert!(!dst.join("starter.nuspec.template").exists());
        assert!(dst.join("tools.ps1").is_file());
    }

    #[test]
    fn test_hook_staged_from_package_root_when_no_payload_dir() {
        let (_temp, layout) = harness();
        let mut result = sideload_result(&layout, "audit.hook");
        let location = result.install_location.clone().unwrap();
        fs::write(location.join("pre-install.ps1"), b"").unwrap();

        let config = Configuration {
            command_name: "install".to_string(),
            ..Default::default()
        };
        handle_sideload(&mut result, &config, &layout, &SystemProcessState::new()).unwrap();

        assert!(layout
            .hooks_root()
            .join("audit/pre-install.ps1")
            .is_file());
    }
}
