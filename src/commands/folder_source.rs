// src/commands/folder_source.rs
//! Folder-backed source runner
//!
//! Materializes packages from a plain directory source: `<source>/<name>/`
//! holds the package payload, with an optional `VERSION` file. No archive
//! parsing, no wire protocol; this is the runner used for local sources
//! and for exercising the orchestration pipeline end to end.
//!
//! Before modifying an installed package the current tree is snapshotted
//! into the backup root so the failure handler can roll back.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use chocolatier::sources::ResultSink;
use chocolatier::{Configuration, Error, PackageResult, Result, SourceRunner};

pub struct FolderSourceRunner {
    packages_root: PathBuf,
}

impl FolderSourceRunner {
    pub fn new(packages_root: PathBuf) -> Self {
        Self { packages_root }
    }

    fn backup_root(&self) -> PathBuf {
        self.packages_root
            .parent()
            .map(|p| p.join("lib-bkp"))
            .unwrap_or_else(|| PathBuf::from("lib-bkp"))
    }

    fn source_package_dir(&self, config: &Configuration, name: &str) -> PathBuf {
        Path::new(&config.source).join(name)
    }

    fn installed_dir(&self, name: &str) -> PathBuf {
        self.packages_root.join(name)
    }

    fn materialize(
        &self,
        config: &Configuration,
        name: &str,
        upgrading: bool,
    ) -> PackageResult {
        let source_dir = self.source_package_dir(config, name);
        let mut result = PackageResult::new(name, read_version(&source_dir, config));

        if !source_dir.is_dir() {
            result.fail(format!(
                "'{}' was not found in source '{}'",
                name, config.source
            ));
            return result;
        }

        let target = self.installed_dir(name);
        if target.exists() && !upgrading && !config.force {
            result.warn(format!(
                "'{}' is already installed; use --force to reinstall",
                name
            ));
            result.install_location = Some(target);
            result.inconclusive = true;
            return result;
        }

        if target.exists() {
            if let Err(e) = self.snapshot_for_rollback(name, &target) {
                warn!("Could not snapshot '{}' for rollback: {}", name, e);
            }
            if let Err(e) = fs::remove_dir_all(&target) {
                result.fail(format!("could not clear '{}': {}", target.display(), e));
                return result;
            }
        }

        if let Err(e) = copy_tree(&source_dir, &target) {
            result.fail(format!(
                "could not materialize '{}' into '{}': {}",
                name,
                target.display(),
                e
            ));
            return result;
        }

        result.install_location = Some(target);
        result
    }

    fn snapshot_for_rollback(&self, name: &str, installed: &Path) -> io::Result<()> {
        let backup = self.backup_root().join(name);
        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }
        copy_tree(installed, &backup)
    }
}

impl SourceRunner for FolderSourceRunner {
    fn source_type(&self) -> &'static str {
        "normal"
    }

    fn ensure_source_app_installed(&self, _config: &Configuration) -> Result<()> {
        Ok(())
    }

    fn count_run(&self, config: &Configuration) -> Result<usize> {
        Ok(self.list_run(config)?.len())
    }

    fn list_run(&self, config: &Configuration) -> Result<Vec<PackageResult>> {
        let filter = config.package_names.trim().to_lowercase();
        let mut results = Vec::new();
        let entries = match fs::read_dir(&self.packages_root) {
            Ok(entries) => entries,
            Err(_) => return Ok(results),
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !filter.is_empty() && !name.to_lowercase().contains(&filter) {
                continue;
            }
            let mut result =
                PackageResult::new(&name, read_version(&entry.path(), &Configuration::default()));
            result.install_location = Some(entry.path());
            results.push(result);
        }
        Ok(results)
    }

    fn list_noop(&self, _config: &Configuration) -> Result<()> {
        info!("Would have listed installed packages");
        Ok(())
    }

    fn install_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>> {
        let mut results = BTreeMap::new();
        for name in config.split_package_names() {
            let mut result = self.materialize(config, &name, false);
            on_result(&mut result, config)?;
            results.insert(name, result);
        }
        Ok(results)
    }

    fn install_noop(&self, config: &Configuration) -> Result<()> {
        for name in config.split_package_names() {
            info!(
                "Would have installed '{}' from '{}'",
                name, config.source
            );
        }
        Ok(())
    }

    fn upgrade_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
        before_modify: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>> {
        let mut results = BTreeMap::new();
        for name in config.split_package_names() {
            if self.installed_dir(&name).exists() {
                let mut current = PackageResult::new(&name, "");
                current.install_location = Some(self.installed_dir(&name));
                before_modify(&mut current, config)?;
            }
            let mut result = self.materialize(config, &name, true);
            on_result(&mut result, config)?;
            results.insert(name, result);
        }
        Ok(results)
    }

    fn upgrade_noop(&self, config: &Configuration) -> Result<()> {
        for name in config.split_package_names() {
            info!("Would have upgraded '{}'", name);
        }
        Ok(())
    }

    fn uninstall_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
        before_modify: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>> {
        let mut results = BTreeMap::new();
        for name in config.split_package_names() {
            let installed = self.installed_dir(&name);
            let mut result = PackageResult::new(
                &name,
                read_version(&installed, &Configuration::default()),
            );
            result.install_location = Some(installed.clone());

            if !installed.exists() {
                result.fail(format!("'{}' is not installed", name));
            } else {
                before_modify(&mut result, config)?;
            }

            match on_result(&mut result, config) {
                Ok(()) => {
                    // Pipeline succeeded; the package's files go away now.
                    if installed.exists() {
                        if let Err(e) = fs::remove_dir_all(&installed) {
                            warn!("Could not remove {}: {}", installed.display(), e);
                        }
                    }
                }
                // A failed uninstall halts this package's removal but not
                // the rest of the command.
                Err(Error::OperationFailed(reason)) => {
                    debug!("Keeping files for '{}': {}", name, reason);
                }
                Err(e) => return Err(e),
            }
            results.insert(name, result);
        }
        Ok(results)
    }

    fn uninstall_noop(&self, config: &Configuration) -> Result<()> {
        for name in config.split_package_names() {
            info!("Would have uninstalled '{}'", name);
        }
        Ok(())
    }

    fn get_outdated(&self, config: &Configuration) -> Result<BTreeMap<String, PackageResult>> {
        let mut results = BTreeMap::new();
        for installed in self.list_run(&Configuration::default())? {
            let source_dir = self.source_package_dir(config, &installed.name);
            if !source_dir.is_dir() {
                continue;
            }
            let available = read_version(&source_dir, config);
            if available != installed.version {
                let mut result = PackageResult::new(&installed.name, available);
                result.note(format!("installed {}", installed.version));
                results.insert(installed.name.clone(), result);
            }
        }
        Ok(results)
    }

    fn remove_rollback_directory_if_exists(&self, name: &str) {
        let backup = self.backup_root().join(name);
        if backup.exists() {
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!("Could not remove rollback dir {}: {}", backup.display(), e);
            }
        }
    }
}

/// `VERSION` file beside the payload wins; the configured version is the
/// fallback.
fn read_version(package_dir: &Path, config: &Configuration) -> String {
    if let Ok(version) = fs::read_to_string(package_dir.join("VERSION")) {
        let version = version.trim();
        if !version.is_empty() {
            return version.to_string();
        }
    }
    config
        .version
        .clone()
        .unwrap_or_else(|| "0.0.0".to_string())
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

#[cfg(test)]
mod tests {
    use super::*;
    use chocolatier::InstallLayout;
    use tempfile::TempDir;

    fn harness() -> (TempDir, InstallLayout, FolderSourceRunner, Configuration) {
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path().join("root"));
        layout.ensure_base_dirs().unwrap();

        let source = temp.path().join("feed");
        fs::create_dir_all(source.join("vim")).unwrap();
        fs::write(source.join("vim/VERSION"), "9.1.0").unwrap();
        fs::write(source.join("vim/vim.txt"), b"editor").unwrap();

        let runner = FolderSourceRunner::new(layout.packages_root());
        let config = Configuration {
            source: source.to_string_lossy().into_owned(),
            ..Default::default()
        };
        (temp, layout, runner, config)
    }

    #[test]
    fn test_install_materializes_package() {
        let (_temp, layout, runner, mut config) = harness();
        config.package_names = "vim".to_string();

        let mut sink = |_: &mut PackageResult, _: &Configuration| Ok(());
        let results = runner.install_run(&config, &mut sink).unwrap();

        let result = &results["vim"];
        assert!(result.success);
        assert_eq!(result.version, "9.1.0");
        assert!(layout.packages_root().join("vim/vim.txt").is_file());
    }

    #[test]
    fn test_install_missing_package_fails() {
        let (_temp, _layout, runner, mut config) = harness();
        config.package_names = "ripgrep".to_string();

        let mut sink = |_: &mut PackageResult, _: &Configuration| Ok(());
        let results = runner.install_run(&config, &mut sink).unwrap();
        assert!(!results["ripgrep"].success);
    }

    #[test]
    fn test_upgrade_snapshots_rollback() {
        let (_temp, layout, runner, mut config) = harness();
        config.package_names = "vim".to_string();

        let mut sink = |_: &mut PackageResult, _: &Configuration| Ok(());
        runner.install_run(&config, &mut sink).unwrap();

        let mut sink = |_: &mut PackageResult, _: &Configuration| Ok(());
        let mut before = |_: &mut PackageResult, _: &Configuration| Ok(());
        runner.upgrade_run(&config, &mut sink, &mut before).unwrap();

        assert!(layout
            .package_backup_root()
            .join("vim/vim.txt")
            .is_file());
    }

    #[test]
    fn test_failed_uninstall_keeps_files() {
        let (_temp, layout, runner, mut config) = harness();
        config.package_names = "vim".to_string();

        let mut sink = |_: &mut PackageResult, _: &Configuration| Ok(());
        runner.install_run(&config, &mut sink).unwrap();

        let mut sink = |_: &mut PackageResult, _: &Configuration| {
            Err(Error::OperationFailed("script exited 1603".to_string()))
        };
        let mut before = |_: &mut PackageResult, _: &Configuration| Ok(());
        runner
            .uninstall_run(&config, &mut sink, &mut before)
            .unwrap();

        assert!(layout.packages_root().join("vim/vim.txt").is_file());
    }

    #[test]
    fn test_outdated_compares_versions() {
        let (temp, _layout, runner, mut config) = harness();
        config.package_names = "vim".to_string();

        let mut sink = |_: &mut PackageResult, _: &Configuration| Ok(());
        runner.install_run(&config, &mut sink).unwrap();

        fs::write(temp.path().join("feed/vim/VERSION"), "9.2.0").unwrap();
        let outdated = runner.get_outdated(&config).unwrap();
        assert_eq!(outdated["vim"].version, "9.2.0");
    }
}
