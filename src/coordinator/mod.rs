// src/coordinator/mod.rs

//! Operation coordinator
//!
//! The coordinator mediates between commands and source runners: it
//! expands the requested package list into per-package configurations,
//! dispatches each to the matching runner, and runs the
//! post-materialization pipeline for every package result the runner
//! hands back (scripts, state snapshots and diffs, shims, sideloads,
//! captures, pending markers, failure handling).
//!
//! One command invocation is strictly single-threaded: per-package
//! operations run in order so before/after snapshots stay meaningful. The
//! result aggregate is keyed by package name and written serially from
//! this thread; shared references may read it concurrently.
//!
//! Fatal conditions (reboot-with-exit, stop-on-first-failure, validator
//! rejections, lock failures) propagate out of [`Orchestrator::run`]'s
//! inner drivers; the outer scope still produces the summary and fixes
//! the process exit code before re-raising.

pub mod failure;
pub mod report;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{expand, Configuration};
use crate::error::{Error, Result};
use crate::exit;
use crate::info::{JsonPackageInfoStore, PackageInfoStore, PackageInformation};
use crate::layout::InstallLayout;
use crate::notify::{self, Randomizer, ThreadRandomizer};
use crate::pending::{self, PendingLocks, PendingScope};
use crate::results::PackageResult;
use crate::services::{
    env_vars, ArgumentCipher, AutoUninstallerService, ConfigTransformService, ConsolePrompt,
    DefaultAutoUninstaller, DefaultFilesService, EmptyRegistry, Event, EventBus, FilesService,
    InteractivePrompt, ListDocumentParser, NoopConfigTransforms, NoopShims, PowerShellHost,
    ProcessState, QuickXmlListParser, RegistryService, ScriptingHost, ShimService,
    SystemProcessState, TracingEventBus, XorArgumentCipher,
};
use crate::sideload;
use crate::snapshot::{diff_env, diff_installers, log_env_changes, RegistrySnapshot, Snapshotter};
use crate::sources::SourceDispatcher;
use crate::validate;

use failure::FailureOptions;

/// Commands the orchestrator fronts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Install,
    Upgrade,
    Uninstall,
    List,
    Outdated,
    Pack,
    Push,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Upgrade => "upgrade",
            Self::Uninstall => "uninstall",
            Self::List => "list",
            Self::Outdated => "outdated",
            Self::Pack => "pack",
            Self::Push => "push",
        }
    }
}

/// Collaborators the coordinator drives
pub struct Services {
    pub scripts: Box<dyn ScriptingHost>,
    pub shims: Box<dyn ShimService>,
    pub files: Box<dyn FilesService>,
    pub transforms: Box<dyn ConfigTransformService>,
    pub registry: Box<dyn RegistryService>,
    pub info: Box<dyn PackageInfoStore>,
    pub auto_uninstaller: Box<dyn AutoUninstallerService>,
    pub list_documents: Box<dyn ListDocumentParser>,
    pub prompt: Box<dyn InteractivePrompt>,
    pub events: Box<dyn EventBus>,
    pub process: Box<dyn ProcessState>,
    pub cipher: Box<dyn ArgumentCipher>,
    pub randomizer: Mutex<Box<dyn Randomizer>>,
}

impl Services {
    /// Production wiring for this host
    pub fn platform_defaults(layout: &InstallLayout) -> Self {
        Self {
            scripts: Box::new(PowerShellHost::new()),
            shims: Box::new(NoopShims),
            files: Box::new(DefaultFilesService),
            transforms: Box::new(NoopConfigTransforms),
            registry: Box::new(EmptyRegistry),
            info: Box::new(JsonPackageInfoStore::new(layout.package_info_root())),
            auto_uninstaller: Box::new(DefaultAutoUninstaller),
            list_documents: Box::new(QuickXmlListParser),
            prompt: Box::new(ConsolePrompt),
            events: Box::new(TracingEventBus),
            process: Box::new(SystemProcessState::new()),
            cipher: Box::new(XorArgumentCipher::default()),
            randomizer: Mutex::new(Box::new(ThreadRandomizer)),
        }
    }
}

pub struct Orchestrator {
    layout: InstallLayout,
    dispatcher: SourceDispatcher,
    services: Services,
    pending: PendingLocks,
}

impl Orchestrator {
    pub fn new(layout: InstallLayout, dispatcher: SourceDispatcher, services: Services) -> Self {
        Self {
            layout,
            dispatcher,
            services,
            pending: PendingLocks::new(),
        }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Process state, exposed so the entry point can read the final exit
    /// code
    pub fn process(&self) -> &dyn ProcessState {
        self.services.process.as_ref()
    }

    /// Run one command. The summary and exit-code fixup always happen,
    /// even when a fatal condition aborts the command mid-way.
    pub fn run(
        &self,
        command: CommandKind,
        config: &Configuration,
    ) -> Result<BTreeMap<String, PackageResult>> {
        let mut config = config.clone();
        config.command_name = command.as_str().to_string();

        let mut results = BTreeMap::new();
        let outcome = self.run_command(command, &config, &mut results);

        if matches!(
            command,
            CommandKind::Install | CommandKind::Upgrade | CommandKind::Uninstall
        ) {
            let failed = report::summarize(&results, &config);
            if failed > 0 && self.services.process.exit_code() == 0 {
                self.services.process.set_exit_code(exit::FAILURE);
            }
            let mut rng = self.services.randomizer.lock().expect("randomizer poisoned");
            notify::maybe_notify(&config, rng.as_mut(), None);
        }

        match outcome {
            Ok(()) => Ok(results),
            Err(e) => {
                if self.services.process.exit_code() == 0 {
                    self.services.process.set_exit_code(exit::FAILURE);
                }
                Err(e)
            }
        }
    }

    fn run_command(
        &self,
        command: CommandKind,
        config: &Configuration,
        results: &mut BTreeMap<String, PackageResult>,
    ) -> Result<()> {
        match command {
            CommandKind::Install => self.run_install(config, results),
            CommandKind::Upgrade => self.run_upgrade(config, results),
            CommandKind::Uninstall => self.run_uninstall(config, results),
            CommandKind::List => self.run_list(config, results),
            CommandKind::Outdated => self.run_outdated(config, results),
            CommandKind::Pack => self.run_source_tool(config, CommandKind::Pack),
            CommandKind::Push => self.run_source_tool(config, CommandKind::Push),
        }
    }

    fn run_install(
        &self,
        config: &Configuration,
        results: &mut BTreeMap<String, PackageResult>,
    ) -> Result<()> {
        validate::validate_package_names(config)?;
        if config.split_package_names().is_empty() {
            return Err(Error::InvalidArguments(
                "No packages given; pass one or more package names".to_string(),
            ));
        }
        self.require_source(config)?;
        warn_on_side_by_side(config);

        for package_config in expand(config, self.services.list_documents.as_ref(), results)? {
            if package_config.split_package_names().is_empty() {
                continue;
            }
            let Some(runner) = self.dispatcher.resolve(package_config.source_type.as_str())
            else {
                continue;
            };
            if package_config.noop {
                runner.install_noop(&package_config)?;
                continue;
            }

            let map = {
                let mut sink = |r: &mut PackageResult, c: &Configuration| {
                    let outcome = self.handle_package_result(r, c);
                    results.insert(r.name.clone(), r.clone());
                    outcome
                };
                runner.install_run(&package_config, &mut sink)?
            };
            results.extend(map);

            if package_config.features.stop_on_first_package_failure
                && results.values().any(|r| !r.success)
            {
                return Err(Error::OperationFailed(
                    "Stopping on first package failure".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn run_upgrade(
        &self,
        config: &Configuration,
        results: &mut BTreeMap<String, PackageResult>,
    ) -> Result<()> {
        validate::validate_package_names(config)?;
        self.reject_list_documents(config)?;
        self.require_source(config)?;
        warn_on_side_by_side(config);

        let Some(runner) = self.dispatcher.resolve(config.source_type.as_str()) else {
            return Ok(());
        };
        if config.noop {
            return runner.upgrade_noop(config);
        }

        let map = {
            let mut sink = |r: &mut PackageResult, c: &Configuration| {
                let outcome = self.handle_package_result(r, c);
                results.insert(r.name.clone(), r.clone());
                outcome
            };
            let mut before = |r: &mut PackageResult, c: &Configuration| {
                self.handle_before_modify(r, c)
            };
            runner.upgrade_run(config, &mut sink, &mut before)?
        };
        results.extend(map);
        Ok(())
    }

    fn run_uninstall(
        &self,
        config: &Configuration,
        results: &mut BTreeMap<String, PackageResult>,
    ) -> Result<()> {
        validate::validate_package_names(config)?;
        self.reject_list_documents(config)?;

        let Some(runner) = self.dispatcher.resolve(config.source_type.as_str()) else {
            return Ok(());
        };
        if config.noop {
            return runner.uninstall_noop(config);
        }

        let map = {
            let mut sink = |r: &mut PackageResult, c: &Configuration| {
                let outcome = self.handle_uninstall_result(r, c);
                results.insert(r.name.clone(), r.clone());
                outcome
            };
            let mut before = |r: &mut PackageResult, c: &Configuration| {
                self.handle_before_modify(r, c)
            };
            runner.uninstall_run(config, &mut sink, &mut before)?
        };
        results.extend(map);
        Ok(())
    }

    fn run_list(
        &self,
        config: &Configuration,
        results: &mut BTreeMap<String, PackageResult>,
    ) -> Result<()> {
        let Some(runner) = self.dispatcher.resolve(config.source_type.as_str()) else {
            return Ok(());
        };
        if config.noop {
            return runner.list_noop(config);
        }
        for result in runner.list_run(config)? {
            results.insert(result.name.clone(), result);
        }
        Ok(())
    }

    fn run_outdated(
        &self,
        config: &Configuration,
        results: &mut BTreeMap<String, PackageResult>,
    ) -> Result<()> {
        let Some(runner) = self.dispatcher.resolve(config.source_type.as_str()) else {
            return Ok(());
        };
        results.extend(runner.get_outdated(config)?);

        // Pinned or otherwise skipped packages come back inconclusive and
        // do not drive the exit code.
        let actionable = results
            .values()
            .filter(|r| r.success && !r.inconclusive)
            .count();
        info!(
            "Found {} outdated package(s) ({} reported but skipped).",
            actionable,
            results.len() - actionable
        );
        if actionable > 0
            && config.features.use_enhanced_exit_codes
            && self.services.process.exit_code() == 0
        {
            self.services
                .process
                .set_exit_code(exit::OUTDATED_PACKAGES_FOUND);
        }
        Ok(())
    }

    fn run_source_tool(&self, config: &Configuration, command: CommandKind) -> Result<()> {
        let Some(runner) = self.dispatcher.resolve(config.source_type.as_str()) else {
            return Ok(());
        };
        runner.ensure_source_app_installed(config)?;
        match command {
            CommandKind::Pack => runner.pack_run(config),
            CommandKind::Push => runner.push_run(config),
            _ => Ok(()),
        }
    }

    // -----------------------------------------------------------------
    // Post-materialization pipelines
    // -----------------------------------------------------------------

    /// Install/upgrade post-pipeline, invoked from within the source
    /// runner for each materialized package. Step order is significant.
    pub fn handle_package_result(
        &self,
        result: &mut PackageResult,
        config: &Configuration,
    ) -> Result<()> {
        self.services.process.reset_environment(config);

        let _pending_scope = PendingScope::new(&self.pending, result.name.clone());
        pending::set_pending(result, config, &self.layout, &self.pending)?;

        self.log_banner(result, config);

        let mut info = self.load_info(result);
        if config.allow_multiple_versions {
            info.is_side_by_side = true;
        }

        let windows = config.machine.is_windows;
        let mut installer_diff: Option<RegistrySnapshot> = None;

        if result.success && windows && !config.skip_package_install_provider {
            let snapshotter = Snapshotter::new(self.services.registry.as_ref(), windows);
            let installers_before = snapshotter.snapshot_installers();
            let env_before = snapshotter.snapshot_env();

            let ran = match self.services.scripts.install(config, result) {
                Ok(ran) => ran,
                Err(e) => {
                    result.fail(format!("Install script failed to run: {}", e));
                    false
                }
            };
            if ran {
                self.cancel_pending_reboot();
            }

            let diff = diff_installers(&installers_before, &snapshotter.snapshot_installers());
            if !diff.is_empty() {
                if diff.keys[0].has_quiet_uninstall {
                    info.has_silent_uninstall = true;
                }
                info.registry_snapshot = Some(diff.clone());
                installer_diff = Some(diff);
            }

            let env_diff = diff_env(&env_before, &snapshotter.snapshot_env());
            log_env_changes(&env_diff, config.features.log_environment_values);
        }

        // Attribute normalization is a Windows-only step; config
        // transforms and file capture also run for successful installs
        // elsewhere.
        if windows {
            if let Err(e) = self.services.files.normalize_attributes(result, config) {
                warn!("Attribute normalization failed: {}", e);
            }
        }
        if windows || result.success {
            if let Err(e) = self.services.transforms.run(result, config) {
                warn!("Config transforms failed: {}", e);
            }
            match self.services.files.capture(result, config) {
                Ok(snapshot) => info.files_snapshot = Some(snapshot),
                Err(e) => warn!("File capture failed: {}", e),
            }
        }

        if windows && result.success {
            if let Err(e) = self.write_architecture_ignores(result, config) {
                warn!("Could not write architecture ignore files: {}", e);
            }
        }

        if windows {
            if let Err(e) = self.services.shims.install(config, result) {
                warn!("Shim generation failed: {}", e);
            }
        }

        if result.success {
            if let Err(e) = sideload::handle_sideload(
                result,
                config,
                &self.layout,
                self.services.process.as_ref(),
            ) {
                warn!("Sideload staging failed: {}", e);
            }
            info.arguments = Some(self.services.cipher.encrypt(&replay_arguments(config)));
            info.is_pinned = config.pin_package;
        }

        self.point_install_location_var(result, installer_diff.as_ref());

        if let Err(e) = self.services.info.save(&info) {
            warn!("Could not persist package record for '{}': {}", result.name, e);
        }
        self.ensure_bad_package_path_clean(result);
        self.services
            .events
            .publish(&Event::HandlePackageResultCompleted {
                name: result.name.clone(),
                version: result.version.clone(),
                command: config.command_name.clone(),
            });
        pending::remove_pending(result, config, &self.layout, &self.pending)?;

        if result.success && result.wants_reboot() && config.features.exit_on_reboot_detected {
            self.services.process.set_exit_code(exit::INSTALL_SUSPEND);
            return Err(Error::RebootRequired(format!(
                "'{}' exited {}; a reboot is required before anything else runs",
                result.name, result.exit_code
            )));
        }

        if !result.success {
            failure::handle_failure(
                result,
                config,
                &self.layout,
                self.services.prompt.as_ref(),
                FailureOptions {
                    quarantine: true,
                    rollback: true,
                },
            );
            if config.features.stop_on_first_package_failure {
                return Err(Error::OperationFailed(format!(
                    "Stopping further execution after failure of '{}'",
                    result.name
                )));
            }
            return Ok(());
        }

        let rollback = self.layout.package_backup_root().join(&result.name);
        if rollback.exists() {
            if let Err(e) = fs::remove_dir_all(&rollback) {
                warn!("Could not remove rollback dir {}: {}", rollback.display(), e);
            }
        }
        if let Some(location) = &result.install_location {
            info!(" Software installed to '{}'", location.display());
        }
        Ok(())
    }

    /// Uninstall pipeline. A failed uninstall always raises at the end so
    /// the source runner halts its package removal.
    pub fn handle_uninstall_result(
        &self,
        result: &mut PackageResult,
        config: &Configuration,
    ) -> Result<()> {
        // Legacy side-by-side layouts used `<name>.<version>` directories.
        if let Some(location) = result.install_location.clone() {
            if !location.exists() && !result.version.is_empty() {
                let versioned =
                    PathBuf::from(format!("{}.{}", location.display(), result.version));
                debug!(
                    "Install location missing; recovering legacy path {}",
                    versioned.display()
                );
                result.install_location = Some(versioned);
            }
        }

        self.log_banner(result, config);
        let info = self.load_info(result);
        let windows = config.machine.is_windows;

        if windows {
            if let Err(e) = self.services.shims.uninstall(config, result) {
                warn!("Shim removal failed: {}", e);
            }
        }

        if windows && !config.skip_package_install_provider {
            if let Err(e) = self.services.scripts.uninstall(config, result) {
                result.fail(format!("Uninstall script failed to run: {}", e));
            }
        }

        if windows && result.success {
            if let Err(e) = self
                .services
                .auto_uninstaller
                .run(result, config, &info)
            {
                warn!("Auto-uninstaller failed: {}", e);
            }
        }

        if windows {
            self.cancel_pending_reboot();
        }

        if result.success {
            self.uninstall_cleanup(result, config)?;
        } else {
            failure::handle_failure(
                result,
                config,
                &self.layout,
                self.services.prompt.as_ref(),
                FailureOptions {
                    quarantine: false,
                    rollback: false,
                },
            );
        }

        if result.success && result.wants_reboot() && config.features.exit_on_reboot_detected {
            self.services.process.set_exit_code(exit::INSTALL_SUSPEND);
            return Err(Error::RebootRequired(format!(
                "'{}' exited {}; a reboot is required before anything else runs",
                result.name, result.exit_code
            )));
        }

        if !result.success {
            return Err(Error::OperationFailed(format!(
                "Uninstall of '{}' was not successful (exit code {})",
                result.name, result.exit_code
            )));
        }
        Ok(())
    }

    /// Run the before-modify script for a package about to be upgraded or
    /// removed; never fails the operation.
    pub fn handle_before_modify(
        &self,
        result: &mut PackageResult,
        config: &Configuration,
    ) -> Result<()> {
        if config.machine.is_windows && !config.skip_package_install_provider {
            if let Err(e) = self.services.scripts.before_modify(config, result) {
                warn!("Before-modify script failed: {}", e);
            }
        }
        Ok(())
    }

    fn uninstall_cleanup(
        &self,
        result: &mut PackageResult,
        config: &Configuration,
    ) -> Result<()> {
        if config.features.remove_package_information_on_uninstall {
            if let Err(e) = self.services.info.remove(&result.name, &result.version) {
                warn!("Could not drop package record for '{}': {}", result.name, e);
            }
        }

        self.ensure_bad_package_path_clean(result);

        let rollback = self.layout.package_backup_root().join(&result.name);
        if rollback.exists() {
            if let Err(e) = fs::remove_dir_all(&rollback) {
                warn!("Could not remove rollback dir {}: {}", rollback.display(), e);
            }
        }

        if sideload::is_sideload(&result.name) {
            if let Err(e) = sideload::handle_sideload(
                result,
                config,
                &self.layout,
                self.services.process.as_ref(),
            ) {
                warn!("Sideload removal failed: {}", e);
            }
        }

        if config.force {
            if let Some(location) = &result.install_location {
                if location.exists() && !self.layout.is_protected_root(location) {
                    if let Err(e) = fs::remove_dir_all(location) {
                        warn!("Could not force-remove {}: {}", location.display(), e);
                    }
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Pipeline helpers
    // -----------------------------------------------------------------

    fn log_banner(&self, result: &PackageResult, config: &Configuration) {
        if result.success {
            info!(
                " The {} of {} was successful (exit code {}).",
                config.command_name, result.name, result.exit_code
            );
        } else {
            error!(
                " The {} of {} was NOT successful (exit code {}).",
                config.command_name, result.name, result.exit_code
            );
        }
    }

    fn load_info(&self, result: &PackageResult) -> PackageInformation {
        match self.services.info.get(&result.name, &result.version) {
            Ok(info) => info,
            Err(e) => {
                warn!(
                    "Could not load package record for '{}': {}; starting fresh",
                    result.name, e
                );
                PackageInformation::new(&result.name, &result.version)
            }
        }
    }

    /// Cancel any reboot a package's scripts initiated; the exit code is
    /// deliberately ignored.
    fn cancel_pending_reboot(&self) {
        if !cfg!(windows) {
            return;
        }
        match Command::new("shutdown").arg("/a").status() {
            Ok(status) => debug!("shutdown /a exited {:?}", status.code()),
            Err(e) => debug!("shutdown /a could not run: {}", e),
        }
    }

    /// Mark wrong-architecture executables with sibling `.ignore` files
    /// so shim generation skips them. When only the off-architecture
    /// binaries exist they get shimmed instead, and nothing is written.
    fn write_architecture_ignores(
        &self,
        result: &PackageResult,
        config: &Configuration,
    ) -> Result<()> {
        let Some(location) = &result.install_location else {
            return Ok(());
        };
        let tools = location.join("tools");
        let x86 = exe_files(&tools.join("x86"));
        let x64 = exe_files(&tools.join("x64"));

        let use_64bit = config.machine.is_64bit && !config.force_x86;
        let (preferred, off_architecture) = if use_64bit { (&x64, &x86) } else { (&x86, &x64) };

        if preferred.is_empty() && !off_architecture.is_empty() {
            debug!(
                "Only {} binaries present for '{}'; shimming them as-is",
                if use_64bit { "32-bit" } else { "64-bit" },
                result.name
            );
            return Ok(());
        }

        for exe in off_architecture {
            let ignore = PathBuf::from(format!("{}.ignore", exe.display()));
            fs::write(&ignore, b"").map_err(|e| {
                Error::IoError(format!("failed to write {}: {}", ignore.display(), e))
            })?;
        }
        Ok(())
    }

    /// Point `ChocolateyPackageInstallLocation` at the most specific
    /// location known: an existing tools directory for the package (only
    /// when the variable is still unset), the value the scripting host
    /// already set, the result's install location, and finally a detected
    /// installer key's location.
    fn point_install_location_var(
        &self,
        result: &PackageResult,
        installer_diff: Option<&RegistrySnapshot>,
    ) {
        let process = self.services.process.as_ref();

        if let Some(tools) = process.env_var(env_vars::TOOLS_LOCATION) {
            let candidate = Path::new(&tools).join(&result.name);
            if candidate.is_dir()
                && process.env_var(env_vars::PACKAGE_INSTALL_LOCATION).is_none()
            {
                process.set_env_var(
                    env_vars::PACKAGE_INSTALL_LOCATION,
                    &candidate.to_string_lossy(),
                );
            }
        }

        if process.env_var(env_vars::PACKAGE_INSTALL_LOCATION).is_none() {
            if let Some(location) = &result.install_location {
                process.set_env_var(
                    env_vars::PACKAGE_INSTALL_LOCATION,
                    &location.to_string_lossy(),
                );
            }
        }

        if let Some(diff) = installer_diff {
            if let Some(from_installer) = diff
                .keys
                .iter()
                .find_map(|k| k.install_location.as_deref().filter(|l| !l.is_empty()))
            {
                process.set_env_var(env_vars::PACKAGE_INSTALL_LOCATION, from_installer);
            }
        }
    }

    /// A package living under the failures root from an earlier run is
    /// stale once the package operates again.
    fn ensure_bad_package_path_clean(&self, result: &PackageResult) {
        let bad = self.layout.package_failures_root().join(&result.name);
        if bad.exists() {
            if let Err(e) = fs::remove_dir_all(&bad) {
                warn!("Could not clean old failure path {}: {}", bad.display(), e);
            }
        }
    }

    fn require_source(&self, config: &Configuration) -> Result<()> {
        if config.source.trim().is_empty()
            && config.source_type == crate::config::SourceType::Normal
        {
            return Err(Error::InvalidArguments(
                "Installation requires at least one source; none are enabled".to_string(),
            ));
        }
        Ok(())
    }

    fn reject_list_documents(&self, config: &Configuration) -> Result<()> {
        if config.has_list_documents() {
            return Err(Error::InvalidArguments(format!(
                "A packages.config file is only supported for install; remove it from '{}'",
                config.package_names
            )));
        }
        Ok(())
    }
}

fn warn_on_side_by_side(config: &Configuration) {
    if config.allow_multiple_versions {
        warn!(
            "allow-multiple-versions is deprecated; side-by-side installs still work but will go away in a future release"
        );
    }
}

/// Rebuild the machine-replayable argument string that gets encrypted
/// into the package record.
fn replay_arguments(config: &Configuration) -> String {
    let mut parts = Vec::new();
    if !config.source.is_empty() {
        parts.push(format!("--source=\"{}\"", config.source));
    }
    if let Some(version) = &config.version {
        parts.push(format!("--version=\"{}\"", version));
    }
    if config.prerelease {
        parts.push("--prerelease".to_string());
    }
    if config.force_x86 {
        parts.push("--x86".to_string());
    }
    if let Some(arguments) = &config.install_arguments {
        parts.push(format!("--install-arguments=\"{}\"", arguments));
    }
    if let Some(parameters) = &config.package_parameters {
        parts.push(format!("--package-parameters=\"{}\"", parameters));
    }
    parts.join(" ")
}

fn exe_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
        })
        .collect();
    files.sort();
    files
}
