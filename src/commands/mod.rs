// src/commands/mod.rs
//! Command handlers for the Chocolatier CLI
//!
//! Each handler builds a [`Configuration`] from the parsed flags, wires
//! an [`Orchestrator`] with the platform default collaborators and the
//! folder source runner, and maps the run into the process exit code.

mod folder_source;

pub use folder_source::FolderSourceRunner;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use chocolatier::services::ProcessState;
use chocolatier::{
    default_install_root, CommandKind, Configuration, InstallLayout, Orchestrator, Services,
    SourceDispatcher, SourceType,
};

use crate::CommonOpts;

pub struct InstallOpts {
    pub packages: String,
    pub common: CommonOpts,
    pub version: Option<String>,
    pub prerelease: bool,
    pub force: bool,
    pub force_x86: bool,
    pub install_arguments: Option<String>,
    pub package_parameters: Option<String>,
    pub execution_timeout: i64,
    pub skip_scripts: bool,
    pub pin: bool,
    pub side_by_side: bool,
    pub stop_on_first_failure: bool,
    pub exit_when_reboot_detected: bool,
}

fn build_orchestrator(common: &CommonOpts) -> Result<Orchestrator> {
    let install_root = match &common.install_root {
        Some(root) => PathBuf::from(root),
        None => default_install_root().context("could not resolve the install root")?,
    };
    let layout = InstallLayout::new(install_root);
    layout
        .ensure_base_dirs()
        .context("could not create the install layout")?;

    let services = Services::platform_defaults(&layout);
    let dispatcher = SourceDispatcher::new(vec![Box::new(FolderSourceRunner::new(
        layout.packages_root(),
    ))]);
    Ok(Orchestrator::new(layout, dispatcher, services))
}

fn base_configuration(common: &CommonOpts) -> Configuration {
    let mut config = Configuration {
        source: common.source.clone(),
        noop: common.noop,
        regular_output: !common.limit_output,
        ..Default::default()
    };
    if let Some(source_type) = SourceType::parse(&common.source) {
        config.source_type = source_type;
    }
    if common.yes {
        config.prompt_for_confirmation = false;
        config.accept_license = true;
    }
    config
}

fn finish(orchestrator: &Orchestrator, outcome: chocolatier::Result<()>) -> Result<i32> {
    match outcome {
        Ok(()) => Ok(orchestrator.process().exit_code()),
        Err(e) => {
            eprintln!("{}", e);
            let code = orchestrator.process().exit_code();
            Ok(if code == 0 { 1 } else { code })
        }
    }
}

pub fn cmd_install(opts: InstallOpts) -> Result<i32> {
    let orchestrator = build_orchestrator(&opts.common)?;
    let mut config = base_configuration(&opts.common);
    config.package_names = opts.packages;
    config.version = opts.version;
    config.prerelease = opts.prerelease;
    config.force = opts.force;
    config.force_x86 = opts.force_x86;
    config.install_arguments = opts.install_arguments;
    config.package_parameters = opts.package_parameters;
    config.execution_timeout = opts.execution_timeout;
    config.pin_package = opts.pin;
    config.allow_multiple_versions = opts.side_by_side;
    config.features.skip_automation_scripts = opts.skip_scripts;
    config.features.stop_on_first_package_failure = opts.stop_on_first_failure;
    config.features.exit_on_reboot_detected = opts.exit_when_reboot_detected;

    let outcome = orchestrator.run(CommandKind::Install, &config).map(|_| ());
    finish(&orchestrator, outcome)
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_upgrade(
    packages: &str,
    common: &CommonOpts,
    version: Option<String>,
    prerelease: bool,
    force: bool,
    skip_scripts: bool,
    stop_on_first_failure: bool,
    exit_when_reboot_detected: bool,
) -> Result<i32> {
    let orchestrator = build_orchestrator(common)?;
    let mut config = base_configuration(common);
    config.package_names = packages.to_string();
    config.version = version;
    config.prerelease = prerelease;
    config.force = force;
    config.features.skip_automation_scripts = skip_scripts;
    config.features.stop_on_first_package_failure = stop_on_first_failure;
    config.features.exit_on_reboot_detected = exit_when_reboot_detected;

    let outcome = orchestrator.run(CommandKind::Upgrade, &config).map(|_| ());
    finish(&orchestrator, outcome)
}

pub fn cmd_uninstall(
    packages: &str,
    common: &CommonOpts,
    force: bool,
    skip_scripts: bool,
    remove_package_information: bool,
) -> Result<i32> {
    let orchestrator = build_orchestrator(common)?;
    let mut config = base_configuration(common);
    config.package_names = packages.to_string();
    config.force = force;
    config.features.skip_automation_scripts = skip_scripts;
    config.features.remove_package_information_on_uninstall = remove_package_information;

    let outcome = orchestrator
        .run(CommandKind::Uninstall, &config)
        .map(|_| ());
    finish(&orchestrator, outcome)
}

pub fn cmd_list(pattern: Option<&str>, common: &CommonOpts) -> Result<i32> {
    let orchestrator = build_orchestrator(common)?;
    let mut config = base_configuration(common);
    config.package_names = pattern.unwrap_or("").to_string();

    match orchestrator.run(CommandKind::List, &config) {
        Ok(results) => {
            for result in results.values() {
                println!("{} {}", result.name, result.version);
            }
            println!("{} packages installed.", results.len());
            Ok(orchestrator.process().exit_code())
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(1)
        }
    }
}

pub fn cmd_outdated(common: &CommonOpts, use_enhanced_exit_codes: bool) -> Result<i32> {
    let orchestrator = build_orchestrator(common)?;
    let mut config = base_configuration(common);
    config.features.use_enhanced_exit_codes = use_enhanced_exit_codes;

    let outcome = orchestrator.run(CommandKind::Outdated, &config).map(|_| ());
    finish(&orchestrator, outcome)
}

pub fn cmd_pack(manifest: Option<&str>, common: &CommonOpts) -> Result<i32> {
    let orchestrator = build_orchestrator(common)?;
    let mut config = base_configuration(common);
    config.package_names = manifest.unwrap_or("").to_string();
    info!("Packing {}", config.package_names);

    let outcome = orchestrator.run(CommandKind::Pack, &config).map(|_| ());
    finish(&orchestrator, outcome)
}

pub fn cmd_push(package: Option<&str>, common: &CommonOpts) -> Result<i32> {
    let orchestrator = build_orchestrator(common)?;
    let mut config = base_configuration(common);
    config.package_names = package.unwrap_or("").to_string();
    info!("Pushing {}", config.package_names);

    let outcome = orchestrator.run(CommandKind::Push, &config).map(|_| ());
    finish(&orchestrator, outcome)
}
