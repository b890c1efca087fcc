// src/config/expander.rs

//! Expansion of a command's package list into per-package configurations
//!
//! `;`-separated entries ending in `.config` are list-document references;
//! each non-disabled entry in a document becomes a deep copy of the
//! command-level configuration with the entry's overrides applied. The
//! reduced command-level configuration (list-document entries stripped) is
//! yielded last, even when no plain names remain.
//!
//! Overlay rules: string fields replace only when non-empty; booleans only
//! ever set a flag, never clear it. Exceptions: `requireChecksums` forces
//! both allow-empty checksum flags off, `confirm` turns prompting off and
//! accepts licenses, and `useSystemPowershell` /
//! `ignoreDetectedReboot` / `disableRepositoryOptimizations` clear their
//! respective features.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{Configuration, SourceType};
use crate::error::Result;
use crate::results::PackageResult;
use crate::services::ListDocumentParser;

/// One `<package>` entry from a list document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub id: String,
    pub version: String,
    pub source: String,
    pub install_arguments: String,
    pub package_parameters: String,
    pub user: String,
    pub password: String,
    pub certificate: String,
    pub certificate_password: String,
    pub cache_location: String,
    pub download_checksum: String,
    pub download_checksum_64: String,
    pub download_checksum_type: String,
    pub download_checksum_type_64: String,
    /// -1 means "not set"
    pub execution_timeout: i64,
    pub disabled: bool,
    pub prerelease: bool,
    pub force: bool,
    pub force_x86: bool,
    pub allow_downgrade: bool,
    pub allow_multiple_versions: bool,
    pub ignore_dependencies: bool,
    pub skip_automation_scripts: bool,
    pub pin_package: bool,
    pub stop_on_first_failure: bool,
    pub exit_when_reboot_detected: bool,
    pub require_checksums: bool,
    pub allow_empty_checksums: bool,
    pub allow_empty_checksums_secure: bool,
    pub confirm: bool,
    pub use_system_powershell: bool,
    pub ignore_detected_reboot: bool,
    pub disable_repository_optimizations: bool,
}

impl Default for PackageSpec {
    fn default() -> Self {
        Self {
            id: String::new(),
            version: String::new(),
            source: String::new(),
            install_arguments: String::new(),
            package_parameters: String::new(),
            user: String::new(),
            password: String::new(),
            certificate: String::new(),
            certificate_password: String::new(),
            cache_location: String::new(),
            download_checksum: String::new(),
            download_checksum_64: String::new(),
            download_checksum_type: String::new(),
            download_checksum_type_64: String::new(),
            execution_timeout: -1,
            disabled: false,
            prerelease: false,
            force: false,
            force_x86: false,
            allow_downgrade: false,
            allow_multiple_versions: false,
            ignore_dependencies: false,
            skip_automation_scripts: false,
            pin_package: false,
            stop_on_first_failure: false,
            exit_when_reboot_detected: false,
            require_checksums: false,
            allow_empty_checksums: false,
            allow_empty_checksums_secure: false,
            confirm: false,
            use_system_powershell: false,
            ignore_detected_reboot: false,
            disable_repository_optimizations: false,
        }
    }
}

/// Expand `config` into per-package configurations.
///
/// Missing list documents record an error result (keyed by the document's
/// file name) in `aggregate` and expansion continues. The input
/// configuration is never mutated; every yielded configuration is a deep
/// copy.
pub fn expand(
    config: &Configuration,
    parser: &dyn ListDocumentParser,
    aggregate: &mut BTreeMap<String, PackageResult>,
) -> Result<Vec<Configuration>> {
    let mut expanded = Vec::new();
    let mut plain_names = Vec::new();

    for entry in config.split_package_names() {
        if !entry.to_lowercase().ends_with(".config") {
            plain_names.push(entry);
            continue;
        }

        let Some(document) = locate_document(&entry) else {
            let file_name = Path::new(&entry)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(entry.clone());
            warn!("Could not find packages file '{}'", entry);
            aggregate.insert(
                file_name.clone(),
                PackageResult::failure(
                    file_name,
                    format!("Could not find '{}' to install packages from", entry),
                ),
            );
            continue;
        };

        debug!("Expanding packages file {}", document.display());
        for spec in parser.parse(&document)? {
            if spec.disabled {
                debug!("Skipping disabled entry '{}'", spec.id);
                continue;
            }
            let mut per_package = config.clone();
            overlay(&mut per_package, &spec);
            expanded.push(per_package);
        }
    }

    let mut remainder = config.clone();
    remainder.package_names = plain_names.join(";");
    expanded.push(remainder);

    Ok(expanded)
}

/// Prefer the path as given when absolute; otherwise resolve against the
/// current directory.
fn locate_document(entry: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(entry);
    if direct.is_absolute() {
        return direct.is_file().then_some(direct);
    }
    let relative = std::env::current_dir().ok()?.join(entry);
    relative.is_file().then_some(relative)
}

fn overlay(config: &mut Configuration, spec: &PackageSpec) {
    let set = |target: &mut String, value: &str| {
        if !value.is_empty() {
            *target = value.to_string();
        }
    };
    let set_opt = |target: &mut Option<String>, value: &str| {
        if !value.is_empty() {
            *target = Some(value.to_string());
        }
    };

    set(&mut config.package_names, &spec.id);
    set_opt(&mut config.version, &spec.version);
    set(&mut config.source, &spec.source);
    set_opt(&mut config.install_arguments, &spec.install_arguments);
    set_opt(&mut config.package_parameters, &spec.package_parameters);
    set_opt(&mut config.credentials.user, &spec.user);
    set_opt(&mut config.credentials.password, &spec.password);
    set_opt(&mut config.credentials.certificate, &spec.certificate);
    set_opt(
        &mut config.credentials.certificate_password,
        &spec.certificate_password,
    );
    set_opt(&mut config.download_checksum, &spec.download_checksum);
    set_opt(&mut config.download_checksum_64, &spec.download_checksum_64);
    set_opt(
        &mut config.download_checksum_type,
        &spec.download_checksum_type,
    );
    set_opt(
        &mut config.download_checksum_type_64,
        &spec.download_checksum_type_64,
    );
    if !spec.cache_location.is_empty() {
        config.cache_location = Some(PathBuf::from(&spec.cache_location));
    }
    if spec.execution_timeout != -1 {
        config.execution_timeout = spec.execution_timeout;
    }

    // Booleans only ever turn a behavior on.
    config.prerelease |= spec.prerelease;
    config.force |= spec.force;
    config.force_x86 |= spec.force_x86;
    config.allow_downgrade |= spec.allow_downgrade;
    config.allow_multiple_versions |= spec.allow_multiple_versions;
    config.ignore_dependencies |= spec.ignore_dependencies;
    config.pin_package |= spec.pin_package;
    config.features.skip_automation_scripts |= spec.skip_automation_scripts;
    config.features.stop_on_first_package_failure |= spec.stop_on_first_failure;
    config.features.exit_on_reboot_detected |= spec.exit_when_reboot_detected;
    config.features.allow_empty_checksums |= spec.allow_empty_checksums;
    config.features.allow_empty_checksums_secure |= spec.allow_empty_checksums_secure;

    if spec.require_checksums {
        config.features.require_checksums = true;
        config.features.allow_empty_checksums = false;
        config.features.allow_empty_checksums_secure = false;
    }
    if spec.confirm {
        config.prompt_for_confirmation = false;
        config.accept_license = true;
    }
    if spec.use_system_powershell {
        config.features.use_powershell_host = false;
    }
    if spec.ignore_detected_reboot {
        config.features.exit_on_reboot_detected = false;
    }
    if spec.disable_repository_optimizations {
        config.features.use_repository_optimizations = false;
    }

    if let Some(source_type) = SourceType::parse(&spec.source) {
        config.source_type = source_type;
    }
}
