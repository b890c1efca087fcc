// src/config/mod.rs

//! Per-operation configuration records
//!
//! A [`Configuration`] describes one command invocation. The expander
//! derives per-package copies from it (plain record clones, never shared
//! state), overlaying fields from list-document entries. Mutations to a
//! per-package copy never propagate back to the command-level record.

mod expander;

pub use expander::{expand, PackageSpec};

use std::path::PathBuf;

/// Kind of backend that materializes packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceType {
    /// Normal package feed
    #[default]
    Normal,
    /// Operating-system feature provider
    WindowsFeatures,
    /// External vendor catalogs
    Cygwin,
    Python,
    Ruby,
}

impl SourceType {
    /// Canonical name as it appears in runner registrations
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::WindowsFeatures => "windowsfeatures",
            Self::Cygwin => "cygwin",
            Self::Python => "python",
            Self::Ruby => "ruby",
        }
    }

    /// Parse a source string, tolerating the singular feature spelling.
    /// Returns `None` for anything that is not a known source kind (for
    /// example a feed URL).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "windowsfeatures" | "windowsfeature" => Some(Self::WindowsFeatures),
            "cygwin" => Some(Self::Cygwin),
            "python" => Some(Self::Python),
            "ruby" => Some(Self::Ruby),
            _ => None,
        }
    }
}

/// Target platform information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo {
    pub is_windows: bool,
    pub is_64bit: bool,
}

impl Default for MachineInfo {
    fn default() -> Self {
        Self {
            is_windows: cfg!(windows),
            is_64bit: cfg!(target_pointer_width = "64"),
        }
    }
}

/// Credentials forwarded to source runners
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub certificate: Option<String>,
    pub certificate_password: Option<String>,
}

/// Boolean feature switches
///
/// List-document overlays may only set these to true, with three spec'd
/// exceptions that clear a feature (`use_system_powershell`,
/// `ignore_detected_reboot`, `disable_repository_optimizations`) and one
/// that forces the two allow-empty checksum flags off
/// (`require_checksums`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Features {
    pub require_checksums: bool,
    pub allow_empty_checksums: bool,
    pub allow_empty_checksums_secure: bool,
    pub stop_on_first_package_failure: bool,
    pub exit_on_reboot_detected: bool,
    pub use_enhanced_exit_codes: bool,
    pub log_environment_values: bool,
    pub lock_transactional_install_files: bool,
    pub remove_package_information_on_uninstall: bool,
    pub use_package_exit_codes: bool,
    pub use_powershell_host: bool,
    pub use_repository_optimizations: bool,
    pub skip_automation_scripts: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            require_checksums: false,
            allow_empty_checksums: false,
            allow_empty_checksums_secure: true,
            stop_on_first_package_failure: false,
            exit_on_reboot_detected: false,
            use_enhanced_exit_codes: false,
            log_environment_values: false,
            lock_transactional_install_files: false,
            remove_package_information_on_uninstall: false,
            use_package_exit_codes: true,
            use_powershell_host: true,
            use_repository_optimizations: true,
            skip_automation_scripts: false,
        }
    }
}

/// One operation's configuration; deep-cloneable by derive
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Requested packages, `;`-delimited; entries ending in `.config` are
    /// list-document references
    pub package_names: String,
    pub command_name: String,
    pub source: String,
    pub source_type: SourceType,
    pub version: Option<String>,
    pub prerelease: bool,
    pub force: bool,
    pub force_x86: bool,
    pub noop: bool,
    pub allow_downgrade: bool,
    pub allow_multiple_versions: bool,
    pub ignore_dependencies: bool,
    pub pin_package: bool,
    /// Skip the scripted install provider for this operation
    pub skip_package_install_provider: bool,
    pub prompt_for_confirmation: bool,
    pub accept_license: bool,
    /// Human-oriented output; when false only machine-parseable lines are
    /// emitted and the notifier stays quiet
    pub regular_output: bool,
    pub licensed: bool,
    pub install_arguments: Option<String>,
    pub package_parameters: Option<String>,
    pub cache_location: Option<PathBuf>,
    /// Seconds allowed for external processes; -1 means "not set"
    pub execution_timeout: i64,
    pub download_checksum: Option<String>,
    pub download_checksum_64: Option<String>,
    pub download_checksum_type: Option<String>,
    pub download_checksum_type_64: Option<String>,
    pub credentials: Credentials,
    pub machine: MachineInfo,
    pub features: Features,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            package_names: String::new(),
            command_name: String::new(),
            source: String::new(),
            source_type: SourceType::Normal,
            version: None,
            prerelease: false,
            force: false,
            force_x86: false,
            noop: false,
            allow_downgrade: false,
            allow_multiple_versions: false,
            ignore_dependencies: false,
            pin_package: false,
            skip_package_install_provider: false,
            prompt_for_confirmation: true,
            accept_license: false,
            regular_output: true,
            licensed: false,
            install_arguments: None,
            package_parameters: None,
            cache_location: None,
            execution_timeout: 2700,
            download_checksum: None,
            download_checksum_64: None,
            download_checksum_type: None,
            download_checksum_type_64: None,
            credentials: Credentials::default(),
            machine: MachineInfo::default(),
            features: Features::default(),
        }
    }
}

impl Configuration {
    /// Split the requested name list on `;`, dropping empty entries
    pub fn split_package_names(&self) -> Vec<String> {
        self.package_names
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// True when any requested entry is a list-document reference
    pub fn has_list_documents(&self) -> bool {
        self.split_package_names()
            .iter()
            .any(|n| n.to_lowercase().ends_with(".config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_parse_tolerates_singular() {
        assert_eq!(
            SourceType::parse("windowsfeature"),
            Some(SourceType::WindowsFeatures)
        );
        assert_eq!(
            SourceType::parse("WindowsFeatures"),
            Some(SourceType::WindowsFeatures)
        );
        assert_eq!(SourceType::parse("https://feed.example/api/v2"), None);
    }

    #[test]
    fn test_split_package_names() {
        let config = Configuration {
            package_names: "vim; git;;packages.config ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.split_package_names(),
            vec!["vim", "git", "packages.config"]
        );
        assert!(config.has_list_documents());
    }

    #[test]
    fn test_clone_is_deep() {
        let base = Configuration::default();
        let mut copy = base.clone();
        copy.features.require_checksums = true;
        copy.package_names = "x".to_string();
        assert!(!base.features.require_checksums);
        assert!(base.package_names.is_empty());
    }
}
