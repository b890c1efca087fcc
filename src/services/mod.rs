// src/services/mod.rs

//! Collaborator interfaces consumed by the orchestration core
//!
//! The coordinator talks to the outside world through these traits. The
//! feed client, shim generator, and registry reader live elsewhere; what
//! is provided here are the trait seams plus the default implementations
//! that are fully mechanical (script host, file capture, list-document
//! parsing, process state, console prompt).

mod files;
mod listdoc;
mod script;

pub use files::DefaultFilesService;
pub use listdoc::QuickXmlListParser;
pub use script::PowerShellHost;

use std::io::{self, BufRead, Write as IoWrite};
use std::process::Command;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::debug;

use crate::config::{Configuration, PackageSpec};
use crate::error::{Error, Result};
use crate::info::PackageInformation;
use crate::results::PackageResult;
use crate::snapshot::{EnvironmentSnapshot, FilesSnapshot, RegistrySnapshot};

/// Environment variables the orchestrator reads or writes
pub mod env_vars {
    pub const TOOLS_LOCATION: &str = "ChocolateyToolsLocation";
    pub const PACKAGE_INSTALL_LOCATION: &str = "ChocolateyPackageInstallLocation";
    pub const PACKAGE_INSTALLER_TYPE: &str = "ChocolateyPackageInstallerType";
}

/// Runs package-supplied install/uninstall scripts
pub trait ScriptingHost {
    /// Run the package's install script; returns true when a script ran
    fn install(&self, config: &Configuration, result: &mut PackageResult) -> Result<bool>;
    fn uninstall(&self, config: &Configuration, result: &mut PackageResult) -> Result<bool>;
    fn before_modify(&self, config: &Configuration, result: &mut PackageResult) -> Result<bool>;
    fn install_noop(&self, config: &Configuration, result: &PackageResult);
    fn uninstall_noop(&self, config: &Configuration, result: &PackageResult);
}

/// Generates and removes executable shims for a package
pub trait ShimService {
    fn install(&self, config: &Configuration, result: &PackageResult) -> Result<()>;
    fn uninstall(&self, config: &Configuration, result: &PackageResult) -> Result<()>;
}

/// File-attribute normalization and install-location capture
pub trait FilesService {
    fn normalize_attributes(&self, result: &PackageResult, config: &Configuration) -> Result<()>;
    fn capture(&self, result: &PackageResult, config: &Configuration) -> Result<FilesSnapshot>;
}

/// Applies packaged configuration transforms after materialization
pub trait ConfigTransformService {
    fn run(&self, result: &PackageResult, config: &Configuration) -> Result<()>;
}

/// Installed-program and environment reads
pub trait RegistryService {
    fn installer_keys(&self) -> Result<RegistrySnapshot>;
    fn environment_values(&self) -> Result<EnvironmentSnapshot>;
}

/// Deserializes a package-list document into ordered entries
pub trait ListDocumentParser {
    fn parse(&self, path: &std::path::Path) -> Result<Vec<PackageSpec>>;
}

/// Interactive confirmation; implementations may auto-answer
pub trait InteractivePrompt {
    fn prompt_for_confirmation(
        &self,
        message: &str,
        choices: &[&str],
        default: &str,
    ) -> Result<String>;
}

/// Events published by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    HandlePackageResultCompleted {
        name: String,
        version: String,
        command: String,
    },
}

pub trait EventBus {
    fn publish(&self, event: &Event);
}

/// Process-wide mutable state: environment variables (the channel to
/// child processes) and the eventual process exit code. Injected so tests
/// can observe writes deterministically. Environment writes are
/// process-scoped only; nothing persists past the current process.
pub trait ProcessState {
    fn env_var(&self, name: &str) -> Option<String>;
    fn set_env_var(&self, name: &str, value: &str);
    fn exit_code(&self) -> i32;
    fn set_exit_code(&self, code: i32);
    /// Re-prime process environment before a package pipeline runs
    fn reset_environment(&self, config: &Configuration);
}

/// Produces the opaque argument-replay blob; key management stays with
/// the implementation.
pub trait ArgumentCipher {
    fn encrypt(&self, plain: &str) -> String;
    fn decrypt(&self, blob: &str) -> Result<String>;
}

/// Drives a detected installer's own uninstaller after the scripted
/// uninstall ran
pub trait AutoUninstallerService {
    fn run(
        &self,
        result: &mut PackageResult,
        config: &Configuration,
        info: &PackageInformation,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Default implementations
// ---------------------------------------------------------------------------

/// Real process state over `std::env` plus an atomic exit code
#[derive(Default)]
pub struct SystemProcessState {
    exit_code: AtomicI32,
}

impl SystemProcessState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessState for SystemProcessState {
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn set_env_var(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }

    fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }

    fn reset_environment(&self, _config: &Configuration) {
        debug!("Refreshing process environment for next package");
    }
}

/// Registry service for hosts without an installed-program registry;
/// every capture is empty.
pub struct EmptyRegistry;

impl RegistryService for EmptyRegistry {
    fn installer_keys(&self) -> Result<RegistrySnapshot> {
        Ok(RegistrySnapshot::default())
    }

    fn environment_values(&self) -> Result<EnvironmentSnapshot> {
        Ok(EnvironmentSnapshot::default())
    }
}

/// Shim service placeholder; generation is performed by the external shim
/// generator when one is wired in.
pub struct NoopShims;

impl ShimService for NoopShims {
    fn install(&self, _config: &Configuration, result: &PackageResult) -> Result<()> {
        debug!("No shim generator wired; skipping shims for '{}'", result.name);
        Ok(())
    }

    fn uninstall(&self, _config: &Configuration, result: &PackageResult) -> Result<()> {
        debug!("No shim generator wired; no shims to remove for '{}'", result.name);
        Ok(())
    }
}

/// Config-transform placeholder; transform documents are applied by the
/// external transform engine when one is wired in.
pub struct NoopConfigTransforms;

impl ConfigTransformService for NoopConfigTransforms {
    fn run(&self, result: &PackageResult, _config: &Configuration) -> Result<()> {
        debug!("No transform engine wired; skipping transforms for '{}'", result.name);
        Ok(())
    }
}

/// Publishes events into the log stream
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn publish(&self, event: &Event) {
        debug!("Event published: {:?}", event);
    }
}

/// Console prompt reading one line from stdin
pub struct ConsolePrompt;

impl InteractivePrompt for ConsolePrompt {
    fn prompt_for_confirmation(
        &self,
        message: &str,
        choices: &[&str],
        default: &str,
    ) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{} [{}]: ", message, choices.join("/"))
            .and_then(|_| stdout.flush())
            .map_err(|e| Error::IoError(format!("prompt write failed: {}", e)))?;

        let mut input = String::new();
        io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|e| Error::IoError(format!("prompt read failed: {}", e)))?;

        let answer = input.trim().to_lowercase();
        if answer.is_empty() {
            return Ok(default.to_string());
        }
        for choice in choices {
            if answer == choice.to_lowercase()
                || answer.chars().next() == choice.to_lowercase().chars().next()
            {
                return Ok(choice.to_string());
            }
        }
        Ok(default.to_string())
    }
}

/// Keyed XOR + base64 obfuscation for the argument-replay blob. The key
/// never leaves this type; callers see only the opaque string.
pub struct XorArgumentCipher {
    key: Vec<u8>,
}

impl XorArgumentCipher {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn apply(&self, bytes: &mut [u8]) {
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte ^= self.key[i % self.key.len()];
        }
    }
}

impl Default for XorArgumentCipher {
    fn default() -> Self {
        Self::new(&b"chocolatier-argument-replay"[..])
    }
}

impl ArgumentCipher for XorArgumentCipher {
    fn encrypt(&self, plain: &str) -> String {
        use base64::Engine;
        let mut bytes = plain.as_bytes().to_vec();
        self.apply(&mut bytes);
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn decrypt(&self, blob: &str) -> Result<String> {
        use base64::Engine;
        let mut bytes = base64::engine::general_purpose::STANDARD
            .decode(blob)
            .map_err(|e| Error::ParseError(format!("argument blob is not valid base64: {}", e)))?;
        self.apply(&mut bytes);
        String::from_utf8(bytes)
            .map_err(|e| Error::ParseError(format!("argument blob is not valid UTF-8: {}", e)))
    }
}

/// Runs the quiet uninstall command captured in a package's registry
/// snapshot. Entries without a quiet uninstall are skipped; a missing or
/// failing uninstaller is a warning, not a failure.
pub struct DefaultAutoUninstaller;

impl AutoUninstallerService for DefaultAutoUninstaller {
    fn run(
        &self,
        result: &mut PackageResult,
        config: &Configuration,
        info: &PackageInformation,
    ) -> Result<()> {
        let Some(snapshot) = &info.registry_snapshot else {
            debug!("No installer snapshot for '{}'; nothing to auto-uninstall", result.name);
            return Ok(());
        };
        if !cfg!(windows) || !config.machine.is_windows {
            debug!("Auto-uninstaller only runs on Windows");
            return Ok(());
        }
        if let Ok(installer_type) = std::env::var(env_vars::PACKAGE_INSTALLER_TYPE) {
            debug!("Installer type reported by scripts: {}", installer_type);
        }

        for key in &snapshot.keys {
            if !key.has_quiet_uninstall {
                result.warn(format!(
                    "'{}' has no quiet uninstall; skipping automatic uninstall",
                    key.display_name
                ));
                continue;
            }
            let Some((program, args)) = split_command_line(&key.uninstall_command) else {
                continue;
            };
            debug!("Auto-uninstalling via: {} {:?}", program, args);
            match Command::new(&program).args(&args).status() {
                Ok(status) if status.success() => {}
                Ok(status) => result.warn(format!(
                    "Auto-uninstaller for '{}' exited {}",
                    key.display_name,
                    status.code().unwrap_or(-1)
                )),
                Err(e) => result.warn(format!(
                    "Auto-uninstaller for '{}' could not start: {}",
                    key.display_name, e
                )),
            }
        }
        Ok(())
    }
}

/// Split an uninstall command line into program and arguments, honoring a
/// double-quoted program path.
pub(crate) fn split_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix('"') {
        let end = rest.find('"')?;
        let program = rest[..end].to_string();
        let args = rest[end + 1..]
            .split_whitespace()
            .map(str::to_string)
            .collect();
        return Some((program, args));
    }
    let mut parts = line.split_whitespace();
    let program = parts.next()?.to_string();
    Some((program, parts.map(str::to_string).collect()))
}
