// src/lib.rs

//! Chocolatier Package Operation Orchestrator
//!
//! The orchestration layer of a Windows-centric package manager. It sits
//! between user-facing commands (install, upgrade, uninstall, list,
//! outdated, pack, push) and the source runners that materialize
//! packages, and owns the full operation lifecycle:
//!
//! - Per-package configuration expansion, including `packages.config`
//!   list documents
//! - Dispatch to the source runner matching a configuration's source kind
//! - The post-materialization pipeline: scripts, shims, sideload staging,
//!   file-attribute normalization, config transforms
//! - System-state snapshots and diffs (installed-program keys,
//!   environment variables) so uninstall can undo work
//! - Pending markers with optional exclusive locks, failure quarantine,
//!   and backup rollback
//! - Durable per-package metadata and deterministic process exit codes
//!
//! Feed protocol, archive parsing, dependency resolution, and script
//! content semantics belong to collaborators behind the trait seams in
//! [`services`] and [`sources`].

pub mod config;
pub mod coordinator;
mod error;
pub mod exit;
pub mod info;
pub mod layout;
pub mod notify;
pub mod pending;
pub mod results;
pub mod services;
pub mod sideload;
pub mod snapshot;
pub mod sources;
pub mod validate;

pub use config::{Configuration, Credentials, Features, MachineInfo, PackageSpec, SourceType};
pub use coordinator::{CommandKind, Orchestrator, Services};
pub use error::{Error, Result};
pub use info::{JsonPackageInfoStore, PackageInfoStore, PackageInformation};
pub use layout::{default_install_root, InstallLayout, PENDING_FILE_NAME};
pub use results::{MessageKind, PackageResult, ResultMessage};
pub use snapshot::{
    diff_env, diff_installers, EnvDiff, EnvScope, EnvVar, EnvironmentSnapshot, FilesSnapshot,
    InstallerKey, RegistrySnapshot, Snapshotter,
};
pub use sources::{ResultSink, SourceDispatcher, SourceRunner};
