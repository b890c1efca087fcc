// src/services/files.rs

//! Default files service: attribute normalization and install-location
//! capture
//!
//! Capture walks the install location and checksums every file with
//! SHA-256; the snapshot feeds the durable package record so uninstall
//! can tell user-modified files from packaged ones. Per-file problems are
//! logged and skipped; a capture never takes the package down.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::FilesService;
use crate::config::Configuration;
use crate::error::Result;
use crate::results::PackageResult;
use crate::snapshot::{CapturedFile, FilesSnapshot};

pub struct DefaultFilesService;

impl FilesService for DefaultFilesService {
    /// Clear read-only attributes so later moves and deletes succeed
    fn normalize_attributes(&self, result: &PackageResult, _config: &Configuration) -> Result<()> {
        let Some(location) = &result.install_location else {
            return Ok(());
        };
        if !location.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(location).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            match fs::metadata(path) {
                Ok(metadata) if metadata.permissions().readonly() => {
                    let mut perms = metadata.permissions();
                    #[allow(clippy::permissions_set_readonly_false)]
                    perms.set_readonly(false);
                    if let Err(e) = fs::set_permissions(path, perms) {
                        warn!(
                            "Could not clear read-only attribute on {}: {}",
                            path.display(),
                            e
                        );
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Could not stat {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    fn capture(&self, result: &PackageResult, _config: &Configuration) -> Result<FilesSnapshot> {
        let Some(location) = &result.install_location else {
            return Ok(FilesSnapshot::default());
        };
        if !location.exists() {
            return Ok(FilesSnapshot::default());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(location)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            match hash_file(path) {
                Ok(checksum) => files.push(CapturedFile {
                    path: path.to_string_lossy().into_owned(),
                    checksum,
                }),
                Err(e) => warn!("Could not checksum {}: {}", path.display(), e),
            }
        }

        debug!("Captured {} files under {}", files.len(), location.display());
        Ok(FilesSnapshot {
            files,
            captured_at: Some(Utc::now()),
        })
    }
}

fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
