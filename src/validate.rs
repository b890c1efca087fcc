// src/validate.rs

//! Package-name validation
//!
//! Users regularly pass a downloaded archive or a manifest where a package
//! name belongs. Both are rejected before any expansion runs, with
//! guidance: archives get a reconstructed `--source` example command,
//! manifests are told to `pack` first.

use std::path::Path;

use crate::config::Configuration;
use crate::error::{Error, Result};

/// Extension of a built package archive
pub const PACKAGE_EXTENSION: &str = ".nupkg";
/// Extension of a package manifest
pub const MANIFEST_EXTENSION: &str = ".nuspec";

/// Reject tokens that are archives-as-paths or manifests. Runs before the
/// expander; an error here means no pipeline runs at all.
pub fn validate_package_names(config: &Configuration) -> Result<()> {
    for token in config.split_package_names() {
        let lower = token.to_lowercase();
        if lower.ends_with(PACKAGE_EXTENSION) && is_path_like(&token) {
            return Err(Error::InvalidArguments(archive_guidance(
                &token,
                &config.command_name,
            )));
        }
        if lower.ends_with(MANIFEST_EXTENSION) {
            return Err(Error::InvalidArguments(format!(
                "Package name cannot point to a manifest ('{}'). Run `choco pack` on the manifest \
                 first, then point --source at the directory holding the built package.",
                token
            )));
        }
    }
    Ok(())
}

/// Local path, UNC path, or existing file
fn is_path_like(token: &str) -> bool {
    token.starts_with("\\\\")
        || token.contains('/')
        || token.contains('\\')
        || Path::new(token).is_file()
}

/// Build the corrective example command for an archive-as-name token
fn archive_guidance(token: &str, command_name: &str) -> String {
    let path = Path::new(token);
    let file_stem = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| token.to_string());
    let file_stem = file_stem
        .strip_suffix(PACKAGE_EXTENSION)
        .or_else(|| {
            // Extension casing varies; strip whatever matched.
            let lower = file_stem.to_lowercase();
            lower
                .ends_with(PACKAGE_EXTENSION)
                .then(|| &file_stem[..file_stem.len() - PACKAGE_EXTENSION.len()])
        })
        .unwrap_or(&file_stem)
        .to_string();

    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());

    let command = if command_name.is_empty() {
        "install"
    } else {
        command_name
    };
    let (name, version) = split_name_and_version(&file_stem);
    let example = match version {
        Some(version) => format!(
            "choco {} {} --version=\"{}\" --source=\"{}\"",
            command, name, version, directory
        ),
        None => format!("choco {} {} --source=\"{}\"", command, name, directory),
    };

    format!(
        "Package name cannot be a path to a file on a local or remote system. \
         To install a local package, use the directory as the source:\n  {}",
        example
    )
}

/// Split `vim.9.1.0` into (`vim`, `9.1.0`) by progressively testing dot
/// suffixes as versions; the whole stem is the name when no suffix
/// parses.
fn split_name_and_version(stem: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = stem.split('.').collect();
    for i in 1..parts.len() {
        let candidate = parts[i..].join(".");
        if looks_like_version(&candidate) {
            return (parts[..i].join("."), Some(candidate));
        }
    }
    (stem.to_string(), None)
}

/// Dot-separated numeric segments; the last may carry a prerelease tag
/// after `-`.
fn looks_like_version(candidate: &str) -> bool {
    let segments: Vec<&str> = candidate.split('.').collect();
    if segments.is_empty() || segments.len() > 4 {
        return false;
    }
    for (i, segment) in segments.iter().enumerate() {
        let numeric = if i == segments.len() - 1 {
            segment.split('-').next().unwrap_or(segment)
        } else {
            segment
        };
        if numeric.is_empty() || !numeric.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(names: &str) -> Configuration {
        Configuration {
            package_names: names.to_string(),
            command_name: "install".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_names_pass() {
        assert!(validate_package_names(&config_for("vim;git")).is_ok());
    }

    #[test]
    fn test_archive_path_is_rejected_with_example() {
        let err = validate_package_names(&config_for("/tmp/foo.nupkg")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("choco install foo --source=\"/tmp\""), "{}", message);
    }

    #[test]
    fn test_versioned_archive_reconstructs_version() {
        let err =
            validate_package_names(&config_for("/tmp/foo.bar.1.2.3.nupkg")).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("choco install foo.bar --version=\"1.2.3\" --source=\"/tmp\""),
            "{}",
            message
        );
    }

    #[test]
    fn test_existing_archive_without_path_is_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("local.nupkg");
        fs::write(&archive, b"zip").unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp.path()).unwrap();
        let outcome = validate_package_names(&config_for("local.nupkg"));
        std::env::set_current_dir(previous).unwrap();
        assert!(outcome.is_err());
    }

    #[test]
    fn test_unc_archive_is_rejected() {
        assert!(validate_package_names(&config_for("\\\\share\\drop\\foo.nupkg")).is_err());
    }

    #[test]
    fn test_manifest_is_told_to_pack() {
        let err = validate_package_names(&config_for("foo.nuspec")).unwrap_err();
        assert!(err.to_string().contains("pack"));
    }

    #[test]
    fn test_version_recognition() {
        assert!(looks_like_version("1.2.3"));
        assert!(looks_like_version("1.2.3.4"));
        assert!(looks_like_version("1.2.3-beta1"));
        assert!(!looks_like_version("bar.1.2.3"));
        assert!(!looks_like_version("1.2.3.4.5"));
        assert!(!looks_like_version(""));
    }

    #[test]
    fn test_split_name_and_version() {
        assert_eq!(
            split_name_and_version("foo.bar.1.2.3"),
            ("foo.bar".to_string(), Some("1.2.3".to_string()))
        );
        assert_eq!(split_name_and_version("foo"), ("foo".to_string(), None));
    }
}
