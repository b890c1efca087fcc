// src/services/listdoc.rs

//! Package-list document parsing
//!
//! A list document (`packages.config`) is an XML file of `<package>`
//! entries carrying an id plus optional per-package overrides:
//!
//! ```xml
//! <packages>
//!   <package id="git" />
//!   <package id="vim" version="9.1.0" source="internal" pinPackage="true" />
//! </packages>
//! ```
//!
//! Entry order is preserved; unknown attributes are ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::ListDocumentParser;
use crate::config::PackageSpec;
use crate::error::{Error, Result};

pub struct QuickXmlListParser;

impl ListDocumentParser for QuickXmlListParser {
    fn parse(&self, path: &Path) -> Result<Vec<PackageSpec>> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut reader = Reader::from_str(&content);
        reader.trim_text(true);

        let mut specs = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"package" => {
                    let mut spec = PackageSpec::default();
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| {
                            Error::ParseError(format!(
                                "bad attribute in {}: {}",
                                path.display(),
                                e
                            ))
                        })?;
                        let value = attr
                            .unescape_value()
                            .map_err(|e| {
                                Error::ParseError(format!(
                                    "bad attribute value in {}: {}",
                                    path.display(),
                                    e
                                ))
                            })?
                            .into_owned();
                        apply_attribute(&mut spec, attr.key.as_ref(), value);
                    }
                    specs.push(spec);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "failed to parse {}: {}",
                        path.display(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        debug!("Parsed {} entries from {}", specs.len(), path.display());
        Ok(specs)
    }
}

fn apply_attribute(spec: &mut PackageSpec, key: &[u8], value: String) {
    let flag = parse_bool(&value);
    match key {
        b"id" => spec.id = value,
        b"version" => spec.version = value,
        b"source" => spec.source = value,
        b"installArguments" => spec.install_arguments = value,
        b"packageParameters" => spec.package_parameters = value,
        b"user" => spec.user = value,
        b"password" => spec.password = value,
        b"cert" => spec.certificate = value,
        b"certPassword" => spec.certificate_password = value,
        b"cacheLocation" => spec.cache_location = value,
        b"downloadChecksum" => spec.download_checksum = value,
        b"downloadChecksum64" => spec.download_checksum_64 = value,
        b"downloadChecksumType" => spec.download_checksum_type = value,
        b"downloadChecksumType64" => spec.download_checksum_type_64 = value,
        b"executionTimeout" => {
            spec.execution_timeout = value.trim().parse().unwrap_or(-1);
        }
        b"disabled" => spec.disabled = flag,
        b"prerelease" => spec.prerelease = flag,
        b"force" => spec.force = flag,
        b"forceX86" => spec.force_x86 = flag,
        b"allowDowngrade" => spec.allow_downgrade = flag,
        b"allowMultipleVersions" => spec.allow_multiple_versions = flag,
        b"ignoreDependencies" => spec.ignore_dependencies = flag,
        b"skipAutomationScripts" => spec.skip_automation_scripts = flag,
        b"pinPackage" => spec.pin_package = flag,
        b"stopOnFirstFailure" => spec.stop_on_first_failure = flag,
        b"exitWhenRebootDetected" => spec.exit_when_reboot_detected = flag,
        b"requireChecksums" => spec.require_checksums = flag,
        b"allowEmptyChecksums" => spec.allow_empty_checksums = flag,
        b"allowEmptyChecksumsSecure" => spec.allow_empty_checksums_secure = flag,
        b"confirm" => spec.confirm = flag,
        b"useSystemPowershell" => spec.use_system_powershell = flag,
        b"ignoreDetectedReboot" => spec.ignore_detected_reboot = flag,
        b"disableRepositoryOptimizations" => spec.disable_repository_optimizations = flag,
        _ => {}
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse_str(xml: &str) -> Vec<PackageSpec> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("packages.config");
        fs::write(&path, xml).unwrap();
        QuickXmlListParser.parse(&path).unwrap()
    }

    #[test]
    fn test_parse_preserves_order_and_fields() {
        let specs = parse_str(
            r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package id="git" />
  <package id="vim" version="9.1.0" source="internal" pinPackage="true" />
  <package id="legacy" disabled="true" />
</packages>"#,
        );

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].id, "git");
        assert_eq!(specs[1].id, "vim");
        assert_eq!(specs[1].version, "9.1.0");
        assert_eq!(specs[1].source, "internal");
        assert!(specs[1].pin_package);
        assert!(specs[2].disabled);
    }

    #[test]
    fn test_parse_numeric_and_bool_forms() {
        let specs = parse_str(
            r#"<packages>
  <package id="a" executionTimeout="90" prerelease="1" force="TRUE" confirm="false" />
</packages>"#,
        );
        assert_eq!(specs[0].execution_timeout, 90);
        assert!(specs[0].prerelease);
        assert!(specs[0].force);
        assert!(!specs[0].confirm);
    }

    #[test]
    fn test_parse_rejects_malformed_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("packages.config");
        fs::write(&path, "<packages><package id='a'></packages>").unwrap();
        assert!(QuickXmlListParser.parse(&path).is_err());
    }

    #[test]
    fn test_parse_missing_file_is_io_error() {
        let outcome = QuickXmlListParser.parse(Path::new("/no/such/packages.config"));
        assert!(matches!(outcome, Err(Error::IoError(_))));
    }
}
