// src/coordinator/report.rs

//! Command summary
//!
//! One summary per command: tallies of successes, failures, warnings, and
//! reboot-required packages. Successes are enumerated only for larger
//! runs; warnings, reboots, and failures always are. Returns the failure
//! count so the caller can flip a still-zero process exit code to 1.

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::Configuration;
use crate::results::PackageResult;

/// Past-tense verb for the summary banner
fn verb(command_name: &str) -> &'static str {
    match command_name {
        "install" => "installed",
        "upgrade" => "upgraded",
        "uninstall" => "uninstalled",
        _ => "processed",
    }
}

pub fn summarize(results: &BTreeMap<String, PackageResult>, config: &Configuration) -> usize {
    let successes: Vec<&PackageResult> = results.values().filter(|r| r.success).collect();
    let failures: Vec<&PackageResult> = results.values().filter(|r| !r.success).collect();
    let warnings: Vec<&PackageResult> = results.values().filter(|r| r.warning).collect();
    let reboots: Vec<&PackageResult> = results.values().filter(|r| r.wants_reboot()).collect();

    info!(
        "Chocolatier {} {}/{} packages. {} packages failed.",
        verb(&config.command_name),
        successes.len(),
        results.len(),
        failures.len()
    );

    if results.len() >= 5 && !successes.is_empty() {
        info!("Successes:");
        for result in &successes {
            info!(" - {} v{}", result.name, result.version);
        }
    }

    if !warnings.is_empty() {
        warn!("Warnings:");
        for result in &warnings {
            warn!(
                " - {} - {}",
                result.name,
                result.first_warning().unwrap_or("warning recorded")
            );
        }
    }

    if !reboots.is_empty() {
        warn!("Packages requiring reboot:");
        for result in &reboots {
            warn!(" - {} (exit code {})", result.name, result.exit_code);
        }
        warn!("The recent package changes indicate a reboot is necessary.");
    }

    if !failures.is_empty() {
        info!("Failures:");
        for result in &failures {
            info!(
                " - {} (exited {}) - {}",
                result.name,
                result.exit_code,
                result.first_error().unwrap_or("error not recorded")
            );
        }
    }

    failures.len()
}
