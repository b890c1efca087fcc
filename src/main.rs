// src/main.rs
//! Chocolatier - CLI entry point

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

mod commands;

// =============================================================================
// CLI Definitions
// =============================================================================

#[derive(Parser)]
#[command(name = "choco")]
#[command(version)]
#[command(about = "Package operation orchestrator with transactional installs and rollback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Clone)]
pub struct CommonOpts {
    /// Install root directory (defaults to ChocolateyInstall or the
    /// platform default)
    #[arg(long)]
    pub install_root: Option<String>,

    /// Package source (feed URL, directory, or alternative source name)
    #[arg(short, long, default_value = "")]
    pub source: String,

    /// Answer yes to prompts and accept licenses
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Show what would happen without making changes
    #[arg(long)]
    pub noop: bool,

    /// Limit output to machine-parseable lines
    #[arg(long)]
    pub limit_output: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install one or more packages
    Install {
        /// Package names, `;`-separated entries allowed; entries ending in
        /// .config are packages.config references
        packages: String,

        #[command(flatten)]
        common: CommonOpts,

        /// Specific version to install
        #[arg(long)]
        version: Option<String>,

        /// Include prerelease versions
        #[arg(long)]
        pre: bool,

        /// Force the operation even when the package looks installed
        #[arg(short, long)]
        force: bool,

        /// Force 32-bit binaries on 64-bit systems
        #[arg(long)]
        x86: bool,

        /// Install arguments passed through to the native installer
        #[arg(long)]
        install_arguments: Option<String>,

        /// Parameters passed to package scripts
        #[arg(long)]
        package_parameters: Option<String>,

        /// Seconds allowed for external processes
        #[arg(long, default_value = "2700")]
        execution_timeout: i64,

        /// Skip package automation scripts
        #[arg(long)]
        skip_scripts: bool,

        /// Pin the package after install
        #[arg(long)]
        pin: bool,

        /// Allow side-by-side installs (deprecated)
        #[arg(long)]
        side_by_side: bool,

        /// Stop the whole command at the first failing package
        #[arg(long)]
        stop_on_first_failure: bool,

        /// Stop with the reserved exit code when a package requests a
        /// reboot
        #[arg(long)]
        exit_when_reboot_detected: bool,
    },

    /// Upgrade installed packages
    Upgrade {
        packages: String,

        #[command(flatten)]
        common: CommonOpts,

        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        pre: bool,

        #[arg(short, long)]
        force: bool,

        #[arg(long)]
        skip_scripts: bool,

        #[arg(long)]
        stop_on_first_failure: bool,

        #[arg(long)]
        exit_when_reboot_detected: bool,
    },

    /// Uninstall packages
    Uninstall {
        packages: String,

        #[command(flatten)]
        common: CommonOpts,

        #[arg(short, long)]
        force: bool,

        #[arg(long)]
        skip_scripts: bool,

        /// Drop the durable package record too
        #[arg(long)]
        remove_package_information: bool,
    },

    /// List packages
    List {
        /// Optional filter pattern
        pattern: Option<String>,

        #[command(flatten)]
        common: CommonOpts,
    },

    /// Show packages with newer versions available
    Outdated {
        #[command(flatten)]
        common: CommonOpts,

        /// Exit 2 when outdated packages are found
        #[arg(long)]
        use_enhanced_exit_codes: bool,
    },

    /// Build a package from a manifest
    Pack {
        /// Path to the manifest
        manifest: Option<String>,

        #[command(flatten)]
        common: CommonOpts,
    },

    /// Push a built package to a source
    Push {
        /// Path to the built package
        package: Option<String>,

        #[command(flatten)]
        common: CommonOpts,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Commands::Install {
            packages,
            common,
            version,
            pre,
            force,
            x86,
            install_arguments,
            package_parameters,
            execution_timeout,
            skip_scripts,
            pin,
            side_by_side,
            stop_on_first_failure,
            exit_when_reboot_detected,
        }) => commands::cmd_install(commands::InstallOpts {
            packages,
            common,
            version,
            prerelease: pre,
            force,
            force_x86: x86,
            install_arguments,
            package_parameters,
            execution_timeout,
            skip_scripts,
            pin,
            side_by_side,
            stop_on_first_failure,
            exit_when_reboot_detected,
        }),

        Some(Commands::Upgrade {
            packages,
            common,
            version,
            pre,
            force,
            skip_scripts,
            stop_on_first_failure,
            exit_when_reboot_detected,
        }) => commands::cmd_upgrade(
            &packages,
            &common,
            version,
            pre,
            force,
            skip_scripts,
            stop_on_first_failure,
            exit_when_reboot_detected,
        ),

        Some(Commands::Uninstall {
            packages,
            common,
            force,
            skip_scripts,
            remove_package_information,
        }) => commands::cmd_uninstall(
            &packages,
            &common,
            force,
            skip_scripts,
            remove_package_information,
        ),

        Some(Commands::List { pattern, common }) => commands::cmd_list(pattern.as_deref(), &common),

        Some(Commands::Outdated {
            common,
            use_enhanced_exit_codes,
        }) => commands::cmd_outdated(&common, use_enhanced_exit_codes),

        Some(Commands::Pack { manifest, common }) => {
            commands::cmd_pack(manifest.as_deref(), &common)
        }

        Some(Commands::Push { package, common }) => {
            commands::cmd_push(package.as_deref(), &common)
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "choco", &mut io::stdout());
            Ok(0)
        }

        None => {
            println!("Chocolatier v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'choco --help' for usage information");
            Ok(0)
        }
    }
}
