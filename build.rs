// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: package source
fn source_arg() -> Arg {
    Arg::new("source")
        .short('s')
        .long("source")
        .value_name("SOURCE")
        .help("Package source (feed URL, directory, or alternative source name)")
}

/// Common argument: install root
fn install_root_arg() -> Arg {
    Arg::new("install_root")
        .long("install-root")
        .value_name("PATH")
        .help("Install root directory")
}

fn build_cli() -> Command {
    Command::new("choco")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Package operation orchestrator with transactional installs and rollback")
        .subcommand_required(false)
        .subcommand(
            Command::new("install")
                .about("Install one or more packages")
                .arg(Arg::new("packages").required(true).help("Package names; entries ending in .config are packages.config references"))
                .arg(source_arg())
                .arg(install_root_arg())
                .arg(Arg::new("version").long("version").help("Specific version to install"))
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .action(clap::ArgAction::SetTrue)
                        .help("Answer yes to prompts and accept licenses"),
                ),
        )
        .subcommand(
            Command::new("upgrade")
                .about("Upgrade installed packages")
                .arg(Arg::new("packages").required(true).help("Package names"))
                .arg(source_arg())
                .arg(install_root_arg()),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Uninstall packages")
                .arg(Arg::new("packages").required(true).help("Package names"))
                .arg(install_root_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List packages")
                .arg(Arg::new("pattern").help("Optional filter pattern"))
                .arg(install_root_arg()),
        )
        .subcommand(
            Command::new("outdated")
                .about("Show packages with newer versions available")
                .arg(source_arg())
                .arg(install_root_arg()),
        )
        .subcommand(
            Command::new("pack")
                .about("Build a package from a manifest")
                .arg(Arg::new("manifest").help("Path to the manifest")),
        )
        .subcommand(
            Command::new("push")
                .about("Push a built package to a source")
                .arg(Arg::new("package").help("Path to the built package"))
                .arg(source_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("choco.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
