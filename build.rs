// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Option taking a filesystem path
fn path_arg(id: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(long).value_name("PATH").help(help)
}

fn build_cli() -> Command {
    Command::new("pkghelper")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Conary Contributors")
        .about("Long-lived package database query worker")
        .arg(
            Arg::new("input_fd")
                .value_name("INPUT_FD")
                .requires("output_fd")
                .help("Inherited file descriptor to read requests from (default: stdin)"),
        )
        .arg(
            Arg::new("output_fd")
                .value_name("OUTPUT_FD")
                .requires("input_fd")
                .help("Inherited file descriptor to write responses to (default: stdout)"),
        )
        .arg(path_arg("config", "config", "Configuration file").short('c'))
        .arg(
            Arg::new("lock_timeout")
                .long("lock-timeout")
                .value_name("SECONDS")
                .help("Seconds to wait for the package database lock"),
        )
        .arg(path_arg("lock_path", "lock-path", "Lock file guarding the package database"))
        .arg(Arg::new("arch").long("arch").help("Native architecture (default: detected)"))
        .arg(path_arg("snapshot", "snapshot", "Package listing to load"))
        .arg(
            Arg::new("installed_source")
                .long("installed-source")
                .value_name("SOURCE")
                .value_parser(["rpmdb", "snapshot"])
                .help("Where installed packages come from"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Write JSON responses instead of plain text"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
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

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pkghelper.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
