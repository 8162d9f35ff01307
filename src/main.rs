// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use nix::fcntl::{FcntlArg, fcntl};
use pkghelper::{ConfigOverrides, InstalledSource, ShutdownCause, WorkerConfig};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::os::fd::{FromRawFd, RawFd};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pkghelper")]
#[command(author, version, about = "Long-lived package database query worker", long_about = None)]
struct Cli {
    /// Inherited file descriptor to read requests from (default: stdin)
    #[arg(value_name = "INPUT_FD", requires = "output_fd")]
    input_fd: Option<RawFd>,

    /// Inherited file descriptor to write responses to (default: stdout)
    #[arg(value_name = "OUTPUT_FD", requires = "input_fd")]
    output_fd: Option<RawFd>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds to wait for the package database lock
    #[arg(long, value_name = "SECONDS")]
    lock_timeout: Option<u64>,

    /// Lock file guarding the package database
    #[arg(long, value_name = "PATH")]
    lock_path: Option<PathBuf>,

    /// Native architecture (default: detected)
    #[arg(long)]
    arch: Option<String>,

    /// Package listing to load
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Where installed packages come from: rpmdb or snapshot
    #[arg(long, value_name = "SOURCE")]
    installed_source: Option<InstalledSource>,

    /// Write JSON responses instead of plain text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            lock_timeout: self.lock_timeout,
            lock_path: self.lock_path.clone(),
            arch: self.arch.clone(),
            snapshot: self.snapshot.clone(),
            installed_source: self.installed_source,
            json: self.json,
        }
    }
}

fn load_config(cli: &Cli) -> Result<WorkerConfig> {
    let mut config = match &cli.config {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::new(),
    };
    config.apply_overrides(&cli.overrides());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Take ownership of a descriptor inherited from the parent
fn open_fd(fd: RawFd, role: &str) -> Result<File> {
    fcntl(fd, FcntlArg::F_GETFD)
        .with_context(|| format!("{} file descriptor {} is not open", role, fd))?;
    // SAFETY: the descriptor is open (checked above) and nothing else in
    // this process owns it, so the File may close it on drop.
    Ok(unsafe { File::from_raw_fd(fd) })
}

fn open_streams(cli: &Cli) -> Result<(Box<dyn BufRead>, Box<dyn Write>)> {
    match (cli.input_fd, cli.output_fd) {
        (Some(input), Some(output)) => {
            let reader = BufReader::new(open_fd(input, "input")?);
            let writer = open_fd(output, "output")?;
            Ok((Box::new(reader), Box::new(writer)))
        }
        _ => Ok((Box::new(io::stdin().lock()), Box::new(io::stdout().lock()))),
    }
}

fn run(cli: &Cli, config: &WorkerConfig) -> Result<ShutdownCause> {
    let (reader, writer) = open_streams(cli)?;
    info!("Worker started (pid {})", std::process::id());
    Ok(pkghelper::worker::serve(config, reader, writer)?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pkghelper: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr; stdout may be the response channel
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.worker.log_level)),
        )
        .init();

    match run(&cli, &config) {
        Ok(cause) => {
            info!("Worker exiting: {}", cause);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e
                .downcast_ref::<pkghelper::Error>()
                .map_or(1, pkghelper::Error::exit_code);
            error!("{:#}", e);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
