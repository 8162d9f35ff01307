// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pkghelper::SnapshotIndex;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use tempfile::TempDir;

/// A small package listing: installed zlib and nginx, updates in `base`,
/// and htop only in the disabled `extra` repository.
pub const LISTING: &str = "\
[repo] base enabled
[repo] extra disabled
[option installonlypkgs] kernel kernel-core

zlib 0 1.2.11 31.el9 x86_64 ['libz.so.1()(64bit)', 'zlib = 1.2.11-31.el9'] i installed
zlib 0 1.2.11 31.el9 i686 [] i installed
zlib 0 1.2.13 1.el9 x86_64 [] a base
nginx 1 1.20.1 9.el9 x86_64 ['webserver', 'nginx(x86-64) = 1:1.20.1-9.el9'] r base
nginx 1 1.22.0 2.el9 x86_64 ['webserver'] a base
kernel 0 5.14.0 362.el9 x86_64 [] a base
s390-utils 2 2.29.0 1.el9 s390x [] a base
htop 0 3.2.1 1.el9 x86_64 [] a extra
";

/// The fixture listing loaded in-process
pub fn fixture_index() -> SnapshotIndex {
    SnapshotIndex::parse(LISTING).unwrap()
}

/// Write the fixture listing into a fresh temporary directory.
///
/// Returns (TempDir, listing path) - keep the TempDir alive to prevent cleanup.
pub fn write_listing() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("listing");
    std::fs::write(&path, LISTING).unwrap();
    (temp_dir, path)
}

/// Path of the worker binary under test
pub fn worker_binary() -> &'static str {
    env!("CARGO_BIN_EXE_pkghelper")
}

/// Arguments serving `listing` with the lock file kept inside `dir`
pub fn worker_args(dir: &Path, listing: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--snapshot".into(), listing.into()];
    for arg in ["--installed-source", "snapshot", "--arch", "x86_64", "--lock-path"] {
        args.push(arg.into());
    }
    args.push(dir.join("pkghelper.lock").into());
    args
}

/// Command line for a worker serving the fixture listing on stdin/stdout
pub fn worker_command(dir: &Path, listing: &Path) -> Command {
    let mut cmd = Command::new(worker_binary());
    cmd.args(worker_args(dir, listing))
        .env("RUST_LOG", "debug")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    cmd
}

/// A running worker process talking over pipes
pub struct Worker {
    pub child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    dir: TempDir,
}

impl Worker {
    pub fn spawn() -> Self {
        Self::spawn_with(|_| {})
    }

    pub fn spawn_with(configure: impl FnOnce(&mut Command)) -> Self {
        let (dir, listing) = write_listing();
        let mut cmd = worker_command(dir.path(), &listing);
        configure(&mut cmd);
        Self::start(cmd, dir)
    }

    /// Start `cmd` with piped stdin/stdout, keeping `dir` alive with it
    pub fn start(mut cmd: Command, dir: TempDir) -> Self {
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
        let mut child = cmd.spawn().unwrap();
        let stdin = child.stdin.take();
        let stdout = BufReader::new(child.stdout.take().unwrap());
        Self {
            child,
            stdin,
            stdout,
            dir,
        }
    }

    /// Send one request line without waiting for a reply
    pub fn send(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().unwrap();
        writeln!(stdin, "{}", line).unwrap();
        stdin.flush().unwrap();
    }

    /// Send one request line and read its response line
    pub fn request(&mut self, line: &str) -> String {
        self.send(line);
        self.read_line()
    }

    /// Read one line, empty at end of output
    pub fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.stdout.read_line(&mut line).unwrap();
        line
    }

    /// Close the input stream
    pub fn close_input(&mut self) {
        self.stdin.take();
    }

    pub fn wait(mut self) -> ExitStatus {
        self.close_input();
        self.child.wait().unwrap()
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.path().join("pkghelper.lock")
    }

    pub fn pid(&self) -> i32 {
        self.child.id() as i32
    }
}
