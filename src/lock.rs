// src/lock.rs

//! Exclusive lock around the shared package database
//!
//! A privileged worker takes an advisory `flock(LOCK_EX)` on a lock file
//! before touching the package index, retrying once per second until a
//! timeout. The holder writes its pid into the file so an operator can see
//! who is blocking.
//!
//! An unprivileged worker cannot refresh shared state, so it runs from the
//! local cache and skips locking entirely.
//!
//! # Example
//!
//! ```ignore
//! use pkghelper::lock::{LockManager, LockPolicy};
//! use std::time::Duration;
//!
//! let mut lock = LockManager::new("/run/pkghelper.lock", LockPolicy::detect());
//! lock.acquire(Duration::from_secs(30))?;
//! // ... query the index ...
//! lock.release();
//! ```

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{debug, error, info};

/// Lifecycle of the database lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LockState {
    Unlocked,
    Acquiring,
    Held,
    Released,
}

/// Whether this process takes the lock at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Privileged: take the exclusive lock
    Exclusive,
    /// Unprivileged: operate from the local cache without locking
    CacheOnly,
}

impl LockPolicy {
    /// Exclusive when running as root, cache-only otherwise
    pub fn detect() -> Self {
        if nix::unistd::geteuid().is_root() {
            LockPolicy::Exclusive
        } else {
            LockPolicy::CacheOnly
        }
    }
}

/// Timeout-bounded exclusive lock on the package database
#[derive(Debug)]
pub struct LockManager {
    path: PathBuf,
    policy: LockPolicy,
    state: LockState,
    /// Open while held; closing the handle drops the flock
    file: Option<File>,
    retry_interval: Duration,
}

impl LockManager {
    /// Default lock path
    pub const DEFAULT_PATH: &'static str = "/run/pkghelper.lock";

    pub fn new(path: impl Into<PathBuf>, policy: LockPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            state: LockState::Unlocked,
            file: None,
            retry_interval: Duration::from_secs(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == LockState::Held
    }

    /// Acquire the lock, retrying once per second until `timeout` elapses
    ///
    /// Under [`LockPolicy::CacheOnly`] this returns immediately without
    /// locking. Acquiring while already held is a no-op. On timeout the
    /// manager is left unlocked and [`Error::LockTimeout`] is returned.
    pub fn acquire(&mut self, timeout: Duration) -> Result<()> {
        if self.policy == LockPolicy::CacheOnly {
            debug!("Not privileged, skipping lock on {}", self.path.display());
            return Ok(());
        }
        if self.is_held() {
            return Ok(());
        }

        self.state = LockState::Acquiring;
        let file = match self.open_lock_file() {
            Ok(file) => file,
            Err(e) => {
                self.state = LockState::Unlocked;
                return Err(e);
            }
        };

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    let elapsed = start.elapsed();
                    if elapsed >= timeout {
                        self.state = LockState::Unlocked;
                        error!(
                            "Timed out after {}s waiting for lock on {} (held by pid {})",
                            timeout.as_secs(),
                            self.path.display(),
                            Self::holder_pid(&self.path)
                                .map_or_else(|| "unknown".to_string(), |p| p.to_string())
                        );
                        return Err(Error::LockTimeout {
                            path: self.path.clone(),
                            seconds: timeout.as_secs(),
                        });
                    }
                    debug!("Lock on {} is held, retrying", self.path.display());
                    thread::sleep(self.retry_interval.min(timeout - elapsed));
                }
                Err(e) => {
                    self.state = LockState::Unlocked;
                    return Err(Error::Io(e));
                }
            }
        }

        if let Err(e) = Self::write_pid(&file) {
            debug!("Could not record pid in {}: {}", self.path.display(), e);
        }
        self.file = Some(file);
        self.state = LockState::Held;
        info!("Acquired lock on {}", self.path.display());
        Ok(())
    }

    /// Release the lock
    ///
    /// Safe to call any number of times, including before any acquire.
    pub fn release(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        if let Err(e) = file.set_len(0) {
            debug!("Could not clear pid in {}: {}", self.path.display(), e);
        }
        if let Err(e) = FileExt::unlock(&file) {
            debug!("Could not unlock {}: {}", self.path.display(), e);
        }
        self.state = LockState::Released;
        info!("Released lock on {}", self.path.display());
    }

    /// Read the pid recorded by the current holder, if any
    pub fn holder_pid(path: &Path) -> Option<u32> {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    fn open_lock_file(&self) -> Result<File> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        Ok(file)
    }

    fn write_pid(mut file: &File) -> std::io::Result<()> {
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()
    }
}

impl Drop for LockManager {
    fn drop(&mut self) {
        self.release();
    }
}
