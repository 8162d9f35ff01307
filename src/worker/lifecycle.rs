// src/worker/lifecycle.rs

//! Worker lifecycle: shared resources, teardown and orphan detection
//!
//! The package index and the database lock live in a [`ResourceGuard`]
//! shared between the protocol loop and the signal thread. Every exit path
//! (end of input, fatal error, terminating signal) ends in
//! [`ResourceGuard::teardown`], which may run more than once and from
//! either thread.

use crate::error::{Error, Result};
use crate::lock::LockManager;
use crate::packages::PackageIndex;
use nix::errno::Errno;
use nix::sys::signal;
use nix::unistd::{Pid, getppid};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{debug, info, warn};

/// Worker state machine: Running → Draining → Terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Running,
    Draining,
    Terminated,
}

/// Why the protocol loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ShutdownCause {
    /// The input stream was closed
    #[strum(to_string = "end of input")]
    EndOfInput,
    /// Teardown had already begun elsewhere
    #[strum(to_string = "draining")]
    Draining,
    /// The output stream was closed by its reader
    #[strum(to_string = "output closed")]
    BrokenPipe,
}

/// The open package index slot
pub type IndexSlot = Option<Box<dyn PackageIndex>>;

/// Process-wide resources released on every exit path
pub struct ResourceGuard {
    index: Mutex<IndexSlot>,
    lock: Mutex<LockManager>,
    state: Mutex<LifecycleState>,
}

impl ResourceGuard {
    pub fn new(lock: LockManager) -> Self {
        Self {
            index: Mutex::new(None),
            lock: Mutex::new(lock),
            state: Mutex::new(LifecycleState::Running),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// The index slot, empty until first use and after a close
    pub fn index(&self) -> MutexGuard<'_, IndexSlot> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lock_manager(&self) -> MutexGuard<'_, LockManager> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_index_open(&self) -> bool {
        self.index().is_some()
    }

    /// Close and drop the index; returns whether one was open
    pub fn close_index(&self) -> bool {
        close_slot(&mut self.index())
    }

    /// Close the index, release the lock and mark the worker terminated
    ///
    /// With `patience` set, each resource is waited on for at most that
    /// long; a resource still busy after that is left to process exit,
    /// where the kernel drops the flock with the file descriptor.
    pub fn teardown(&self, patience: Option<Duration>) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == LifecycleState::Terminated {
                debug!("Teardown already complete");
                return;
            }
            *state = LifecycleState::Draining;
        }

        match wait_for(&self.index, patience) {
            Some(mut slot) => {
                close_slot(&mut slot);
            }
            None => warn!("Package index busy, leaving it to process exit"),
        }

        match wait_for(&self.lock, patience) {
            Some(mut lock) => lock.release(),
            None => warn!("Lock manager busy, leaving the lock to process exit"),
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = LifecycleState::Terminated;
        info!("Worker resources released");
    }
}

fn close_slot(slot: &mut IndexSlot) -> bool {
    match slot.take() {
        Some(mut index) => {
            index.close();
            info!("Package index closed");
            true
        }
        None => false,
    }
}

fn wait_for<T>(mutex: &Mutex<T>, patience: Option<Duration>) -> Option<MutexGuard<'_, T>> {
    let Some(patience) = patience else {
        return Some(mutex.lock().unwrap_or_else(PoisonError::into_inner));
    };

    let deadline = Instant::now() + patience;
    loop {
        match mutex.try_lock() {
            Ok(guard) => return Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) if Instant::now() >= deadline => return None,
            Err(TryLockError::WouldBlock) => thread::sleep(Duration::from_millis(10)),
        }
    }
}

/// Checks that the process which started the worker is still there
pub trait ParentProbe {
    /// Fails with [`Error::Orphaned`] once the parent is gone
    fn check(&self) -> Result<()>;
}

/// Parent check against the operating system's process table
#[derive(Debug, Clone, Copy)]
pub struct ProcessParent {
    original: Pid,
}

impl ProcessParent {
    /// Remember the current parent
    pub fn current() -> Self {
        Self::new(getppid())
    }

    pub fn new(original: Pid) -> Self {
        Self { original }
    }

    pub fn pid(&self) -> Pid {
        self.original
    }
}

impl ParentProbe for ProcessParent {
    fn check(&self) -> Result<()> {
        // A dead parent means we were reparented, usually to init
        let now = getppid();
        if now != self.original {
            debug!("Parent changed from {} to {}", self.original, now);
            return Err(Error::Orphaned {
                parent: self.original.as_raw(),
            });
        }

        match signal::kill(self.original, None) {
            Err(Errno::ESRCH) => Err(Error::Orphaned {
                parent: self.original.as_raw(),
            }),
            // EPERM still proves the process exists
            _ => Ok(()),
        }
    }
}
