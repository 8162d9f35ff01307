// src/worker/signals.rs

//! Termination signal handling
//!
//! A signal while the worker is in use means the parent is tearing it down,
//! not that work failed: resources are released and the process exits 0.

use super::lifecycle::ResourceGuard;
use crate::error::Result;
use nix::sys::signal::Signal;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGPIPE, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use std::os::raw::c_int;
use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::info;

/// Signals that trigger a clean shutdown
pub const TERMINATION_SIGNALS: [c_int; 5] = [SIGINT, SIGHUP, SIGPIPE, SIGQUIT, SIGTERM];

/// How long the signal thread waits for the loop to let go of a resource
const TEARDOWN_PATIENCE: Duration = Duration::from_secs(2);

/// Human readable signal name
pub fn signal_name(sig: c_int) -> &'static str {
    Signal::try_from(sig).map_or("UNKNOWN", Signal::as_str)
}

/// Spawn the thread that tears the worker down on a termination signal
pub fn install(resources: Arc<ResourceGuard>) -> Result<JoinHandle<()>> {
    let mut signals = Signals::new(TERMINATION_SIGNALS)?;

    let handle = thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received {}, shutting down", signal_name(sig));
                resources.teardown(Some(TEARDOWN_PATIENCE));
                process::exit(0);
            }
        })?;

    Ok(handle)
}
