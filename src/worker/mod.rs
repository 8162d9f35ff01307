// src/worker/mod.rs

//! The protocol loop and the worker session behind it
//!
//! One command is fully handled (lock taken, query run, lock released,
//! response flushed) before the next line is read. The only suspension
//! points are the blocking read on the input stream and the lock retry
//! sleep.

pub mod lifecycle;
pub mod signals;

pub use lifecycle::{LifecycleState, ParentProbe, ProcessParent, ResourceGuard, ShutdownCause};

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::lock::{LockManager, LockPolicy};
use crate::packages::{self, PackageIndex, Target};
use crate::protocol::{Command, OutputFormat, Response};
use crate::resolver::{PackageMatchRequest, QueryResolver};
use crate::version::{compare_version_strings, ordering_to_int};
use std::io::{self, BufRead, ErrorKind, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Opens the package index on first use and after a close
pub type IndexOpener = Box<dyn FnMut() -> Result<Box<dyn PackageIndex>> + Send>;

/// Process-wide worker state handed to every command handler
pub struct WorkerSession {
    resources: Arc<ResourceGuard>,
    opener: IndexOpener,
    resolver: QueryResolver,
    lock_timeout: Duration,
}

impl WorkerSession {
    pub fn new(
        resources: Arc<ResourceGuard>,
        opener: IndexOpener,
        resolver: QueryResolver,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            resources,
            opener,
            resolver,
            lock_timeout,
        }
    }

    pub fn resources(&self) -> &Arc<ResourceGuard> {
        &self.resources
    }

    /// Handle one command and produce its response
    pub fn handle(&mut self, command: Command) -> Result<Response> {
        match command {
            Command::WhatInstalled(request) => self.query(&request, Target::Installed),
            Command::WhatAvailable(request) => self.query(&request, Target::Available),
            Command::VersionCompare {
                versions: (a, b),
            } => {
                let ord = compare_version_strings(a.as_deref(), b.as_deref());
                Ok(Response::Compare(ordering_to_int(ord)))
            }
            Command::InstallOnly { package } => self.with_index(|index| {
                let install_only = index.install_only_packages();
                Ok(Response::Bool(install_only.iter().any(|p| *p == package)))
            }),
            Command::CloseRpmdb => {
                if !self.resources.close_index() {
                    debug!("close_rpmdb with no open index");
                }
                Ok(Response::Closed)
            }
        }
    }

    fn query(&mut self, request: &PackageMatchRequest, target: Target) -> Result<Response> {
        let resolver = self.resolver.clone();
        self.with_index(|index| Ok(resolver.resolve(index, request, target)?.into()))
    }

    /// Run `f` against the index while holding the database lock
    fn with_index<T>(
        &mut self,
        f: impl FnOnce(&mut dyn PackageIndex) -> Result<T>,
    ) -> Result<T> {
        let resources = Arc::clone(&self.resources);
        let mut lock = resources.lock_manager();
        lock.acquire(self.lock_timeout)?;

        let result = {
            let mut slot = resources.index();
            open_and_run(&mut slot, &mut self.opener, f)
        };

        lock.release();
        result
    }
}

fn open_and_run<T>(
    slot: &mut Option<Box<dyn PackageIndex>>,
    opener: &mut IndexOpener,
    f: impl FnOnce(&mut dyn PackageIndex) -> Result<T>,
) -> Result<T> {
    let index = match slot.take() {
        Some(index) => index,
        None => {
            info!("Opening package index");
            opener()?
        }
    };
    let index = slot.insert(index);
    f(index.as_mut())
}

/// Reads commands, dispatches them and writes one response line each
pub struct ProtocolLoop<R, W, P> {
    reader: R,
    writer: W,
    probe: P,
    session: WorkerSession,
    format: OutputFormat,
}

impl<R: BufRead, W: Write, P: ParentProbe> ProtocolLoop<R, W, P> {
    pub fn new(reader: R, writer: W, probe: P, session: WorkerSession, format: OutputFormat) -> Self {
        Self {
            reader,
            writer,
            probe,
            session,
            format,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn session(&self) -> &WorkerSession {
        &self.session
    }

    /// Serve until end of input or a fatal error, then tear down
    pub fn run(&mut self) -> Result<ShutdownCause> {
        let result = self.serve();
        match &result {
            Ok(cause) => info!("Shutting down: {}", cause),
            Err(e) => error!("Shutting down: {}", e),
        }
        self.session.resources().teardown(None);
        result
    }

    fn serve(&mut self) -> Result<ShutdownCause> {
        let mut line = String::new();
        loop {
            if !self.session.resources().is_running() {
                return Ok(ShutdownCause::Draining);
            }
            self.probe.check()?;

            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(ShutdownCause::EndOfInput);
            }

            let request = line.trim_end_matches(['\r', '\n']);
            let command = Command::decode(request)?;
            debug!("Request ({}): {}", command.action(), request);

            let response = self.session.handle(command)?.encode(self.format);
            match self.write_response(&response) {
                Ok(()) => debug!("Response: {}", response),
                // The reader went away; nobody is left to answer
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    return Ok(ShutdownCause::BrokenPipe);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_response(&mut self, response: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", response)?;
        self.writer.flush()
    }
}

/// Run the worker over the given streams with the process's own parent
/// probe, lock policy and signal handling
pub fn serve<R: BufRead, W: Write>(
    config: &WorkerConfig,
    reader: R,
    writer: W,
) -> Result<ShutdownCause> {
    let policy = LockPolicy::detect();
    if policy == LockPolicy::CacheOnly {
        info!("Running unprivileged, using the local cache without locking");
    }
    let lock = LockManager::new(config.worker.lock_path.clone(), policy);
    let resources = Arc::new(ResourceGuard::new(lock));
    signals::install(Arc::clone(&resources))?;

    let index_config = config.index.clone();
    let opener: IndexOpener = Box::new(move || {
        let index = packages::open_index(&index_config)?;
        Ok(Box::new(index) as Box<dyn PackageIndex>)
    });

    let native_arch = config.native_arch();
    debug!("Native architecture {}", native_arch);
    let session = WorkerSession::new(
        resources,
        opener,
        QueryResolver::new(native_arch),
        config.lock_timeout(),
    );

    let mut protocol = ProtocolLoop::new(
        reader,
        writer,
        ProcessParent::current(),
        session,
        config.output_format()?,
    );
    protocol.run()
}
