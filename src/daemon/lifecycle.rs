//! Lifecycle — endpoint files and the interrupt that ends the process.
//!
//! Socket files outlive a crashed process and make the next bind fail, so
//! they are removed before binding and again on the way out.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::{Builder, Runtime};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, error, info};

use crate::error::Result;

pub struct Lifecycle {
    paths: Vec<PathBuf>,
    cleaned: AtomicBool,
}

impl Lifecycle {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            cleaned: AtomicBool::new(false),
        }
    }

    /// Create socket directories and clear leftovers from an earlier run.
    pub fn prepare(&self) -> Result<()> {
        for path in &self.paths {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            if remove_endpoint_file(path)? {
                info!(socket = %path.display(), "removed stale endpoint file");
            }
        }
        Ok(())
    }

    /// Remove every endpoint file. Runs once; later calls are no-ops.
    pub fn cleanup(&self) {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return;
        }
        for path in &self.paths {
            match remove_endpoint_file(path) {
                Ok(true) => debug!(socket = %path.display(), "endpoint file removed"),
                Ok(false) => {}
                Err(e) => error!(socket = %path.display(), error = %e, "failed to remove endpoint file"),
            }
        }
    }
}

/// Remove `path` if something is there. Returns whether anything was removed.
pub fn remove_endpoint_file(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => Ok(true),
        // Lost a race with another cleanup.
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// SIGINT handler installed ahead of startup.
///
/// Once installed, Ctrl-C no longer kills the process outright; an interrupt
/// that lands before [`InterruptWatch::wait`] is queued and returned at once.
pub struct InterruptWatch {
    runtime: Runtime,
    signal: Signal,
}

impl InterruptWatch {
    /// Register the handler on a private current-thread runtime.
    pub fn install() -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let signal = {
            let _enter = runtime.enter();
            signal(SignalKind::interrupt())?
        };
        Ok(Self { runtime, signal })
    }

    /// Block the calling thread until Ctrl-C.
    pub fn wait(mut self) {
        let signal = &mut self.signal;
        self.runtime.block_on(signal.recv());
        info!("interrupt received");
    }
}
