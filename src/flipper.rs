//! The flip loop.
//!
//! ```text
//! check target → flip → sleep (random) → flip → ... until cancelled
//! ```
//!
//! Any failed flip ends the run with the OS error captured by the resource.
//! Cancellation is observed between flips and while sleeping, never during
//! a read, write or flush.

use crate::config::{FlipperConfig, CANCEL_POLL_MILLIS};
use crate::error::{Error, Result};
use crate::journal::Event;
use crate::medium::Medium;
use crate::random::RandomSource;
use crate::resource::Resource;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared stop flag, safe to set from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop at its next check.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Successful flips performed.
    pub flips: u64,
    /// Whether the run stopped because of cancellation rather than the
    /// configured flip count.
    pub cancelled: bool,
}

/// Turn the open-time state of a resource into an error.
///
/// An invalid resource is [`Error::OpenFailed`], an empty one
/// [`Error::EmptyTarget`]; both carry the OS error captured while opening.
pub fn ensure_ready<M: Medium>(resource: &mut Resource<M>, path: &Path) -> Result<()> {
    if !resource.is_valid() {
        let source = resource
            .take_last_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "target not opened"));
        return Err(Error::OpenFailed {
            path: path.to_path_buf(),
            source,
        });
    }

    if resource.is_empty() {
        return Err(Error::EmptyTarget {
            path: path.to_path_buf(),
            cause: resource.take_last_error(),
        });
    }

    Ok(())
}

/// Drives repeated random flips against one resource.
pub struct Flipper<'a, M: Medium, R: RandomSource> {
    resource: &'a mut Resource<M>,
    rng: R,
    config: FlipperConfig,
}

impl<'a, M: Medium, R: RandomSource> Flipper<'a, M, R> {
    pub fn new(resource: &'a mut Resource<M>, rng: R, config: FlipperConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource,
            rng,
            config,
        })
    }

    /// Flip until cancelled, until the configured count is reached, or until
    /// a flip fails.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<RunSummary> {
        let mut flips = 0u64;

        while !cancel.is_cancelled() {
            if !self.resource.flip_random_bit(&mut self.rng) {
                let source = self.resource.take_last_error().unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "target is not usable")
                });
                return Err(Error::FlipFailed { source });
            }
            flips += 1;

            if self.config.max_flips.is_some_and(|max| flips >= max) {
                info!(flips, "flip count reached");
                return Ok(RunSummary {
                    flips,
                    cancelled: false,
                });
            }

            let secs = self
                .rng
                .uniform(self.config.min_sleep_secs, self.config.max_sleep_secs);
            let duration = Duration::from_secs(secs);
            self.resource.record(&Event::Sleeping { duration });
            sleep_unless_cancelled(duration, cancel);
        }

        info!(flips, "run cancelled");
        Ok(RunSummary {
            flips,
            cancelled: true,
        })
    }
}

/// Sleep for `duration`, waking early once `cancel` is set.
fn sleep_unless_cancelled(duration: Duration, cancel: &CancelToken) {
    let deadline = Instant::now() + duration;
    let tick = Duration::from_millis(CANCEL_POLL_MILLIS);

    loop {
        if cancel.is_cancelled() {
            debug!("sleep interrupted");
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(tick.min(deadline - now));
    }
}
