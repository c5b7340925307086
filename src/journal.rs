//! Timestamped report lines.
//!
//! Every open, flip attempt and pause produces one line of the form
//! `<local time> <event>` on the journal's writer (stdout by default).

use chrono::Local;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Format of the leading timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Something worth reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Target opened and sized.
    Opened { path: PathBuf, size: u64 },
    /// One bit changed.
    Flipped { before: u8, after: u8, offset: u64 },
    /// The byte could not be read.
    ReadFailed { offset: u64 },
    /// The modified byte could not be written back.
    WriteFailed { offset: u64 },
    /// Pausing before the next flip.
    Sleeping { duration: Duration },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Opened { path, size } => write!(f, "{:?} size is {} bytes.", path, size),
            Event::Flipped {
                before,
                after,
                offset,
            } => write!(f, "Flipped {:#04x} -> {:#04x} @ {}", before, after, offset),
            Event::ReadFailed { offset } => write!(f, "Failed to read @ {}", offset),
            Event::WriteFailed { offset } => write!(f, "Failed to write @ {}", offset),
            Event::Sleeping { duration } => write!(f, "Sleeping for {}s...", duration.as_secs()),
        }
    }
}

/// Destination for [`Event`] lines.
pub struct Journal {
    out: Box<dyn Write + Send>,
}

impl Journal {
    /// Journal writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Journal discarding everything.
    pub fn sink() -> Self {
        Self::new(io::sink())
    }

    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// Write one timestamped line.
    ///
    /// A journal that cannot be written to must not turn a successful flip
    /// into a failed one, so write errors only reach the diagnostics log.
    pub fn record(&mut self, event: &Event) {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let written = writeln!(self.out, "{} {}", timestamp, event).and_then(|_| self.out.flush());

        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to write journal line");
        }
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal").finish_non_exhaustive()
    }
}
