//! Error types for the bit flipper.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bit flipper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a flip run.
///
/// The [`Resource`](crate::Resource) primitives never produce these; they
/// report through `Option`/`bool` and keep the captured OS error around.
/// Only the layers above it escalate to an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error outside of the resource primitives.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bad command-line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The target could not be opened for reading and writing.
    #[error("Failed to open: {}", path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    /// The target opened but reports no addressable bytes.
    #[error("{} appears empty!", path.display())]
    EmptyTarget {
        path: PathBuf,
        cause: Option<io::Error>,
    },

    /// A read, write or flush failed during a flip.
    #[error("Flip failed: {source}")]
    FlipFailed { source: io::Error },

    /// The interrupt handler could not be attached.
    #[error("Cannot attach SIGINT handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Process exit status for this error.
    ///
    /// OS error codes are passed through verbatim. Failures that carry no
    /// OS code map to `EIO`, argument and configuration problems to
    /// `EINVAL`. The result is never zero.
    pub fn exit_code(&self) -> i32 {
        let code = match self {
            Error::Io(e) | Error::FlipFailed { source: e } | Error::OpenFailed { source: e, .. } => {
                os_code_or(e, libc::EIO)
            }
            Error::EmptyTarget { cause, .. } => cause
                .as_ref()
                .map_or(libc::EIO, |e| os_code_or(e, libc::EIO)),
            Error::InvalidArgument(_) | Error::Config(_) | Error::Serialization(_) => libc::EINVAL,
            Error::SignalHandler(_) => 1,
        };

        if code == 0 {
            1
        } else {
            code
        }
    }
}

fn os_code_or(error: &io::Error, fallback: i32) -> i32 {
    error.raw_os_error().unwrap_or(fallback)
}
