//! Bit Flipper
//!
//! Simulates media corruption by flipping one random bit of a file or raw
//! block device at a time, pausing a random interval between flips.
//!
//! # Features
//!
//! - **Files and raw devices**: device capacity comes from the platform's
//!   geometry ioctl, file size from metadata
//! - **Single-bit flips**: exactly one bit changes per flip, flushed to the
//!   medium before it is reported
//! - **Injectable randomness**: reproducible runs with a seed, scripted
//!   draws in tests
//! - **CLI Interface**: runs until interrupted or until a flip fails
//!
//! # Architecture
//!
//! ```text
//! Resource (open + size) → Flipper (flip, sleep, repeat) → Journal (stdout)
//!            ↓
//!         Medium (pread/pwrite/fsync, size ioctl)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use bit_flipper::{Resource, RngSource, TargetKind};
//! use std::path::Path;
//!
//! let mut target = Resource::open(Path::new("disk.img"), TargetKind::File);
//! assert!(target.is_valid() && !target.is_empty());
//!
//! // Flip one random bit and flush it
//! let flipped = target.flip_random_bit(&mut RngSource::thread());
//! assert!(flipped);
//! ```

pub mod config;
pub mod error;
pub mod flipper;
pub mod journal;
pub mod medium;
pub mod random;
pub mod resource;
pub mod signal;

pub use config::{FlipperConfig, TargetKind};
pub use error::{Error, Result};
pub use flipper::{ensure_ready, CancelToken, Flipper, RunSummary};
pub use journal::{Event, Journal};
pub use medium::{Medium, MemoryMedium};
pub use random::{RandomSource, RngSource, ScriptedSource};
pub use resource::Resource;
