//! Configuration constants and types for the bit flipper.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default lower bound of the pause between flips, in seconds.
pub const DEFAULT_MIN_SLEEP_SECS: u64 = 1;

/// Default upper bound of the pause between flips, in seconds.
pub const DEFAULT_MAX_SLEEP_SECS: u64 = 1000;

/// Number of bits in a byte; bit indices are drawn from `0..BITS_PER_BYTE`.
pub const BITS_PER_BYTE: u8 = 8;

/// How often a sleeping run checks for cancellation, in milliseconds.
pub const CANCEL_POLL_MILLIS: u64 = 100;

/// What kind of target is being corrupted.
///
/// The kind only decides how the size of the target is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Decide from the path at open time.
    #[default]
    Auto,
    /// Ordinary file, sized from its metadata.
    File,
    /// Raw block device, sized by a device capacity query.
    Disk,
}

/// Configuration for a flip run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipperConfig {
    /// Target kind.
    pub kind: TargetKind,

    /// Shortest pause between flips (seconds, inclusive).
    pub min_sleep_secs: u64,

    /// Longest pause between flips (seconds, inclusive).
    pub max_sleep_secs: u64,

    /// Stop after this many successful flips. `None` runs until interrupted.
    pub max_flips: Option<u64>,

    /// Fixed seed for the random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for FlipperConfig {
    fn default() -> Self {
        Self {
            kind: TargetKind::Auto,
            min_sleep_secs: DEFAULT_MIN_SLEEP_SECS,
            max_sleep_secs: DEFAULT_MAX_SLEEP_SECS,
            max_flips: None,
            seed: None,
        }
    }
}

impl FlipperConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FlipperConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.min_sleep_secs > self.max_sleep_secs {
            return Err(Error::Config(format!(
                "Minimum sleep ({}s) exceeds maximum sleep ({}s)",
                self.min_sleep_secs, self.max_sleep_secs
            )));
        }
        if self.max_flips == Some(0) {
            return Err(Error::Config("Flip count must be greater than 0".to_string()));
        }
        Ok(())
    }
}
