//! In-memory medium for testing.

use super::Medium;
use crate::config::TargetKind;
use std::cell::RefCell;
use std::io;

/// A byte vector standing in for a file or device.
///
/// Besides holding data it can be told to fail reads, writes or flushes
/// with an OS error code, and it records every offset that was read or
/// written so tests can check where I/O happened.
///
/// # Example
///
/// ```rust
/// use bit_flipper::{MemoryMedium, Medium};
///
/// let mut medium = MemoryMedium::with_data(vec![0u8; 4]);
/// assert_eq!(medium.write_at(&[0xFF], 2).unwrap(), 1);
/// assert_eq!(medium.data(), &[0, 0, 0xFF, 0]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryMedium {
    data: Vec<u8>,
    read_only: bool,
    fail_reads: bool,
    fail_sync: bool,
    size_error: Option<i32>,
    accesses: RefCell<Vec<u64>>,
}

impl MemoryMedium {
    /// Creates an empty medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a medium holding `data`.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Reject every write with `EACCES`.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Fail every read with `EIO`.
    #[must_use]
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Fail every flush with `EIO`.
    #[must_use]
    pub fn failing_sync(mut self) -> Self {
        self.fail_sync = true;
        self
    }

    /// Fail the size query with the given OS error code.
    #[must_use]
    pub fn failing_size(mut self, code: i32) -> Self {
        self.size_error = Some(code);
        self
    }

    /// Current contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Offsets of every read and write attempted so far, in order.
    #[must_use]
    pub fn accesses(&self) -> Vec<u64> {
        self.accesses.borrow().clone()
    }
}

impl Medium for MemoryMedium {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.accesses.borrow_mut().push(offset);

        if self.fail_reads {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }

        let start = match usize::try_from(offset) {
            Ok(start) if start < self.data.len() => start,
            _ => return Ok(0),
        };
        let len = buf.len().min(self.data.len() - start);
        buf[..len].copy_from_slice(&self.data[start..start + len]);
        Ok(len)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.accesses.borrow_mut().push(offset);

        if self.read_only {
            return Err(io::Error::from_raw_os_error(libc::EACCES));
        }

        let start = usize::try_from(offset)
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        let end = start + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        if self.fail_sync {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        Ok(())
    }

    fn byte_size(&self, _kind: TargetKind) -> io::Result<u64> {
        match self.size_error {
            Some(code) => Err(io::Error::from_raw_os_error(code)),
            None => Ok(self.data.len() as u64),
        }
    }
}
