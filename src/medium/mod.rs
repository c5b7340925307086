//! Byte-addressable storage media.
//!
//! A [`Medium`] is the small set of OS capabilities a [`Resource`](crate::Resource)
//! needs: positioned single-buffer reads and writes, a durability flush and a
//! size query. `std::fs::File` implements it for both ordinary files and raw
//! block devices; only the size query and the open flags differ per platform.

mod memory;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as platform;
#[cfg(windows)]
use windows as platform;

use crate::config::TargetKind;
use std::fs::File;
use std::io;
use std::path::Path;

pub use memory::MemoryMedium;

/// Platform capability interface over an open storage handle.
///
/// Implementations pass every call straight to the OS; nothing is cached
/// apart from what the OS itself buffers until [`Medium::sync`].
pub trait Medium {
    /// Read into `buf` starting at `offset`. Returns the number of bytes read.
    ///
    /// The offset is passed with the call, so no cursor needs positioning
    /// first. On POSIX the descriptor's file position is left untouched; on
    /// Windows the file pointer ends up after the bytes read.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Write `buf` starting at `offset`. Returns the number of bytes written.
    ///
    /// Cursor behaviour matches [`Medium::read_at`].
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Force written data onto the underlying medium.
    fn sync(&mut self) -> io::Result<()>;

    /// Total addressable size in bytes.
    ///
    /// `kind` is never [`TargetKind::Auto`] here; it has been resolved by the
    /// caller.
    fn byte_size(&self, kind: TargetKind) -> io::Result<u64>;
}

impl Medium for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        platform::read_at(self, buf, offset)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        platform::write_at(self, buf, offset)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn byte_size(&self, kind: TargetKind) -> io::Result<u64> {
        match kind {
            TargetKind::Disk => platform::device_size(self),
            TargetKind::File | TargetKind::Auto => Ok(self.metadata()?.len()),
        }
    }
}

/// Open `path` for reading and writing without locking it against other
/// processes. The target must already exist.
pub fn open_target(path: &Path) -> io::Result<File> {
    platform::open_read_write(path)
}

/// Resolve [`TargetKind::Auto`] by looking at the path.
///
/// Device nodes (POSIX) and `\\.\` device paths (Windows) are disks,
/// everything else is a file. Explicit kinds are returned unchanged.
pub fn resolve_kind(path: &Path, kind: TargetKind) -> TargetKind {
    match kind {
        TargetKind::Auto if platform::is_device_path(path) => TargetKind::Disk,
        TargetKind::Auto => TargetKind::File,
        explicit => explicit,
    }
}
