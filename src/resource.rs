//! Single-bit corruption of a file or raw block device.
//!
//! A [`Resource`] owns one open handle to the target together with the
//! target's size, measured once at open time. Opening never fails as a call:
//! a handle that could not be opened leaves the resource invalid, and a size
//! query that failed leaves it empty. Callers check [`Resource::is_valid`] and
//! [`Resource::is_empty`] before flipping anything.
//!
//! The I/O primitives report failure as `None`/`false` and remember the OS
//! error in [`Resource::last_error`]; nothing here retries.

use crate::config::{TargetKind, BITS_PER_BYTE};
use crate::journal::{Event, Journal};
use crate::medium::{self, Medium};
use crate::random::RandomSource;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// An open storage target.
#[derive(Debug)]
pub struct Resource<M: Medium = File> {
    medium: Option<M>,
    kind: TargetKind,
    size: u64,
    last_error: Option<io::Error>,
    journal: Journal,
}

impl Resource<File> {
    /// Open `path` for reading and writing, reporting to stdout.
    ///
    /// `kind` decides how the size is measured; [`TargetKind::Auto`] is
    /// resolved from the path first.
    pub fn open(path: &Path, kind: TargetKind) -> Self {
        Self::open_with_journal(path, kind, Journal::stdout())
    }

    /// Open `path` for reading and writing, reporting to `journal`.
    pub fn open_with_journal(path: &Path, kind: TargetKind, journal: Journal) -> Self {
        let kind = medium::resolve_kind(path, kind);

        let file = match medium::open_target(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open target");
                return Self {
                    medium: None,
                    kind,
                    size: 0,
                    last_error: Some(e),
                    journal,
                };
            }
        };

        let mut resource = Self::from_medium_inner(file, kind, journal);
        if resource.last_error.is_none() {
            resource.journal.record(&Event::Opened {
                path: path.to_path_buf(),
                size: resource.size,
            });
        }
        resource
    }
}

impl<M: Medium> Resource<M> {
    /// Wrap an already open medium and measure its size.
    ///
    /// `kind` must not be [`TargetKind::Auto`]; without a path there is
    /// nothing to detect from, so it is treated as [`TargetKind::File`].
    pub fn from_medium(medium: M, kind: TargetKind, journal: Journal) -> Self {
        let kind = match kind {
            TargetKind::Auto => TargetKind::File,
            explicit => explicit,
        };
        Self::from_medium_inner(medium, kind, journal)
    }

    fn from_medium_inner(medium: M, kind: TargetKind, journal: Journal) -> Self {
        let (size, last_error) = match medium.byte_size(kind) {
            Ok(size) => (size, None),
            Err(e) => {
                warn!(?kind, error = %e, "size query failed, treating target as empty");
                (0, Some(e))
            }
        };
        debug!(?kind, size, "target sized");

        Self {
            medium: Some(medium),
            kind,
            size,
            last_error,
            journal,
        }
    }

    /// Whether the handle is open and usable.
    pub fn is_valid(&self) -> bool {
        self.medium.is_some()
    }

    /// Whether the target has no addressable bytes.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Size in bytes, fixed at open time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The kind used to measure the size.
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// The OS error captured by the most recent failing call, if any.
    pub fn last_error(&self) -> Option<&io::Error> {
        self.last_error.as_ref()
    }

    /// Take the captured OS error, leaving none behind.
    pub fn take_last_error(&mut self) -> Option<io::Error> {
        self.last_error.take()
    }

    /// The open medium, `None` when the open failed.
    pub fn medium(&self) -> Option<&M> {
        self.medium.as_ref()
    }

    pub(crate) fn record(&mut self, event: &Event) {
        self.journal.record(event);
    }

    /// Read the byte at `offset`. `None` on any failure or short read.
    pub fn read_byte_at(&mut self, offset: u64) -> Option<u8> {
        let medium = self.medium.as_ref()?;
        let mut byte = [0u8; 1];

        match medium.read_at(&mut byte, offset) {
            Ok(1) => Some(byte[0]),
            Ok(_) => {
                self.last_error = Some(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("no byte at offset {}", offset),
                ));
                None
            }
            Err(e) => {
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Write `value` at `offset`. `false` on any failure or short write.
    pub fn write_byte_at(&mut self, offset: u64, value: u8) -> bool {
        let Some(medium) = self.medium.as_mut() else {
            return false;
        };

        match medium.write_at(&[value], offset) {
            Ok(1) => true,
            Ok(_) => {
                self.last_error = Some(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("nothing written at offset {}", offset),
                ));
                false
            }
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }

    /// Push written data onto the medium.
    pub fn flush(&mut self) -> bool {
        let Some(medium) = self.medium.as_mut() else {
            return false;
        };

        match medium.sync() {
            Ok(()) => true,
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }

    /// Flip one uniformly chosen bit of one uniformly chosen byte.
    ///
    /// Draws the offset from `0..size`, reads that byte, and only then draws
    /// the bit index from `0..8`. Otherwise behaves like
    /// [`Resource::flip_bit_at`]. An empty resource is never touched.
    pub fn flip_random_bit(&mut self, rng: &mut impl RandomSource) -> bool {
        if !self.is_valid() || self.is_empty() {
            return false;
        }

        let offset = rng.uniform(0, self.size - 1);
        self.flip_with(offset, || rng.uniform(0, u64::from(BITS_PER_BYTE - 1)) as u8)
    }

    /// Invert bit `bit` of the byte at `offset`, write it back and flush.
    ///
    /// Every outcome is journaled except a failed flush after a successful
    /// write. Out-of-range offsets and bit indices are rejected without any
    /// I/O.
    pub fn flip_bit_at(&mut self, offset: u64, bit: u8) -> bool {
        if bit >= BITS_PER_BYTE {
            debug!(offset, bit, "bit index out of range");
            return false;
        }
        self.flip_with(offset, || bit)
    }

    /// Read, flip the bit chosen after a successful read, write back, flush.
    fn flip_with(&mut self, offset: u64, choose_bit: impl FnOnce() -> u8) -> bool {
        if offset >= self.size {
            debug!(offset, size = self.size, "offset out of range");
            return false;
        }

        let Some(before) = self.read_byte_at(offset) else {
            self.journal.record(&Event::ReadFailed { offset });
            return false;
        };

        let bit = choose_bit();
        let after = before ^ (1 << bit);

        if !self.write_byte_at(offset, after) {
            self.journal.record(&Event::WriteFailed { offset });
            return false;
        }

        if !self.flush() {
            debug!(offset, "flush failed after write");
            return false;
        }

        self.journal.record(&Event::Flipped {
            before,
            after,
            offset,
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::test_support::SharedBuffer;
    use crate::medium::MemoryMedium;
    use crate::random::{RngSource, ScriptedSource};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn memory_resource(medium: MemoryMedium) -> Resource<MemoryMedium> {
        Resource::from_medium(medium, TargetKind::File, Journal::sink())
    }

    #[test]
    fn test_open_sixteen_zero_bytes() {
        let file = create_test_file(&[0u8; 16]);
        let resource = Resource::open_with_journal(file.path(), TargetKind::File, Journal::sink());

        assert!(resource.is_valid());
        assert!(!resource.is_empty());
        assert_eq!(resource.size(), 16);
        assert_eq!(resource.kind(), TargetKind::File);
    }

    #[test]
    fn test_open_reports_size() {
        let file = create_test_file(&[0u8; 16]);
        let buffer = SharedBuffer::default();
        let _resource = Resource::open_with_journal(
            file.path(),
            TargetKind::Auto,
            Journal::new(buffer.clone()),
        );

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("size is 16 bytes."));
    }

    #[test]
    fn test_open_missing_path_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut resource = Resource::open_with_journal(
            &dir.path().join("missing"),
            TargetKind::File,
            Journal::sink(),
        );

        assert!(!resource.is_valid());
        assert!(resource.is_empty());
        assert!(resource.medium().is_none());
        assert!(resource.last_error().and_then(io::Error::raw_os_error).is_some());
        assert_eq!(resource.read_byte_at(0), None);
        assert!(!resource.write_byte_at(0, 1));
        assert!(!resource.flush());
        assert!(!resource.flip_random_bit(&mut RngSource::thread()));
    }

    #[test]
    fn test_open_empty_file_is_valid_but_empty() {
        let file = create_test_file(&[]);
        let buffer = SharedBuffer::default();
        let resource = Resource::open_with_journal(
            file.path(),
            TargetKind::File,
            Journal::new(buffer.clone()),
        );

        assert!(resource.is_valid());
        assert!(resource.is_empty());

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("size is 0 bytes."));
    }

    // A regular file fails the device capacity ioctl.
    #[cfg(any(
        target_os = "macos",
        target_os = "freebsd",
        all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))
    ))]
    #[test]
    fn test_failed_size_query_writes_no_size_line() {
        let file = create_test_file(&[0u8; 8]);
        let buffer = SharedBuffer::default();
        let resource = Resource::open_with_journal(
            file.path(),
            TargetKind::Disk,
            Journal::new(buffer.clone()),
        );

        assert!(resource.is_valid());
        assert!(resource.is_empty());
        assert!(resource.last_error().is_some());
        assert!(buffer.lines().is_empty());
    }

    #[test]
    fn test_bit_is_drawn_only_after_successful_read() {
        let medium = MemoryMedium::with_data(vec![0; 8]).failing_reads();
        let mut resource = memory_resource(medium);
        let mut rng = ScriptedSource::new([2, 5, 9]);

        assert!(!resource.flip_random_bit(&mut rng));
        assert_eq!(rng.remaining(), 2);
    }

    #[test]
    fn test_failed_size_query_leaves_resource_empty() {
        let medium = MemoryMedium::with_data(vec![0; 64]).failing_size(libc::ENOTTY);
        let resource = Resource::from_medium(medium, TargetKind::Disk, Journal::sink());

        assert!(resource.is_valid());
        assert!(resource.is_empty());
        assert_eq!(
            resource.last_error().and_then(io::Error::raw_os_error),
            Some(libc::ENOTTY)
        );
    }

    #[test]
    fn test_read_write_flush_primitives() {
        let mut resource = memory_resource(MemoryMedium::with_data(vec![0x11, 0x22, 0x33]));

        assert_eq!(resource.read_byte_at(1), Some(0x22));
        assert!(resource.write_byte_at(1, 0xEE));
        assert!(resource.flush());
        assert_eq!(resource.read_byte_at(1), Some(0xEE));
        assert_eq!(resource.read_byte_at(3), None);
        assert_eq!(
            resource.last_error().map(io::Error::kind),
            Some(io::ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn test_forced_flip_end_to_end() {
        let file = create_test_file(&[0u8; 16]);
        let buffer = SharedBuffer::default();
        let mut resource = Resource::open_with_journal(
            file.path(),
            TargetKind::File,
            Journal::new(buffer.clone()),
        );

        let mut rng = ScriptedSource::new([5, 3]);
        assert!(resource.flip_random_bit(&mut rng));
        assert_eq!(rng.remaining(), 0);

        for offset in 0..16 {
            let expected = if offset == 5 { 0x08 } else { 0x00 };
            assert_eq!(resource.read_byte_at(offset), Some(expected));
        }
        assert!(resource.flush());
        drop(resource);

        let mut reopened =
            Resource::open_with_journal(file.path(), TargetKind::File, Journal::sink());
        assert_eq!(reopened.read_byte_at(5), Some(0x08));

        let lines = buffer.lines();
        assert!(lines[1].ends_with("Flipped 0x00 -> 0x08 @ 5"));
    }

    #[test]
    fn test_flip_is_xor_of_chosen_bit() {
        for bit in 0..8u8 {
            let mut resource = memory_resource(MemoryMedium::with_data(vec![0xA5; 4]));
            assert!(resource.flip_bit_at(2, bit));
            assert_eq!(resource.read_byte_at(2), Some(0xA5 ^ (1 << bit)));
        }
    }

    #[test]
    fn test_double_flip_restores_byte() {
        let mut resource = memory_resource(MemoryMedium::with_data(vec![0x3C; 8]));

        assert!(resource.flip_bit_at(6, 7));
        assert_eq!(resource.read_byte_at(6), Some(0xBC));
        assert!(resource.flip_bit_at(6, 7));
        assert_eq!(resource.read_byte_at(6), Some(0x3C));
    }

    #[test]
    fn test_random_flips_change_exactly_one_bit() {
        let mut rng = RngSource::seeded(0xB17);
        let mut resource = memory_resource(MemoryMedium::with_data(vec![0x5A; 37]));

        for _ in 0..200 {
            let before = resource.medium().unwrap().data().to_vec();
            assert!(resource.flip_random_bit(&mut rng));
            let after = resource.medium().unwrap().data();

            let distance: u32 = before
                .iter()
                .zip(after)
                .map(|(a, b)| (a ^ b).count_ones())
                .sum();
            assert_eq!(distance, 1);
        }
    }

    #[test]
    fn test_random_offsets_stay_in_bounds() {
        let mut rng = RngSource::seeded(99);
        let mut resource = memory_resource(MemoryMedium::with_data(vec![0; 3]));

        for _ in 0..300 {
            assert!(resource.flip_random_bit(&mut rng));
        }

        let accesses = resource.medium().unwrap().accesses();
        assert_eq!(accesses.len(), 600);
        assert!(accesses.iter().all(|&offset| offset < 3));
        assert_eq!(resource.size(), 3);
    }

    #[test]
    fn test_empty_resource_never_touches_medium() {
        let mut resource = memory_resource(MemoryMedium::new());

        assert!(resource.is_empty());
        assert!(!resource.flip_random_bit(&mut RngSource::thread()));
        assert!(!resource.flip_bit_at(0, 0));
        assert!(resource.medium().unwrap().accesses().is_empty());
    }

    #[test]
    fn test_out_of_range_flip_rejected_without_io() {
        let mut resource = memory_resource(MemoryMedium::with_data(vec![0; 4]));

        assert!(!resource.flip_bit_at(4, 0));
        assert!(!resource.flip_bit_at(0, 8));
        assert!(resource.medium().unwrap().accesses().is_empty());
    }

    #[test]
    fn test_write_failure_leaves_byte_unchanged() {
        let buffer = SharedBuffer::default();
        let medium = MemoryMedium::with_data(vec![0x0F; 8]).read_only();
        let mut resource =
            Resource::from_medium(medium, TargetKind::File, Journal::new(buffer.clone()));

        assert!(!resource.flip_random_bit(&mut ScriptedSource::new([4, 0])));
        assert_eq!(resource.read_byte_at(4), Some(0x0F));
        assert_eq!(
            resource.last_error().and_then(io::Error::raw_os_error),
            Some(libc::EACCES)
        );
        assert!(buffer.lines()[0].ends_with("Failed to write @ 4"));
    }

    #[test]
    fn test_read_failure_is_journaled() {
        let buffer = SharedBuffer::default();
        let medium = MemoryMedium::with_data(vec![0; 8]).failing_reads();
        let mut resource =
            Resource::from_medium(medium, TargetKind::File, Journal::new(buffer.clone()));

        assert!(!resource.flip_bit_at(2, 1));
        assert!(buffer.lines()[0].ends_with("Failed to read @ 2"));
        assert_eq!(resource.medium().unwrap().accesses(), vec![2]);
    }

    #[test]
    fn test_flush_failure_returns_false_without_journal_line() {
        let buffer = SharedBuffer::default();
        let medium = MemoryMedium::with_data(vec![0; 8]).failing_sync();
        let mut resource =
            Resource::from_medium(medium, TargetKind::File, Journal::new(buffer.clone()));

        assert!(!resource.flip_bit_at(1, 1));
        assert!(buffer.lines().is_empty());
        assert!(resource.last_error().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_handle_fails_write() {
        let file = create_test_file(&[0x42; 16]);
        let handle = File::open(file.path()).unwrap();
        let mut resource = Resource::from_medium(handle, TargetKind::File, Journal::sink());

        assert!(!resource.flip_bit_at(7, 2));
        assert!(resource.last_error().and_then(io::Error::raw_os_error).is_some());
        assert_eq!(std::fs::read(file.path()).unwrap(), vec![0x42; 16]);
    }
}
