//! POSIX descriptors: `pread`/`pwrite` and block-device capacity ioctls.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileExt, FileTypeExt};
use std::path::Path;

pub(super) fn open_read_write(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

pub(super) fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    FileExt::read_at(file, buf, offset)
}

pub(super) fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    FileExt::write_at(file, buf, offset)
}

pub(super) fn is_device_path(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| {
            let file_type = meta.file_type();
            file_type.is_block_device() || file_type.is_char_device()
        })
        .unwrap_or(false)
}

/// `_IOR(0x12, 114, size_t)` from `<linux/fs.h>`.
#[cfg(all(
    target_os = "linux",
    any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "arm",
        target_arch = "aarch64",
        target_arch = "riscv64"
    )
))]
const BLKGETSIZE64: u64 =
    (2 << 30) | ((std::mem::size_of::<libc::size_t>() as u64) << 16) | (0x12 << 8) | 114;

#[cfg(all(
    target_os = "linux",
    any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "arm",
        target_arch = "aarch64",
        target_arch = "riscv64"
    )
))]
pub(super) fn device_size(file: &File) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    let mut size: u64 = 0;
    let result = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size as *mut u64) };

    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(size)
}

#[cfg(target_os = "macos")]
pub(super) fn device_size(file: &File) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    // _IOR('d', 24, uint32_t) and _IOR('d', 25, uint64_t) from <sys/disk.h>
    const DKIOCGETBLOCKSIZE: libc::c_ulong = 0x4004_6418;
    const DKIOCGETBLOCKCOUNT: libc::c_ulong = 0x4008_6419;

    let fd = file.as_raw_fd();
    let mut block_size: u32 = 0;
    let mut block_count: u64 = 0;

    if unsafe { libc::ioctl(fd, DKIOCGETBLOCKSIZE, &mut block_size as *mut u32) } != 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::ioctl(fd, DKIOCGETBLOCKCOUNT, &mut block_count as *mut u64) } != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(block_count * u64::from(block_size))
}

#[cfg(target_os = "freebsd")]
pub(super) fn device_size(file: &File) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    // _IOR('d', 129, off_t) from <sys/disk.h>
    const DIOCGMEDIASIZE: libc::c_ulong = 0x4008_6481;

    let mut size: libc::off_t = 0;
    if unsafe { libc::ioctl(file.as_raw_fd(), DIOCGMEDIASIZE, &mut size as *mut libc::off_t) } != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(size as u64)
}

/// Devices on the remaining targets report their capacity as the end offset.
#[cfg(not(any(
    all(
        target_os = "linux",
        any(
            target_arch = "x86",
            target_arch = "x86_64",
            target_arch = "arm",
            target_arch = "aarch64",
            target_arch = "riscv64"
        )
    ),
    target_os = "macos",
    target_os = "freebsd"
)))]
pub(super) fn device_size(file: &File) -> io::Result<u64> {
    use std::io::{Seek, SeekFrom};

    let mut file = file;
    let size = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(0))?;
    Ok(size)
}
