//! Windows file handles: offset-addressed I/O and drive geometry.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::windows::fs::{FileExt, OpenOptionsExt};
use std::os::windows::io::AsRawHandle;
use std::path::Path;
use windows_sys::Win32::Storage::FileSystem::{
    FILE_FLAG_RANDOM_ACCESS, FILE_SHARE_READ, FILE_SHARE_WRITE,
};
use windows_sys::Win32::System::Ioctl::{DISK_GEOMETRY, IOCTL_DISK_GET_DRIVE_GEOMETRY};
use windows_sys::Win32::System::IO::DeviceIoControl;

const DEVICE_NAMESPACE: &str = r"\\.\";

pub(super) fn open_read_write(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE)
        .custom_flags(FILE_FLAG_RANDOM_ACCESS)
        .open(path)
}

// `seek_read`/`seek_write` on a synchronous handle also move the file
// pointer; nothing here depends on it.
pub(super) fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    FileExt::seek_read(file, buf, offset)
}

pub(super) fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    FileExt::seek_write(file, buf, offset)
}

pub(super) fn is_device_path(path: &Path) -> bool {
    path.to_str()
        .map(|p| p.starts_with(DEVICE_NAMESPACE))
        .unwrap_or(false)
}

/// Capacity as cylinders × tracks × sectors × bytes per sector.
pub(super) fn device_size(file: &File) -> io::Result<u64> {
    let mut geometry: DISK_GEOMETRY = unsafe { std::mem::zeroed() };
    let mut bytes_returned: u32 = 0;

    let ok = unsafe {
        DeviceIoControl(
            file.as_raw_handle() as _,
            IOCTL_DISK_GET_DRIVE_GEOMETRY,
            std::ptr::null(),
            0,
            &mut geometry as *mut DISK_GEOMETRY as *mut _,
            std::mem::size_of::<DISK_GEOMETRY>() as u32,
            &mut bytes_returned,
            std::ptr::null_mut(),
        )
    };

    if ok == 0 {
        return Err(io::Error::last_os_error());
    }

    debug_assert_eq!(bytes_returned as usize, std::mem::size_of::<DISK_GEOMETRY>());

    Ok(geometry.Cylinders as u64
        * u64::from(geometry.TracksPerCylinder)
        * u64::from(geometry.SectorsPerTrack)
        * u64::from(geometry.BytesPerSector))
}
