//! Declaration of traits reused across the code.

use std::fs::File;
use std::io;

use crate::filesystem::fat_error::FATError;

/// Source of raw volume bytes.
///
/// Reads are positioned: the offset is supplied with every call and no cursor is shared,
/// so concurrent reads on different byte ranges do not interfere. A read may return fewer
/// bytes than requested when it reaches the end of the device.
pub trait BlockDevice {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

#[cfg(unix)]
impl BlockDevice for File {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl BlockDevice for File {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl BlockDevice for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.len() => start,
            _ => return Ok(0),
        };
        let len = buf.len().min(self.len() - start);
        buf[..len].copy_from_slice(&self[start..start + len]);
        Ok(len)
    }
}

impl BlockDevice for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for &T {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

/// Implementation of the LayoutDisplay trait.
/// It is used to display the on-disk layout of a given structure such as a volume.
pub trait LayoutDisplay {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error>;
}

/// Renders the directory hierarchy of a structure.
pub trait TreeDisplay {
    fn display_tree(&self) -> Result<String, FATError>;
}
