//! Error types for mounting and traversing a FAT32 volume.
//!
//! [`MountError`] covers a malformed or unsupported boot sector and aborts the mount.
//! [`FATError`] covers failures of the operations run against a mounted volume.

use std::fmt;
use std::io;
use thiserror::Error;

/// Errors that can occur while parsing and validating the boot sector.
#[derive(Error, Debug)]
pub enum MountError {
    /// Bytes per sector must be 512, 1024, 2048 or 4096.
    #[error("Invalid count of bytes per sector: `{0}`. Legal values: 512, 1024, 2048 or 4096")]
    InvalidBytesPerSec(u16),

    /// Sectors per cluster must be a power of 2: 1, 2, 4, 8, 16, 32, 64, or 128.
    #[error(
        "Invalid number of sector per cluster: `{0}`. Legal values: 1, 2, 4, 8, 16, 32, 64, 128"
    )]
    InvalidSecPerClus(u8),

    /// Exactly two FAT copies are supported.
    #[error("Invalid number of FATs on this volume: `{0}`. It should be 2.")]
    InvalidNumFat(u8),

    /// FAT32 keeps its root directory in the data region, so no fixed root region may exist.
    #[error(
        "Invalid count of directory entries in the root directory: `{0}`. It should be 0 for a FAT32 volume."
    )]
    InvalidRootEntCnt(u16),

    /// The legacy 16-bit total sector count must be unused.
    #[error("Invalid BPB_TotSec16: `{0}`. It should be 0 for a FAT32 volume.")]
    InvalidTotSec16(u16),

    /// The legacy 16-bit FAT size must be unused.
    #[error("Invalid BPB_FATSz16: `{0}`. It should be 0 for a FAT32 volume.")]
    InvalidFatSz16(u16),

    #[error("BPB_TotSec32 should be greater than 0 for a FAT32 volume.")]
    InvalidTotSec,

    #[error("BPB_FATSz32 should be greater than 0 for a FAT32 volume.")]
    InvalidFatSz,

    /// Only version 0:0 is defined.
    #[error("Invalid filesystem version: `0x{0:04X}`. It should be 0:0.")]
    InvalidVersion(u16),

    /// The twelve reserved bytes of the FAT32 extended BPB must be zero.
    #[error("Reserved bytes should always be 0, found {0:02X?}")]
    InvalidReserved([u8; 12]),

    /// Clusters 0 and 1 are reserved, and the data area starts at cluster 2.
    #[error(
        "Invalid cluster number of the first cluster of the root directory: `{0}`. This value should be at least 2."
    )]
    InvalidRootClus(u32),

    /// The reserved and FAT regions do not fit in the volume.
    #[error("Filesystem is corrupted: {used} sectors used by the reserved and FAT regions but only {total} sectors in total")]
    Corrupted { total: u32, used: u32 },

    /// The count of data clusters designates another FAT variant.
    #[error("Filesystem is not FAT32: `{0}` detected")]
    UnsupportedFATType(String),

    /// The FAT cannot describe every data cluster.
    #[error("The FAT holds {available} entries but {needed} are needed")]
    FatTooSmall { available: u32, needed: u32 },

    /// Underlying I/O errors that occur while reading the boot sector or the FAT.
    #[error("IO Error: `{0}`")]
    IOError(io::Error),

    /// The boot sector could not be decoded.
    #[error("BinRead Error: `{0}`")]
    BinReadError(binread::Error),
}

/// Errors returned by the operations of a mounted volume.
#[derive(Error, Debug)]
pub enum FATError {
    /// The volume could not be mounted.
    #[error("Mount error: {0}")]
    Mount(MountError),

    /// A cluster chain points at a free or bad cluster, ends early, or loops.
    #[error("Corrupted cluster chain at cluster {0}")]
    CorruptChain(u32),

    /// A cluster index beyond the FAT was looked up.
    #[error("Cluster {cluster} is out of the FAT bounds ({entries} entries)")]
    ClusterOutOfBounds { cluster: u32, entries: u32 },

    /// Clusters 0 and 1 do not address the data region.
    #[error("Invalid cluster number: `{0}`")]
    InvalidCluster(u32),

    /// The file was not found
    #[error("File not found")]
    FileNotFound,

    /// The path exceeds the maximal accepted length.
    #[error("Path too long: {0} bytes")]
    PathTooLong(usize),

    /// A directory operation was requested on a regular file.
    #[error("Not a directory: `{0}`")]
    NotADirectory(String),

    /// Underlying I/O errors, including short reads.
    #[error("IO Error: `{0}`")]
    IOError(io::Error),

    /// Parsing error occured while decoding a directory entry.
    #[error("BinRead Error: `{0}`")]
    BinReadError(binread::Error),

    /// A listing could not be rendered.
    #[error("Formatting Error: `{0}`")]
    FmtError(fmt::Error),

    /// A content read failed after `read` bytes were already copied into the output buffer.
    #[error("Read failed after {read} bytes: {source}")]
    PartialRead {
        read: usize,
        #[source]
        source: Box<FATError>,
    },
}

/// Converts standard I/O errors into MountError.
impl From<io::Error> for MountError {
    fn from(err: io::Error) -> Self {
        MountError::IOError(err)
    }
}

/// Converts BinRead errors into MountError.
impl From<binread::Error> for MountError {
    fn from(err: binread::Error) -> Self {
        MountError::BinReadError(err)
    }
}

/// Converts standard I/O errors into FATError.
impl From<io::Error> for FATError {
    fn from(err: io::Error) -> Self {
        FATError::IOError(err)
    }
}

/// Converts BinRead errors into FATError.
impl From<binread::Error> for FATError {
    fn from(err: binread::Error) -> Self {
        FATError::BinReadError(err)
    }
}

/// Converts mount errors into FATError.
impl From<MountError> for FATError {
    fn from(err: MountError) -> Self {
        FATError::Mount(err)
    }
}

/// Converts formatting errors into FATError.
impl From<fmt::Error> for FATError {
    fn from(err: fmt::Error) -> Self {
        FATError::FmtError(err)
    }
}
