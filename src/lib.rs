//!
//! vfat_reader: A read-only FAT32 traversal library and CLI for disk images.
//!
//! This crate provides tools for:
//! - Mounting a FAT32 volume: boot sector validation, geometry and FAT load
//! - Walking cluster chains
//! - Listing directories, long file names included
//! - Resolving slash-separated paths and reading file contents
//! - Printing the volume layout and directory tree
//!
//! Every operation reads the backing device through positioned reads and nothing is
//! written back, so a mounted volume can be shared between threads.
//!
//! # Re-exports
//! - [`FATVol`]: Mounted FAT32 volume
//! - [`FileMetadata`]: Metadata of a directory entry
//! - [`FATError`] and [`MountError`]: Error types
//! - [`BlockDevice`]: Positioned read source backing a volume

pub mod commands;
pub mod constants;
pub mod filesystem;
pub mod traits;
pub mod utils;

#[doc(hidden)]
pub mod testing;

/// Mounted FAT32 volume (see [`filesystem::fat::FATVol`]).
pub use crate::filesystem::fat::FATVol;
pub use crate::filesystem::fat_error::{FATError, MountError};
pub use crate::filesystem::fat_table::NextCluster;
/// Metadata of a file or directory (see [`filesystem::metadata::FileMetadata`]).
pub use crate::filesystem::metadata::FileMetadata;
pub use crate::traits::BlockDevice;
