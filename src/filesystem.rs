//! FAT32 filesystem support.
//!
//! Boot sector parsing and validation, the in-memory FAT, directory decoding with long
//! file names, path resolution and file content reads. Every operation runs against a
//! mounted [`fat::FATVol`].

pub mod bpb;
pub mod dir_entry;
pub mod directory;
pub mod fat;
pub mod fat_error;
pub mod fat_table;
pub mod fat_type;
pub mod geometry;
pub mod long_name;
pub mod metadata;
pub mod path;
pub mod reader;
