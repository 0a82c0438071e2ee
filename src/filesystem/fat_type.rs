//! Enum for the different FAT types (FAT12, FAT16, FAT32).
//!
//! The type of a FAT volume is determined by its count of data clusters only.

use std::fmt;

use crate::constants::{FAT16_MIN_CLUSTERS, FAT32_MIN_CLUSTERS};

/// Represents the different types of FAT filesystems.
///
/// Only FAT32 volumes can be mounted.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FATType {
    FAT12,
    FAT16,
    FAT32,
}

impl FATType {
    /// Classifies a volume from its count of data clusters.
    pub fn from_cluster_count(cluster_count: u32) -> Self {
        if cluster_count < FAT16_MIN_CLUSTERS {
            FATType::FAT12
        } else if cluster_count < FAT32_MIN_CLUSTERS {
            FATType::FAT16
        } else {
            FATType::FAT32
        }
    }
}

impl fmt::Display for FATType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FATType::FAT12 => "FAT12",
            FATType::FAT16 => "FAT16",
            FATType::FAT32 => "FAT32",
        };
        write!(f, "{s}")
    }
}
