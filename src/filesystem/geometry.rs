//! Layout of a mounted FAT32 volume, derived once from its boot sector.

use getset::CopyGetters;

use super::bpb::Bpb;
use super::fat_error::FATError;

/// Sector and cluster geometry of a volume.
///
/// Immutable after mount. Sector numbers are relative to the start of the volume.
#[derive(Debug, Clone, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Geometry {
    bytes_per_sector: u32,
    sectors_per_cluster: u32,
    reserved_sectors: u32,
    fat_count: u32,
    sectors_per_fat: u32,
    total_sectors: u32,
    /// Count of data clusters
    cluster_count: u32,
    /// Count of addressable FAT slots, the two reserved ones included
    fat_entries: u32,
    /// reserved_sectors + fat_count * sectors_per_fat
    first_data_sector: u32,
    root_cluster: u32,
}

impl Geometry {
    /// Derives the geometry of a validated Bpb.
    pub fn from_bpb(bpb: &Bpb) -> Self {
        let cluster_count = bpb.cluster_count();

        Self {
            bytes_per_sector: *bpb.bytes_per_sec() as u32,
            sectors_per_cluster: *bpb.sec_per_clus() as u32,
            reserved_sectors: *bpb.rsvd_sec_cnt() as u32,
            fat_count: *bpb.num_fat() as u32,
            sectors_per_fat: *bpb.fat_sz_32(),
            total_sectors: *bpb.tot_sec_32(),
            cluster_count,
            fat_entries: cluster_count.saturating_add(2),
            first_data_sector: bpb.used_sectors() as u32,
            root_cluster: *bpb.root_clus(),
        }
    }

    /// Size of a cluster in bytes.
    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    /// Byte offset of the first FAT.
    pub fn fat_offset(&self) -> u64 {
        self.reserved_sectors as u64 * self.bytes_per_sector as u64
    }

    /// Size in bytes of one FAT copy.
    pub fn fat_size(&self) -> u64 {
        self.sectors_per_fat as u64 * self.bytes_per_sector as u64
    }

    /// Converts a cluster number to the number of its first sector.
    ///
    /// # Errors
    /// - `FATError::InvalidCluster` for clusters 0 and 1
    /// - `FATError::ClusterOutOfBounds` past the last data cluster
    pub fn clus_to_sector(&self, cluster: u32) -> Result<u64, FATError> {
        if cluster < 2 {
            return Err(FATError::InvalidCluster(cluster));
        }
        if cluster >= self.fat_entries {
            return Err(FATError::ClusterOutOfBounds {
                cluster,
                entries: self.fat_entries,
            });
        }

        Ok(self.first_data_sector as u64
            + (cluster as u64 - 2) * self.sectors_per_cluster as u64)
    }

    /// Byte offset of the first byte of a cluster.
    pub fn cluster_offset(&self, cluster: u32) -> Result<u64, FATError> {
        Ok(self.clus_to_sector(cluster)? * self.bytes_per_sector as u64)
    }

    /// Sector following the data region.
    pub fn data_end(&self) -> u64 {
        self.first_data_sector as u64
            + self.cluster_count as u64 * self.sectors_per_cluster as u64
    }
}
