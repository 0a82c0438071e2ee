//! In-memory File Allocation Table and cluster chain walking.
//!
//! The first FAT copy is loaded once at mount and never modified. Chains are walked
//! lazily, one lookup per link, and every walk is capped at the count of FAT entries so
//! a circular chain is reported instead of looping forever.

use log::{debug, trace};

use super::fat_error::{FATError, MountError};
use super::geometry::Geometry;
use crate::constants::{BAD_CLUSTER, END_OF_CHAIN, FAT32_ENTRY_MASK};
use crate::traits::BlockDevice;
use crate::utils::{self, u32_at};

/// Bytes of FAT read per device access at mount.
const FAT_CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of a FAT lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextCluster {
    /// The chain continues with this cluster.
    Cluster(u32),
    EndOfChain,
    /// The entry is free, bad, reserved or points outside the FAT.
    Invalid,
}

/// Read-only copy of the first FAT, indexed by cluster number.
#[derive(Debug, Clone)]
pub struct FatTable {
    entries: Vec<u32>,
}

impl FatTable {
    /// Loads the first FAT of the volume.
    ///
    /// Only the entries addressing the data region are kept. They are read in chunks, so a
    /// boot sector claiming more than the device holds fails on the first missing chunk.
    ///
    /// # Errors
    /// - `MountError::IOError` if the FAT cannot be read entirely
    /// - `MountError::FatTooSmall` if the FAT cannot describe every data cluster
    pub fn load<D: BlockDevice + ?Sized>(
        device: &D,
        geometry: &Geometry,
    ) -> Result<Self, MountError> {
        let available = geometry.fat_size() / 4;
        let needed = geometry.fat_entries();
        if available < needed as u64 {
            return Err(MountError::FatTooSmall {
                available: available as u32,
                needed,
            });
        }

        let mut entries = Vec::new();
        let mut chunk = vec![0u8; FAT_CHUNK_SIZE];
        let mut offset = geometry.fat_offset();
        while entries.len() < needed as usize {
            let len = FAT_CHUNK_SIZE.min((needed as usize - entries.len()) * 4);
            utils::read_exact_at(device, offset, &mut chunk[..len])?;

            entries.extend((0..len).step_by(4).map(|i| u32_at(&chunk, i)));
            offset += len as u64;
        }
        debug!("Loaded {needed} FAT entries");

        Ok(Self { entries })
    }

    /// Builds a table from raw entries.
    pub fn from_entries(entries: Vec<u32>) -> Self {
        Self { entries }
    }

    /// Count of entries in the table.
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the cluster following `cluster` in its chain.
    ///
    /// # Errors
    /// - `FATError::ClusterOutOfBounds` if `cluster` is not an index of the table
    pub fn next(&self, cluster: u32) -> Result<NextCluster, FATError> {
        let value = match self.entries.get(cluster as usize) {
            Some(value) => value & FAT32_ENTRY_MASK,
            None => {
                return Err(FATError::ClusterOutOfBounds {
                    cluster,
                    entries: self.len(),
                });
            }
        };

        let next = if value >= END_OF_CHAIN {
            NextCluster::EndOfChain
        } else if value < 2 || value == BAD_CLUSTER || value >= self.len() {
            NextCluster::Invalid
        } else {
            NextCluster::Cluster(value)
        };

        Ok(next)
    }

    /// Iterates over the chain starting at `start`.
    pub fn chain(&self, start: u32) -> ClusterChain<'_> {
        ClusterChain {
            fat: self,
            state: ChainState::Start(start),
            visited: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ChainState {
    Start(u32),
    After(u32),
    Done,
}

/// Lazy walk over a cluster chain.
///
/// Yields the clusters of the chain in order. The walk stops after the end-of-chain
/// marker, or after yielding a single error when the chain is broken.
#[derive(Debug, Clone)]
pub struct ClusterChain<'a> {
    fat: &'a FatTable,
    state: ChainState,
    visited: u32,
}

impl Iterator for ClusterChain<'_> {
    type Item = Result<u32, FATError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cluster = match self.state {
            ChainState::Done => return None,
            ChainState::Start(cluster) => {
                if cluster < 2 {
                    self.state = ChainState::Done;
                    return Some(Err(FATError::InvalidCluster(cluster)));
                }
                if cluster >= self.fat.len() {
                    self.state = ChainState::Done;
                    return Some(Err(FATError::ClusterOutOfBounds {
                        cluster,
                        entries: self.fat.len(),
                    }));
                }
                cluster
            }
            ChainState::After(previous) => match self.fat.next(previous) {
                Ok(NextCluster::Cluster(cluster)) => cluster,
                Ok(NextCluster::EndOfChain) => {
                    self.state = ChainState::Done;
                    return None;
                }
                Ok(NextCluster::Invalid) => {
                    self.state = ChainState::Done;
                    return Some(Err(FATError::CorruptChain(previous)));
                }
                Err(err) => {
                    self.state = ChainState::Done;
                    return Some(Err(err));
                }
            },
        };

        // No chain can be longer than the count of clusters.
        if self.visited >= self.fat.len() {
            self.state = ChainState::Done;
            return Some(Err(FATError::CorruptChain(cluster)));
        }
        self.visited += 1;

        trace!("Chain step {}: cluster {cluster}", self.visited);
        self.state = ChainState::After(cluster);
        Some(Ok(cluster))
    }
}
