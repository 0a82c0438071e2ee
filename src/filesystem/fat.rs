//! FAT volume structure and operations.
//!
//! This module implements the mount of a FAT32 volume. The mounted [`FATVol`] is the
//! context every other operation runs against:
//! - Listing directory entries (see [`super::directory`])
//! - Resolving paths (see [`super::path`])
//! - Reading file contents (see [`super::reader`])
//! - Displaying the volume layout and directory tree

use chrono::Utc;
use getset::Getters;
use log::debug;
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;

use super::bpb::Bpb;
use super::fat_error::{FATError, MountError};
use super::fat_table::{FatTable, NextCluster};
use super::geometry::Geometry;
use super::metadata::FileMetadata;
use crate::traits::{BlockDevice, LayoutDisplay, TreeDisplay};

/// Structure for a mounted FAT32 volume.
///
/// Owns the device, the geometry and the FAT. Nothing is modified after mount, so a
/// volume over a `Sync` device can serve concurrent readers without locking.
#[derive(Getters)]
pub struct FATVol<D: BlockDevice> {
    /// The backing device.
    #[get = "pub"]
    device: D,
    /// The boot sector the volume was mounted from.
    #[get = "pub"]
    bpb: Bpb,
    #[get = "pub"]
    geometry: Geometry,
    #[get = "pub"]
    fat: FatTable,
    /// Metadata of the root directory, which no directory entry describes.
    #[get = "pub"]
    root: FileMetadata,
}

impl<D: BlockDevice> FATVol<D> {
    /// Mounts the FAT32 volume found on `device`.
    ///
    /// Reads and validates the boot sector, derives the geometry and loads the first FAT.
    ///
    /// # Errors
    /// - Returns `MountError::IOError` if the boot sector or the FAT cannot be read
    /// - Returns the `MountError` naming the first boot sector field failing validation
    pub fn mount(device: D) -> Result<Self, MountError> {
        let bpb = Bpb::from(&device)?;
        let geometry = Geometry::from_bpb(&bpb);
        debug!("Mounting FAT32 volume: {geometry:?}");

        let fat = FatTable::load(&device, &geometry)?;
        let root = FileMetadata::root(geometry.root_cluster(), Utc::now());

        Ok(Self {
            device,
            bpb,
            geometry,
            fat,
            root,
        })
    }

    /// Returns the cluster following `cluster` in its chain.
    ///
    /// # Errors
    /// - `FATError::ClusterOutOfBounds` if `cluster` is not covered by the FAT
    pub fn next_cluster(&self, cluster: u32) -> Result<NextCluster, FATError> {
        self.fat.next(cluster)
    }

    /// Recursively prints the directory tree starting from the given cluster.
    ///
    /// # Parameters
    /// - `cluster`: The starting cluster number for the directory.
    /// - `indent`: The indentation level for pretty-printing.
    /// - `seen`: Directories already printed, so a corrupted tree cannot loop.
    fn print_dir_rec(
        &self,
        out: &mut impl FmtWrite,
        cluster: u32,
        indent: usize,
        seen: &mut HashSet<u32>,
    ) -> Result<(), FATError> {
        if !seen.insert(cluster) {
            return Ok(());
        }

        for entry in self.list_dir(cluster)? {
            if entry.name() == "." || entry.name() == ".." {
                continue;
            }

            writeln!(
                out,
                "{}{}{} {}B",
                " ".repeat(indent),
                entry.name(),
                if entry.is_dir() { "/" } else { "" },
                entry.size()
            )?;
            if entry.is_dir() && entry.cluster() >= 2 {
                self.print_dir_rec(out, entry.cluster(), indent + 3, seen)?;
            }
        }

        Ok(())
    }
}

/// Implements the LayoutDisplay trait for FATVol
impl<D: BlockDevice> LayoutDisplay for FATVol<D> {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());
        let geo = &self.geometry;

        writeln!(out, "{}┌{:─^55}┐", indent, " FAT32 Volume Layout ")?;
        writeln!(
            out,
            "{}├{:^12}┬{:^12}┬{:^12}┬{:^16}┤",
            indent, "Region", "Start", "End", "Description"
        )?;
        writeln!(
            out,
            "{}├{:─<12}┼{:─<12}┼{:─<12}┼{:─<16}┤",
            indent, "", "", "", ""
        )?;

        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Reserved",
            0,
            geo.reserved_sectors(),
            "Boot + Reserved"
        )?;
        for i in 0..geo.fat_count() {
            let fat_i_start = geo.reserved_sectors() + i * geo.sectors_per_fat();
            let fat_i_end = fat_i_start + geo.sectors_per_fat();
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                format!("FAT #{i}"),
                fat_i_start,
                fat_i_end,
                if i == 0 { "FAT (in use)" } else { "FAT (copy)" }
            )?;
        }
        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Data",
            geo.first_data_sector(),
            geo.data_end(),
            format!("{} clusters", geo.cluster_count())
        )?;
        if geo.data_end() < geo.total_sectors() as u64 {
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                "",
                geo.data_end(),
                geo.total_sectors(),
                "Volume Slack"
            )?;
        }

        writeln!(
            out,
            "{}└{:─<12}┴{:─<12}┴{:─<12}┴{:─<16}┘",
            indent, "", "", "", ""
        )?;

        Ok(out)
    }
}

impl<D: BlockDevice> TreeDisplay for FATVol<D> {
    fn display_tree(&self) -> Result<String, FATError> {
        let mut out = String::from("/\n");
        self.print_dir_rec(&mut out, self.root.cluster(), 3, &mut HashSet::new())?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::dir_entry::ATTR_DIRECTORY;
    use crate::testing::{BootSector, ImageBuilder, short_slot};

    #[test]
    fn mount_derives_geometry_and_root() {
        let vol = FATVol::mount(ImageBuilder::new().build()).unwrap();

        assert_eq!(vol.geometry().root_cluster(), 2);
        assert_eq!(*vol.bpb().fat_sz_32(), 520);
        assert_eq!(vol.geometry().fat_entries(), 65538);
        assert_eq!(vol.fat().len(), 65538);
        assert!(vol.root().is_dir());
        assert_eq!(vol.root().cluster(), 2);
        assert_eq!(vol.next_cluster(2).unwrap(), NextCluster::EndOfChain);
    }

    #[test]
    fn mount_rejects_single_fat() {
        let image = ImageBuilder::with_boot(BootSector {
            num_fat: 1,
            ..Default::default()
        })
        .build();

        assert!(matches!(
            FATVol::mount(image),
            Err(MountError::InvalidNumFat(1))
        ));
    }

    #[test]
    fn mount_rejects_truncated_device() {
        let mut bytes = vec![0u8; 4096];
        bytes[..512].copy_from_slice(&BootSector::default().to_bytes());

        assert!(matches!(
            FATVol::mount(bytes),
            Err(MountError::IOError(_))
        ));
    }

    #[test]
    fn mount_rejects_fat_too_small() {
        // 100 sectors per FAT describe 12800 clusters only.
        let image = ImageBuilder::with_boot(BootSector {
            fat_sz_32: 100,
            tot_sec_32: 32 + 200 + 70_000,
            ..Default::default()
        })
        .build();

        assert!(matches!(
            FATVol::mount(image),
            Err(MountError::FatTooSmall {
                available: 12800,
                needed: 70_002
            })
        ));
    }

    #[test]
    fn mount_rejects_fat_larger_than_device() {
        // Passes every boot sector check but claims a FAT of about 8 TiB.
        let boot = BootSector {
            bytes_per_sec: 4096,
            fat_sz_32: 0x7FFF_0000,
            tot_sec_32: u32::MAX,
            ..Default::default()
        };
        let mut bytes = vec![0u8; 8192];
        bytes[..512].copy_from_slice(&boot.to_bytes());

        assert!(matches!(
            FATVol::mount(bytes),
            Err(MountError::IOError(_))
        ));
    }

    #[test]
    fn next_cluster_matches_fat_at_mount() {
        let mut builder = ImageBuilder::new();
        builder.set_fat(5, 6);
        builder.set_fat(6, 0x0FFF_FFFF);
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(vol.next_cluster(5).unwrap(), NextCluster::Cluster(6));
        assert_eq!(vol.next_cluster(6).unwrap(), NextCluster::EndOfChain);
        assert_eq!(vol.next_cluster(7).unwrap(), NextCluster::Invalid);
        assert!(vol.next_cluster(70_000).is_err());
    }

    #[test]
    fn layout_lists_regions() {
        let vol = FATVol::mount(ImageBuilder::new().build()).unwrap();
        let layout = vol.display_layout(0).unwrap();

        assert!(layout.contains("FAT #0"));
        assert!(layout.contains("FAT #1"));
        assert!(layout.contains("65536 clusters"));
    }

    /// Fails every write.
    struct FullSink;

    impl FmtWrite for FullSink {
        fn write_str(&mut self, _: &str) -> std::fmt::Result {
            Err(std::fmt::Error)
        }
    }

    #[test]
    fn tree_reports_write_failures() {
        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &[short_slot(b"TOP     TXT", 0, 0, 0)]);
        let vol = FATVol::mount(builder.build()).unwrap();

        assert!(matches!(
            vol.print_dir_rec(&mut FullSink, 2, 3, &mut HashSet::new()),
            Err(FATError::FmtError(_))
        ));
    }

    #[test]
    fn tree_recurses_into_directories() {
        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                short_slot(b"DOCS       ", ATTR_DIRECTORY, 3, 0),
                short_slot(b"TOP     TXT", 0, 0, 0),
            ],
        );
        builder.write_dir(
            &[3],
            &[
                short_slot(b".          ", ATTR_DIRECTORY, 3, 0),
                short_slot(b"..         ", ATTR_DIRECTORY, 0, 0),
                short_slot(b"INNER   TXT", 0, 0, 12),
            ],
        );
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(
            vol.display_tree().unwrap(),
            "/\n   DOCS/ 0B\n      INNER.TXT 12B\n   TOP.TXT 0B\n"
        );
    }
}
