//! FAT32 boot sector structure.
//!
//! This module implements:
//! - BIOS Parameter Block (Bpb) parsing
//! - Validation of the fields a FAT32 volume must carry before it can be mounted
//! - FAT type detection from the count of data clusters

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use log::warn;
use std::fmt;
use std::io;

use super::fat_error::MountError;
use super::fat_type::FATType;
use crate::constants::{EXPECTED_BACKUP_SECTOR, REQUIRED_FAT_COUNT};
use crate::traits::BlockDevice;
use crate::utils;

/// Size of the boot sector structure, independent of the sector size of the volume.
pub const BOOT_SECTOR_SIZE: usize = 512;

/// BIOS Parameter Block structure for FAT32 filesystems.
///
/// The Bpb contains essential information about the filesystem layout and properties.
#[derive(BinRead, Debug, Getters)]
#[br(little)]
pub struct Bpb {
    /// Jump instruction to boot code
    jmp: [u8; 3],
    /// OEM identifier (e.g., "MSWIN4.1")
    oem_name: [u8; 8],
    /// Number of bytes per sector (512, 1024, 2048, or 4096)
    #[get = "pub"]
    bytes_per_sec: u16,
    /// Number of sectors per cluster (power of 2: 1, 2, 4, 8, 16, 32, 64, or 128)
    #[get = "pub"]
    sec_per_clus: u8,
    /// Number of reserved sectors from start of volume
    #[get = "pub"]
    rsvd_sec_cnt: u16,
    /// Number of FAT copies (must be 2)
    #[get = "pub"]
    num_fat: u8,
    /// Maximum number of root directory entries (0 for FAT32)
    root_ent_cnt: u16,
    /// Total sectors for volumes < 32MB (0 for FAT32)
    tot_sec_16: u16,
    /// Media descriptor (0xF8 for fixed disk)
    media: u8,
    /// Sectors per FAT for FAT12/FAT16 (0 for FAT32)
    fat_sz_16: u16,
    /// Sectors per track
    sec_per_trl: u16,
    /// Number of heads
    num_heds: u16,
    /// Number of hidden sectors preceding the partition
    hidd_sec: u32,
    /// Total sectors of the volume
    #[get = "pub"]
    tot_sec_32: u32,

    // FAT32-specific fields
    /// Sectors per FAT
    #[get = "pub"]
    fat_sz_32: u32,
    /// FAT flags (mirroring, active FAT)
    ext_flags: u16,
    /// Filesystem version (should be 0:0)
    fs_ver: u16,
    /// First cluster of root directory (typically 2)
    #[get = "pub"]
    root_clus: u32,
    /// Sector number of FSINFO structure
    fs_info: u16,
    /// Sector number of backup boot sector
    bk_boot_sec: u16,
    /// Reserved for future expansion
    reserved: [u8; 12],
    /// Drive number (0x80 for hard disk)
    drv_num: u8,
    /// Reserved (used by Windows NT)
    reserved_1: u8,
    /// Extended boot signature (0x29)
    boot_sig: u8,
    /// Volume serial number
    vol_id: u32,
    /// Volume label (11 bytes)
    vol_lab: [u8; 11],
    /// Filesystem type label ("FAT32   ")
    fil_sys_type: [u8; 8],

    /// Boot code, outside the Bpb proper
    #[br(count = 420)]
    boot_code: Vec<u8>,
    /// Boot sector signature (0x55 0xAA)
    sig: [u8; 2],
}

impl Bpb {
    /// Reads and validates the Bpb found at the start of the device.
    ///
    /// # Returns
    /// - `Ok(Bpb)`: The parsed and validated Bpb structure
    /// - `Err(MountError)`: If reading fails or any validation check fails
    pub fn from<D: BlockDevice + ?Sized>(device: &D) -> Result<Bpb, MountError> {
        let mut buf = vec![0; BOOT_SECTOR_SIZE];
        utils::read_exact_at(device, 0, &mut buf)?;

        Self::from_bytes(&buf)
    }

    /// Parses and validates a Bpb from the raw bytes of a boot sector.
    pub fn from_bytes(buf: &[u8]) -> Result<Bpb, MountError> {
        let mut reader = io::Cursor::new(buf);
        let bpb: Bpb = reader.read_le()?;

        bpb.validate()
    }

    /// Sectors taken by the reserved region and every FAT copy.
    pub fn used_sectors(&self) -> u64 {
        self.rsvd_sec_cnt as u64 + self.num_fat as u64 * self.fat_sz_32 as u64
    }

    /// Determines the number of clusters in the data section.
    ///
    /// Must only be called once the fields are validated.
    pub fn cluster_count(&self) -> u32 {
        let data_sec = (self.tot_sec_32 as u64).saturating_sub(self.used_sectors());
        (data_sec / self.sec_per_clus as u64) as u32
    }

    /// Determines the FAT type based on the number of clusters in the filesystem.
    pub fn fat_type(&self) -> FATType {
        FATType::from_cluster_count(self.cluster_count())
    }

    /// Validates the Bpb structure.
    ///
    /// The checks run in a fixed order and the first violation is reported.
    ///
    /// # Errors
    /// - `MountError::InvalidNumFat`: If there are not exactly 2 FATs
    /// - `MountError::InvalidRootEntCnt`: If root directory entries is not 0
    /// - `MountError::InvalidTotSec16`, `MountError::InvalidFatSz16`: If legacy fields are used
    /// - `MountError::InvalidTotSec`, `MountError::InvalidFatSz`: If the FAT32 fields are 0
    /// - `MountError::InvalidVersion`: If the version is not 0:0
    /// - `MountError::InvalidReserved`: If a reserved byte is set
    /// - `MountError::InvalidBytesPerSec`, `MountError::InvalidSecPerClus`: On illegal geometry
    /// - `MountError::InvalidRootClus`: If root directory cluster is less than 2
    /// - `MountError::Corrupted`: If the reserved and FAT regions exceed the volume
    /// - `MountError::UnsupportedFATType`: If the volume is not FAT32
    fn validate(self) -> Result<Self, MountError> {
        if self.num_fat != REQUIRED_FAT_COUNT {
            return Err(MountError::InvalidNumFat(self.num_fat));
        }

        if self.root_ent_cnt != 0 {
            return Err(MountError::InvalidRootEntCnt(self.root_ent_cnt));
        }

        if self.tot_sec_16 != 0 {
            return Err(MountError::InvalidTotSec16(self.tot_sec_16));
        }
        if self.fat_sz_16 != 0 {
            return Err(MountError::InvalidFatSz16(self.fat_sz_16));
        }

        if self.tot_sec_32 == 0 {
            return Err(MountError::InvalidTotSec);
        }
        if self.fat_sz_32 == 0 {
            return Err(MountError::InvalidFatSz);
        }

        if self.fs_ver != 0 {
            return Err(MountError::InvalidVersion(self.fs_ver));
        }

        if self.reserved.iter().any(|&byte| byte != 0) {
            return Err(MountError::InvalidReserved(self.reserved));
        }

        const VALID_BYTES_PER_SEC: [u16; 4] = [512, 1024, 2048, 4096];
        if !VALID_BYTES_PER_SEC.contains(&self.bytes_per_sec) {
            return Err(MountError::InvalidBytesPerSec(self.bytes_per_sec));
        }

        const VALID_SEC_PER_CLUS: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];
        if !VALID_SEC_PER_CLUS.contains(&self.sec_per_clus) {
            return Err(MountError::InvalidSecPerClus(self.sec_per_clus));
        }

        if self.root_clus < 2 {
            return Err(MountError::InvalidRootClus(self.root_clus));
        }

        if self.bk_boot_sec != EXPECTED_BACKUP_SECTOR {
            warn!(
                "Backup boot sector is usually at sector {EXPECTED_BACKUP_SECTOR}, found {}",
                self.bk_boot_sec
            );
        }

        let used = self.used_sectors();
        if (self.tot_sec_32 as u64) < used {
            return Err(MountError::Corrupted {
                total: self.tot_sec_32,
                used: used.min(u32::MAX as u64) as u32,
            });
        }

        let fat_type = self.fat_type();
        if fat_type != FATType::FAT32 {
            return Err(MountError::UnsupportedFATType(fat_type.to_string()));
        }

        Ok(self)
    }
}

/// Implements the Display trait for Bpb
impl fmt::Display for Bpb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;

        macro_rules! field {
            ($name:expr, $val:expr, $size:expr) => {{
                writeln!(f, "  {:<20} 0x{:>04X}: {}", $name, offset, $val)?;
                offset += $size;
            }};
        }

        writeln!(f, "BIOS Parameter Block (Bpb):")?;

        field!("jmp", format!("{:02X?}", self.jmp), 3);
        field!("oem_name", String::from_utf8_lossy(&self.oem_name), 8);
        field!("bytes_per_sec", self.bytes_per_sec, 2);
        field!("sec_per_clus", self.sec_per_clus, 1);
        field!("rsvd_sec_cnt", self.rsvd_sec_cnt, 2);
        field!("num_fat", self.num_fat, 1);
        field!("root_ent_cnt", self.root_ent_cnt, 2);
        field!("tot_sec_16", self.tot_sec_16, 2);
        field!("media", format!("0x{:X}", self.media), 1);
        field!("fat_sz_16", self.fat_sz_16, 2);
        field!("sec_per_trl", self.sec_per_trl, 2);
        field!("num_heds", self.num_heds, 2);
        field!("hidd_sec", self.hidd_sec, 4);
        field!("tot_sec_32", self.tot_sec_32, 4);
        field!("fat_sz_32", self.fat_sz_32, 4);
        field!("ext_flags", self.ext_flags, 2);
        field!("fs_ver", self.fs_ver, 2);
        field!("root_clus", self.root_clus, 4);
        field!("fs_info", self.fs_info, 2);
        field!("bk_boot_sec", self.bk_boot_sec, 2);
        field!("reserved", format!("{:02X?}", &self.reserved[..]), 12);
        field!("drv_num", format!("0x{:X}", self.drv_num), 1);
        field!("reserved_1", self.reserved_1, 1);
        field!("boot_sig", format!("0x{:X}", self.boot_sig), 1);
        field!("vol_id", format!("0x{:X}", self.vol_id), 4);
        field!("vol_lab", String::from_utf8_lossy(&self.vol_lab), 11);
        field!(
            "fil_sys_type",
            String::from_utf8_lossy(&self.fil_sys_type),
            8
        );

        offset += self.boot_code.len();
        writeln!(f, "  {:<20} 0x{:>04X}: {:02X?}", "sig", offset, self.sig)
    }
}
