//! Builders of in-memory FAT32 images for tests.
//!
//! The smallest FAT32 volume spans tens of megabytes, so images are sparse: only the
//! pages written by a test are allocated and everything else reads as zero.

use std::collections::BTreeMap;
use std::io::{self, Seek, SeekFrom, Write};

use crate::constants::{DIR_ENTRY_SIZE, LFN_CHARS};
use crate::filesystem::dir_entry::ATTR_LONG_NAME;
use crate::filesystem::long_name::checksum;
use crate::traits::BlockDevice;

pub const CREATION_TIME: u16 = (10 << 11) | (30 << 5) | 5;
/// 2020-06-15
pub const CREATION_DATE: u16 = (40 << 9) | (6 << 5) | 15;
/// 2022-01-02
pub const ACCESS_DATE: u16 = (42 << 9) | (1 << 5) | 2;
pub const WRITE_TIME: u16 = (23 << 11) | (59 << 5) | 29;
/// 2021-12-31
pub const WRITE_DATE: u16 = (41 << 9) | (12 << 5) | 31;

const PAGE_SIZE: u64 = 4096;
const EOC: u32 = 0x0FFF_FFFF;

/// Editable fields of a FAT32 boot sector.
#[derive(Debug, Clone)]
pub struct BootSector {
    pub bytes_per_sec: u16,
    pub sec_per_clus: u8,
    pub rsvd_sec_cnt: u16,
    pub num_fat: u8,
    pub root_ent_cnt: u16,
    pub tot_sec_16: u16,
    pub fat_sz_16: u16,
    pub tot_sec_32: u32,
    pub fat_sz_32: u32,
    pub fs_ver: u16,
    pub root_clus: u32,
    pub bk_boot_sec: u16,
    pub reserved: [u8; 12],
}

impl Default for BootSector {
    /// 65536 clusters of one 512-byte sector.
    fn default() -> Self {
        Self {
            bytes_per_sec: 512,
            sec_per_clus: 1,
            rsvd_sec_cnt: 32,
            num_fat: 2,
            root_ent_cnt: 0,
            tot_sec_16: 0,
            fat_sz_16: 0,
            tot_sec_32: 32 + 2 * 520 + 65536,
            fat_sz_32: 520,
            fs_ver: 0,
            root_clus: 2,
            bk_boot_sec: 6,
            reserved: [0; 12],
        }
    }
}

impl BootSector {
    pub fn to_bytes(&self) -> [u8; 512] {
        let mut buf = [0u8; 512];
        buf[..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        buf[3..11].copy_from_slice(b"MSWIN4.1");
        buf[11..13].copy_from_slice(&self.bytes_per_sec.to_le_bytes());
        buf[13] = self.sec_per_clus;
        buf[14..16].copy_from_slice(&self.rsvd_sec_cnt.to_le_bytes());
        buf[16] = self.num_fat;
        buf[17..19].copy_from_slice(&self.root_ent_cnt.to_le_bytes());
        buf[19..21].copy_from_slice(&self.tot_sec_16.to_le_bytes());
        buf[21] = 0xF8;
        buf[22..24].copy_from_slice(&self.fat_sz_16.to_le_bytes());
        buf[32..36].copy_from_slice(&self.tot_sec_32.to_le_bytes());
        buf[36..40].copy_from_slice(&self.fat_sz_32.to_le_bytes());
        buf[42..44].copy_from_slice(&self.fs_ver.to_le_bytes());
        buf[44..48].copy_from_slice(&self.root_clus.to_le_bytes());
        buf[48..50].copy_from_slice(&1u16.to_le_bytes());
        buf[50..52].copy_from_slice(&self.bk_boot_sec.to_le_bytes());
        buf[52..64].copy_from_slice(&self.reserved);
        buf[66] = 0x29;
        buf[71..82].copy_from_slice(b"NO NAME    ");
        buf[82..90].copy_from_slice(b"FAT32   ");
        buf[510] = 0x55;
        buf[511] = 0xAA;
        buf
    }
}

/// Device made of 4 KiB pages, allocated on first write.
#[derive(Debug, Clone, Default)]
pub struct SparseImage {
    pages: BTreeMap<u64, Vec<u8>>,
    len: u64,
}

impl SparseImage {
    pub fn new(len: u64) -> Self {
        Self {
            pages: BTreeMap::new(),
            len,
        }
    }

    pub fn write(&mut self, offset: u64, data: &[u8]) {
        let mut written = 0;
        while written < data.len() {
            let at = offset + written as u64;
            let in_page = (at % PAGE_SIZE) as usize;
            let len = (PAGE_SIZE as usize - in_page).min(data.len() - written);

            let page = self
                .pages
                .entry(at / PAGE_SIZE)
                .or_insert_with(|| vec![0; PAGE_SIZE as usize]);
            page[in_page..in_page + len].copy_from_slice(&data[written..written + len]);
            written += len;
        }
        self.len = self.len.max(offset + data.len() as u64);
    }

    /// Size of the device in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writes the allocated pages of the image to `out` at their offsets.
    ///
    /// The holes are left untouched, so `out` must read as zeros there.
    pub fn write_to<W: Write + Seek>(&self, out: &mut W) -> io::Result<()> {
        for (&page, bytes) in &self.pages {
            let offset = page * PAGE_SIZE;
            let len = (self.len - offset).min(PAGE_SIZE) as usize;
            out.seek(SeekFrom::Start(offset))?;
            out.write_all(&bytes[..len])?;
        }
        out.flush()
    }
}

impl BlockDevice for SparseImage {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let wanted = (buf.len() as u64).min(self.len - offset) as usize;

        let mut read = 0;
        while read < wanted {
            let at = offset + read as u64;
            let in_page = (at % PAGE_SIZE) as usize;
            let len = (PAGE_SIZE as usize - in_page).min(wanted - read);

            match self.pages.get(&(at / PAGE_SIZE)) {
                Some(page) => buf[read..read + len].copy_from_slice(&page[in_page..in_page + len]),
                None => buf[read..read + len].fill(0),
            }
            read += len;
        }

        Ok(read)
    }
}

/// Writes a FAT32 volume described by a [`BootSector`].
///
/// Every FAT copy receives the same entries. The root cluster is a one-cluster chain
/// until a test links it further.
pub struct ImageBuilder {
    boot: BootSector,
    image: SparseImage,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::with_boot(BootSector::default())
    }

    pub fn with_boot(boot: BootSector) -> Self {
        let len = boot.tot_sec_32 as u64 * boot.bytes_per_sec as u64;
        let mut builder = Self {
            image: SparseImage::new(len),
            boot,
        };

        builder.image.write(0, &builder.boot.to_bytes());
        builder.set_fat(0, 0x0FFF_FFF8);
        builder.set_fat(1, EOC);
        builder.set_fat(builder.boot.root_clus, EOC);
        builder
    }

    pub fn cluster_size(&self) -> usize {
        self.boot.bytes_per_sec as usize * self.boot.sec_per_clus as usize
    }

    fn cluster_offset(&self, cluster: u32) -> u64 {
        let bps = self.boot.bytes_per_sec as u64;
        let first_data_sector =
            self.boot.rsvd_sec_cnt as u64 + self.boot.num_fat as u64 * self.boot.fat_sz_32 as u64;
        (first_data_sector + (cluster as u64 - 2) * self.boot.sec_per_clus as u64) * bps
    }

    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        let bps = self.boot.bytes_per_sec as u64;
        for fat in 0..self.boot.num_fat as u64 {
            let start = (self.boot.rsvd_sec_cnt as u64 + fat * self.boot.fat_sz_32 as u64) * bps;
            self.image
                .write(start + cluster as u64 * 4, &value.to_le_bytes());
        }
    }

    /// Links `clusters` into a chain ended by an end-of-chain marker.
    pub fn link(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, EOC);
        }
    }

    pub fn write_cluster(&mut self, cluster: u32, offset: usize, data: &[u8]) {
        let at = self.cluster_offset(cluster) + offset as u64;
        self.image.write(at, data);
    }

    /// Writes a directory over `clusters`, filling them slot after slot.
    pub fn write_dir(&mut self, clusters: &[u32], slots: &[[u8; 32]]) {
        self.link(clusters);
        let per_cluster = self.cluster_size() / DIR_ENTRY_SIZE;

        for (i, slot) in slots.iter().enumerate() {
            let cluster = clusters[i / per_cluster];
            self.write_cluster(cluster, (i % per_cluster) * DIR_ENTRY_SIZE, slot);
        }
    }

    /// Writes file content over `clusters`, filling them in order.
    pub fn write_file(&mut self, clusters: &[u32], data: &[u8]) {
        self.link(clusters);
        let cluster_size = self.cluster_size();

        for (chunk, &cluster) in data.chunks(cluster_size).zip(clusters) {
            self.write_cluster(cluster, 0, chunk);
        }
    }

    pub fn build(self) -> SparseImage {
        self.image
    }
}

/// Builds a short directory entry carrying the test timestamps.
pub fn short_slot(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[..11].copy_from_slice(name);
    slot[11] = attr;
    slot[14..16].copy_from_slice(&CREATION_TIME.to_le_bytes());
    slot[16..18].copy_from_slice(&CREATION_DATE.to_le_bytes());
    slot[18..20].copy_from_slice(&ACCESS_DATE.to_le_bytes());
    slot[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    slot[22..24].copy_from_slice(&WRITE_TIME.to_le_bytes());
    slot[24..26].copy_from_slice(&WRITE_DATE.to_le_bytes());
    slot[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    slot[28..32].copy_from_slice(&size.to_le_bytes());
    slot
}

/// Builds a long name fragment holding up to 13 UTF-16 units.
///
/// A shorter name is terminated by 0x0000 and padded with 0xFFFF.
pub fn lfn_slot(seq: u8, name: &[u16], checksum: u8) -> [u8; 32] {
    let mut units = [0xFFFFu16; LFN_CHARS];
    units[..name.len()].copy_from_slice(name);
    if name.len() < LFN_CHARS {
        units[name.len()] = 0x0000;
    }

    let mut slot = [0u8; 32];
    slot[0] = seq;
    slot[11] = ATTR_LONG_NAME;
    slot[13] = checksum;
    let offsets = (1..11).step_by(2).chain((14..26).step_by(2)).chain((28..32).step_by(2));
    for (unit, offset) in units.iter().zip(offsets) {
        slot[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
    }
    slot
}

/// Builds the fragments of `long` bound to `short`, in on-disk order.
pub fn lfn_slots(long: &str, short: &[u8; 11]) -> Vec<[u8; 32]> {
    let units: Vec<u16> = long.encode_utf16().collect();
    let sum = checksum(short);
    let chunks: Vec<&[u16]> = units.chunks(LFN_CHARS).collect();

    chunks
        .iter()
        .enumerate()
        .rev()
        .map(|(i, chunk)| {
            let mut seq = i as u8 + 1;
            if i == chunks.len() - 1 {
                seq |= 0x40;
            }
            lfn_slot(seq, chunk, sum)
        })
        .collect()
}
