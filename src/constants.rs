/// Longest path accepted by the resolver, in bytes.
pub const MAX_PATH_LEN: usize = 255;

/// The size of a directory entry slot in bytes.
pub const DIR_ENTRY_SIZE: usize = 32;

/// Any FAT value greater or equal to this one marks the end of a cluster chain.
pub const END_OF_CHAIN: u32 = 0x0FFF_FFF8;

/// FAT value flagging a bad cluster.
pub const BAD_CLUSTER: u32 = 0x0FFF_FFF7;

/// Only the low 28 bits of a FAT32 entry are meaningful.
pub const FAT32_ENTRY_MASK: u32 = 0x0FFF_FFFF;

/// Minimum count of data clusters for a volume to be FAT32.
pub const FAT32_MIN_CLUSTERS: u32 = 65525;

/// Below this count of data clusters a volume is FAT12.
pub const FAT16_MIN_CLUSTERS: u32 = 4085;

/// Number of FAT copies a mountable volume must carry.
pub const REQUIRED_FAT_COUNT: u8 = 2;

/// Usual position of the backup boot sector.
pub const EXPECTED_BACKUP_SECTOR: u16 = 6;

/// Number of UTF-16 code units held by a long name fragment.
pub const LFN_CHARS: usize = 13;
