//! FAT directory entry slots and parsing.
//!
//! A directory is a sequence of 32-byte slots. A slot either ends the directory, is a
//! deleted entry, holds a fragment of a long file name, or is a short (8.3) entry carrying
//! the metadata of a file or directory. [`DirSlot::from_slice`] decodes one slot into the
//! matching variant from its first byte and its attribute byte.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::fmt;
use std::io;

use super::fat_error::FATError;
use crate::constants::{DIR_ENTRY_SIZE, LFN_CHARS};

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
/// Attribute marker of a long name fragment.
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

/// First byte of the slot following the last entry of a directory.
const SLOT_END: u8 = 0x00;
/// First byte of a deleted slot.
const SLOT_DELETED: u8 = 0xE5;

/// Offset of the attribute byte, shared by both slot shapes.
const ATTR_OFFSET: usize = 11;

/// Flag of the sequence byte marking the fragment holding the end of the name.
pub const LFN_SEQ_LAST: u8 = 0x40;
/// Flag of the sequence byte marking a deleted fragment.
pub const LFN_SEQ_DELETED: u8 = 0x80;
/// Mask extracting the position of a fragment from its sequence byte.
pub const LFN_SEQ_MASK: u8 = 0x3F;

/// Short directory entry.
///
/// Each short entry is exactly 32 bytes and contains metadata about a file or directory.
///
/// # Notes
/// - The name field uses the legacy 8.3 format with space padding
/// - Dates and times are packed DOS values
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct ShortEntry {
    /// Filename in 8.3 format (8 characters name + 3 characters extension)
    #[get = "pub"]
    name: [u8; 11],
    /// File attributes byte
    #[get = "pub"]
    attr: u8,
    /// NT reserved (unused)
    _n_t_res: u8,
    /// Creation time in 10ms units
    _crt_time_tenth: u8,
    /// Creation time
    #[get = "pub"]
    crt_time: u16,
    /// Creation date
    #[get = "pub"]
    crt_date: u16,
    /// Last access date
    #[get = "pub"]
    lst_acc_date: u16,
    /// High 16 bits of first cluster number
    fst_clus_hi: u16,
    /// Last write time
    #[get = "pub"]
    wrt_time: u16,
    /// Last write date
    #[get = "pub"]
    wrt_date: u16,
    /// Low 16 bits of first cluster number
    fst_clus_lo: u16,
    /// File size in bytes (0 for directories)
    #[get = "pub"]
    file_size: u32,
}

impl ShortEntry {
    /// Builds the display name from the 8.3 fields.
    ///
    /// Trailing spaces are stripped from both the name and the extension, and a dot is
    /// only inserted when the extension is not empty.
    pub fn display_name(&self) -> String {
        let name = trim_padding(&self.name[0..8]);
        let ext = trim_padding(&self.name[8..11]);

        if ext.is_empty() {
            String::from_utf8_lossy(name).into_owned()
        } else {
            format!(
                "{}.{}",
                String::from_utf8_lossy(name),
                String::from_utf8_lossy(ext)
            )
        }
    }

    /// Returns the complete first cluster number for this entry.
    ///
    /// Combines `fst_clus_hi` and `fst_clus_lo`: `(fst_clus_hi << 16) | fst_clus_lo`
    pub fn cluster_number(&self) -> u32 {
        ((self.fst_clus_hi as u32) << 16) | self.fst_clus_lo as u32
    }

    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.attr & ATTR_READ_ONLY != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attr & ATTR_HIDDEN != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0
    }
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let len = field
        .iter()
        .rposition(|&byte| byte != b' ')
        .map_or(0, |pos| pos + 1);
    &field[..len]
}

impl fmt::Display for ShortEntry {
    /// Formats the directory entry as its name and size, e.g. `"README.TXT" 1234B`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}B", self.display_name(), self.file_size)
    }
}

/// Long file name fragment.
///
/// Holds up to 13 UTF-16 code units of a long name split across three fields. The
/// fragments of a name are stored last-to-first on disk, right before the short entry
/// they describe.
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct LongNameFragment {
    /// Position of the fragment, with the last and deleted flags
    #[get = "pub"]
    seq: u8,
    name1: [u16; 5],
    /// Always `ATTR_LONG_NAME`
    _attr: u8,
    _kind: u8,
    /// Checksum of the short name this fragment belongs to
    #[get = "pub"]
    checksum: u8,
    name2: [u16; 6],
    _fst_clus_lo: u16,
    name3: [u16; 2],
}

impl LongNameFragment {
    /// One-based position of the fragment within its name.
    pub fn order(&self) -> u8 {
        self.seq & LFN_SEQ_MASK
    }

    /// Whether this fragment holds the end of the name and thus starts a group on disk.
    pub fn is_last(&self) -> bool {
        self.seq & LFN_SEQ_LAST != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.seq & LFN_SEQ_DELETED != 0
    }

    /// The 13 code units of the fragment, padding included.
    pub fn units(&self) -> [u16; LFN_CHARS] {
        let mut units = [0u16; LFN_CHARS];
        units[..5].copy_from_slice(&self.name1);
        units[5..11].copy_from_slice(&self.name2);
        units[11..].copy_from_slice(&self.name3);
        units
    }
}

/// A decoded directory slot.
#[derive(Debug, Clone)]
pub enum DirSlot {
    /// No entry follows in this directory.
    End,
    Deleted,
    LongName(LongNameFragment),
    Short(ShortEntry),
}

impl DirSlot {
    /// Decodes a slot from a byte slice holding at least 32 bytes.
    pub fn from_slice(buf: &[u8]) -> Result<Self, FATError> {
        if buf.len() < DIR_ENTRY_SIZE {
            return Err(FATError::IOError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("A directory slot is {DIR_ENTRY_SIZE} bytes, got {}", buf.len()),
            )));
        }

        let slot = match buf[0] {
            SLOT_END => DirSlot::End,
            SLOT_DELETED => DirSlot::Deleted,
            _ => {
                let mut reader = io::Cursor::new(&buf[..DIR_ENTRY_SIZE]);
                if buf[ATTR_OFFSET] & ATTR_LONG_NAME == ATTR_LONG_NAME {
                    DirSlot::LongName(reader.read_le()?)
                } else {
                    DirSlot::Short(reader.read_le()?)
                }
            }
        };

        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{lfn_slot, short_slot};

    fn short(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> ShortEntry {
        match DirSlot::from_slice(&short_slot(name, attr, cluster, size)).unwrap() {
            DirSlot::Short(entry) => entry,
            other => panic!("expected a short entry, got {other:?}"),
        }
    }

    #[test]
    fn display_name_inserts_dot_only_with_extension() {
        assert_eq!(short(b"FOO     BAR", 0, 3, 0).display_name(), "FOO.BAR");
        assert_eq!(short(b"FOO        ", 0, 3, 0).display_name(), "FOO");
        assert_eq!(short(b"A B     C  ", 0, 3, 0).display_name(), "A B.C");
    }

    #[test]
    fn cluster_halves_are_combined() {
        let entry = short(b"BIG     BIN", 0, 0x0012_3456, 42);

        assert_eq!(entry.cluster_number(), 0x0012_3456);
        assert_eq!(*entry.file_size(), 42);
    }

    #[test]
    fn attributes() {
        let entry = short(b"DIR        ", ATTR_DIRECTORY | ATTR_READ_ONLY, 5, 0);
        assert!(entry.is_dir());
        assert!(entry.is_read_only());
        assert!(!entry.is_hidden());

        let entry = short(b"LABEL      ", ATTR_VOLUME_ID | ATTR_ARCHIVE, 0, 0);
        assert!(entry.is_volume_label());
        assert!(!entry.is_dir());
    }

    #[test]
    fn classifies_slots() {
        let mut slot = short_slot(b"GONE    TXT", 0, 3, 0);
        slot[0] = 0xE5;
        assert!(matches!(DirSlot::from_slice(&slot).unwrap(), DirSlot::Deleted));

        assert!(matches!(
            DirSlot::from_slice(&[0u8; 32]).unwrap(),
            DirSlot::End
        ));

        let units: Vec<u16> = "hello".encode_utf16().collect();
        match DirSlot::from_slice(&lfn_slot(0x41, &units, 0x5A)).unwrap() {
            DirSlot::LongName(frag) => {
                assert!(frag.is_last());
                assert!(!frag.is_deleted());
                assert_eq!(frag.order(), 1);
                assert_eq!(*frag.checksum(), 0x5A);
                assert_eq!(&frag.units()[..6], &[104, 101, 108, 108, 111, 0]);
                assert_eq!(frag.units()[6], 0xFFFF);
            }
            other => panic!("expected a long name fragment, got {other:?}"),
        }
    }

    #[test]
    fn hidden_system_entry_is_not_a_fragment() {
        let slot = short_slot(b"HIDDEN  SYS", ATTR_HIDDEN | ATTR_SYSTEM, 9, 1);
        assert!(matches!(DirSlot::from_slice(&slot).unwrap(), DirSlot::Short(_)));
    }

    #[test]
    fn truncated_slot_is_an_error() {
        assert!(DirSlot::from_slice(&[0x41u8; 16]).is_err());
    }
}
