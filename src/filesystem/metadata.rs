//! Metadata of a file or directory, as handed out by the volume.

use chrono::{DateTime, NaiveDate, Utc};
use getset::{CopyGetters, Getters};

use super::dir_entry::ShortEntry;

/// File type bits of a directory in a `st_mode` value.
pub const MODE_DIR: u32 = 0o040000;
/// File type bits of a regular file in a `st_mode` value.
pub const MODE_FILE: u32 = 0o100000;

/// Metadata of one directory entry.
///
/// The cluster number of the first cluster of the entry doubles as its inode number.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct FileMetadata {
    /// Long name if one was recorded, 8.3 name otherwise
    #[getset(get = "pub")]
    name: String,
    /// First cluster of the entry
    #[getset(get_copy = "pub")]
    cluster: u32,
    /// Size in bytes, 0 for directories
    #[getset(get_copy = "pub")]
    size: u32,
    #[getset(get_copy = "pub")]
    is_dir: bool,
    #[getset(get_copy = "pub")]
    read_only: bool,
    #[getset(get_copy = "pub")]
    accessed: DateTime<Utc>,
    #[getset(get_copy = "pub")]
    created: DateTime<Utc>,
    #[getset(get_copy = "pub")]
    modified: DateTime<Utc>,
}

impl FileMetadata {
    /// Builds the metadata of a short entry displayed under `name`.
    ///
    /// The access date has no time part, so it is set at midnight.
    pub fn from_short_entry(entry: &ShortEntry, name: String) -> Self {
        Self {
            name,
            cluster: entry.cluster_number(),
            size: *entry.file_size(),
            is_dir: entry.is_dir(),
            read_only: entry.is_read_only(),
            accessed: dos_datetime(*entry.lst_acc_date(), 0),
            created: dos_datetime(*entry.crt_date(), *entry.crt_time()),
            modified: dos_datetime(*entry.wrt_date(), *entry.wrt_time()),
        }
    }

    /// Metadata of a root directory starting at `cluster`.
    ///
    /// The root has no entry describing it, so every timestamp is the mount time.
    pub fn root(cluster: u32, mount_time: DateTime<Utc>) -> Self {
        Self {
            name: String::from("/"),
            cluster,
            size: 0,
            is_dir: true,
            read_only: true,
            accessed: mount_time,
            created: mount_time,
            modified: mount_time,
        }
    }

    /// Points a directory entry at another first cluster.
    pub(super) fn set_cluster(&mut self, cluster: u32) {
        self.cluster = cluster;
    }

    /// Permission bits. The volume is mounted read-only.
    pub fn permissions(&self) -> u32 {
        if self.is_dir { 0o555 } else { 0o444 }
    }

    /// File type and permission bits, laid out as a `st_mode` value.
    pub fn mode(&self) -> u32 {
        let kind = if self.is_dir { MODE_DIR } else { MODE_FILE };
        kind | self.permissions()
    }
}

/// Converts a packed DOS date and time to a UTC timestamp.
///
/// Date: bits 15-9 year since 1980, bits 8-5 month, bits 4-0 day.
/// Time: bits 15-11 hours, bits 10-5 minutes, bits 4-0 seconds / 2.
/// Values that do not form a valid date map to the Unix epoch.
pub fn dos_datetime(date: u16, time: u16) -> DateTime<Utc> {
    let year = ((date >> 9) & 0x7F) as i32 + 1980;
    let month = ((date >> 5) & 0x0F) as u32;
    let day = (date & 0x1F) as u32;

    let hour = ((time >> 11) & 0x1F) as u32;
    let minute = ((time >> 5) & 0x3F) as u32;
    let second = ((time & 0x1F) * 2) as u32;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|datetime| datetime.and_utc())
        .unwrap_or_default()
}
