//! Reassembly of long file names.
//!
//! Fragments are fed in on-disk order. The first fragment of a group carries the last
//! flag and the count of fragments; each following one must have the previous position
//! minus one and the same checksum. Any deviation drops the group and the short entry
//! that follows is shown under its 8.3 name.

use log::debug;

use super::dir_entry::LongNameFragment;
use crate::constants::LFN_CHARS;

/// Computes the checksum of a raw 8.3 name: rotate right by one bit, then add the next byte.
pub fn checksum(name: &[u8; 11]) -> u8 {
    name.iter()
        .fold(0u8, |sum, &byte| sum.rotate_right(1).wrapping_add(byte))
}

#[derive(Debug)]
struct Group {
    checksum: u8,
    /// Position of the last fragment accepted.
    seq: u8,
    /// Room for every fragment of the name, padded with 0xFFFF.
    units: Vec<u16>,
}

/// Collects the fragments preceding a short entry.
#[derive(Debug, Default)]
pub struct LongNameBuilder {
    group: Option<Group>,
}

impl LongNameBuilder {
    /// Feeds the next fragment found in the directory.
    pub fn push(&mut self, fragment: &LongNameFragment) {
        let seq = fragment.order();

        if fragment.is_deleted() {
            debug!("Dropping deleted long name fragment {seq}");
            self.group = None;
            return;
        }

        if fragment.is_last() {
            if seq == 0 {
                debug!("Dropping long name fragment with position 0");
                self.group = None;
                return;
            }
            if self.group.is_some() {
                debug!("Long name group interrupted by a new one");
            }

            let mut units = vec![0xFFFF; seq as usize * LFN_CHARS];
            Self::store(&mut units, seq, fragment);
            self.group = Some(Group {
                checksum: *fragment.checksum(),
                seq,
                units,
            });
            return;
        }

        match self.group.as_mut() {
            Some(group)
                if seq != 0 && group.seq == seq + 1 && group.checksum == *fragment.checksum() =>
            {
                Self::store(&mut group.units, seq, fragment);
                group.seq = seq;
            }
            Some(group) => {
                debug!(
                    "Dropping long name: fragment {seq} (checksum 0x{:02X}) after fragment {} (checksum 0x{:02X})",
                    fragment.checksum(),
                    group.seq,
                    group.checksum
                );
                self.group = None;
            }
            None => debug!("Ignoring orphan long name fragment {seq}"),
        }
    }

    fn store(units: &mut [u16], seq: u8, fragment: &LongNameFragment) {
        let start = (seq as usize - 1) * LFN_CHARS;
        units[start..start + LFN_CHARS].copy_from_slice(&fragment.units());
    }

    /// Ends the group on the short entry named `short_name`.
    ///
    /// Returns the long name if every fragment was collected and the checksum of the short
    /// name matches. The builder is empty afterwards in every case.
    pub fn finish(&mut self, short_name: &[u8; 11]) -> Option<String> {
        let group = self.group.take()?;

        if group.seq != 1 {
            debug!("Dropping incomplete long name, missing fragment {}", group.seq - 1);
            return None;
        }

        let expected = checksum(short_name);
        if group.checksum != expected {
            debug!(
                "Long name checksum 0x{:02X} does not match short name checksum 0x{expected:02X}",
                group.checksum
            );
            return None;
        }

        let units: Vec<u16> = group
            .units
            .into_iter()
            .take_while(|&unit| unit != 0x0000 && unit != 0xFFFF)
            .collect();
        if units.is_empty() {
            return None;
        }

        Some(String::from_utf16_lossy(&units))
    }

    /// Drops any group in progress.
    pub fn reset(&mut self) {
        self.group = None;
    }
}
