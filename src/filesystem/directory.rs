//! Directory enumeration.
//!
//! Scans every sector of every cluster of a directory chain, slot by slot, and reports
//! each visible entry with its reconstructed name. Deleted slots, hidden entries and volume
//! labels are skipped; the scan ends at the first free slot or at the end of the chain.

use std::ops::ControlFlow;

use super::dir_entry::DirSlot;
use super::fat::FATVol;
use super::fat_error::FATError;
use super::long_name::LongNameBuilder;
use super::metadata::FileMetadata;
use crate::constants::DIR_ENTRY_SIZE;
use crate::traits::BlockDevice;
use crate::utils;

impl<D: BlockDevice> FATVol<D> {
    /// Enumerates the directory starting at `start_cluster`.
    ///
    /// `visitor` receives the metadata of each entry and its zero-based position among the
    /// reported entries. Returning `ControlFlow::Break` stops the scan without reading
    /// any further sector.
    ///
    /// # Errors
    /// - `FATError::IOError` if a sector cannot be read entirely
    /// - `FATError::CorruptChain` if the directory chain is broken or loops
    ///
    /// Entries reported before an error must be considered part of a failed listing.
    pub fn list_entries<F>(&self, start_cluster: u32, mut visitor: F) -> Result<(), FATError>
    where
        F: FnMut(&FileMetadata, usize) -> ControlFlow<()>,
    {
        let bytes_per_sector = self.geometry().bytes_per_sector() as u64;
        let mut sector = vec![0u8; bytes_per_sector as usize];
        let mut long_name = LongNameBuilder::default();
        let mut index = 0;

        for cluster in self.fat().chain(start_cluster) {
            let first_sector = self.geometry().clus_to_sector(cluster?)?;

            for sector_nb in first_sector..first_sector + self.geometry().sectors_per_cluster() as u64
            {
                utils::read_exact_at(self.device(), sector_nb * bytes_per_sector, &mut sector)?;

                for slot in sector.chunks_exact(DIR_ENTRY_SIZE) {
                    let entry = match DirSlot::from_slice(slot)? {
                        DirSlot::End => return Ok(()),
                        DirSlot::Deleted => continue,
                        DirSlot::LongName(fragment) => {
                            long_name.push(&fragment);
                            continue;
                        }
                        DirSlot::Short(entry) => entry,
                    };

                    if entry.is_hidden() || entry.is_volume_label() {
                        long_name.reset();
                        continue;
                    }

                    let name = long_name
                        .finish(entry.name())
                        .unwrap_or_else(|| entry.display_name());
                    let metadata = FileMetadata::from_short_entry(&entry, name);

                    if visitor(&metadata, index).is_break() {
                        return Ok(());
                    }
                    index += 1;
                }
            }
        }

        Ok(())
    }

    /// Collects every entry of the directory starting at `cluster`.
    pub fn list_dir(&self, cluster: u32) -> Result<Vec<FileMetadata>, FATError> {
        let mut entries = vec![];
        self.list_entries(cluster, |entry, _| {
            entries.push(entry.clone());
            ControlFlow::Continue(())
        })?;
        Ok(entries)
    }

    /// Lists the directory found at `path`.
    ///
    /// # Errors
    /// - `FATError::NotADirectory` if `path` names a regular file
    /// - Any error of [`FATVol::resolve`] and [`FATVol::list_entries`]
    pub fn read_dir(&self, path: &str) -> Result<Vec<FileMetadata>, FATError> {
        let dir = self.resolve(path)?;
        if !dir.is_dir() {
            return Err(FATError::NotADirectory(path.to_string()));
        }

        self.list_dir(dir.cluster())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::dir_entry::{ATTR_DIRECTORY, ATTR_HIDDEN, ATTR_VOLUME_ID};
    use crate::filesystem::long_name::checksum;
    use crate::testing::{BootSector, ImageBuilder, lfn_slot, lfn_slots, short_slot};

    fn names(vol: &FATVol<impl BlockDevice>, cluster: u32) -> Vec<String> {
        vol.list_dir(cluster)
            .unwrap()
            .iter()
            .map(|entry| entry.name().clone())
            .collect()
    }

    fn units(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn lists_short_names() {
        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                short_slot(b"FOO     BAR", 0, 3, 10),
                short_slot(b"FOO        ", 0, 4, 20),
                short_slot(b"SUB        ", ATTR_DIRECTORY, 5, 0),
            ],
        );
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(names(&vol, 2), ["FOO.BAR", "FOO", "SUB"]);
        let entries = vol.list_dir(2).unwrap();
        assert_eq!(entries[0].cluster(), 3);
        assert_eq!(entries[1].size(), 20);
        assert!(entries[2].is_dir());
    }

    #[test]
    fn skips_deleted_hidden_and_label_entries() {
        let mut deleted = short_slot(b"OLD     TXT", 0, 6, 1);
        deleted[0] = 0xE5;

        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                short_slot(b"MYVOLUME   ", ATTR_VOLUME_ID, 0, 0),
                deleted,
                short_slot(b"SECRET  TXT", ATTR_HIDDEN, 7, 1),
                short_slot(b"SHOWN   TXT", 0, 8, 1),
            ],
        );
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(names(&vol, 2), ["SHOWN.TXT"]);
    }

    #[test]
    fn stops_at_end_marker() {
        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &[short_slot(b"FIRST      ", 0, 3, 0)]);
        // A slot after the end marker is never reported.
        builder.write_cluster(2, 64, &short_slot(b"GHOST      ", 0, 4, 0));
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(names(&vol, 2), ["FIRST"]);
    }

    #[test]
    fn out_of_sequence_fragment_falls_back() {
        let short = *b"LONGNA~1TXT";
        let sum = checksum(&short);

        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                lfn_slot(0x42, &units("file.txt"), sum),
                lfn_slot(0x02, &units("x"), sum),
                lfn_slot(0x01, &units("a_long_name_o"), sum),
                short_slot(&short, 0, 3, 5),
            ],
        );
        let vol = FATVol::mount(builder.build()).unwrap();

        // The second fragment is out of sequence: the group is dropped.
        assert_eq!(names(&vol, 2), ["LONGNA~1.TXT"]);
    }

    #[test]
    fn long_name_fragments_in_sequence() {
        let short = *b"LONGNA~1TXT";
        let sum = checksum(&short);

        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                lfn_slot(0x43, &units("tes.txt"), sum),
                lfn_slot(0x02, &units("m_three_fragm"), sum),
                lfn_slot(0x01, &units("a_long_name_o"), sum),
                short_slot(&short, 0, 3, 5),
                short_slot(b"PLAIN   TXT", 0, 4, 5),
            ],
        );
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(
            names(&vol, 2),
            ["a_long_name_om_three_fragmtes.txt", "PLAIN.TXT"]
        );
    }

    #[test]
    fn long_name_with_wrong_checksum_uses_short_name() {
        let short = *b"LONGNA~1TXT";
        let sum = checksum(&short).wrapping_add(7);

        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                lfn_slot(0x42, &units("c"), sum),
                lfn_slot(0x02, &units("b"), sum),
                lfn_slot(0x01, &units("a"), sum),
                short_slot(&short, 0, 3, 5),
            ],
        );
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(names(&vol, 2), ["LONGNA~1.TXT"]);
    }

    #[test]
    fn long_name_of_hidden_entry_is_not_carried_over() {
        let mut builder = ImageBuilder::new();
        let mut slots = lfn_slots("hidden long name.txt", b"HIDDEN~1TXT");
        slots.push(short_slot(b"HIDDEN~1TXT", ATTR_HIDDEN, 3, 1));
        slots.push(short_slot(b"VISIBLE TXT", 0, 4, 1));
        builder.write_dir(&[2], &slots);
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(names(&vol, 2), ["VISIBLE.TXT"]);
    }

    #[test]
    fn follows_directory_chain() {
        // One sector per cluster holds 16 slots.
        let slots: Vec<[u8; 32]> = (0..20)
            .map(|i| {
                let name = format!("FILE{i:02}  TXT");
                short_slot(name.as_bytes().try_into().unwrap(), 0, 100 + i, 0)
            })
            .collect();

        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2, 9], &slots);
        let vol = FATVol::mount(builder.build()).unwrap();

        let listed = names(&vol, 2);
        assert_eq!(listed.len(), 20);
        assert_eq!(listed[0], "FILE00.TXT");
        assert_eq!(listed[19], "FILE19.TXT");
    }

    #[test]
    fn reads_every_sector_of_a_cluster() {
        let slots: Vec<[u8; 32]> = (0..40)
            .map(|i| {
                let name = format!("F{i:02}     BIN");
                short_slot(name.as_bytes().try_into().unwrap(), 0, 100 + i, 0)
            })
            .collect();

        let mut builder = ImageBuilder::with_boot(BootSector {
            sec_per_clus: 4,
            tot_sec_32: 32 + 2 * 520 + 65536 * 4,
            ..Default::default()
        });
        builder.write_dir(&[2], &slots);
        let vol = FATVol::mount(builder.build()).unwrap();

        assert_eq!(names(&vol, 2).len(), 40);
    }

    #[test]
    fn visitor_can_stop_early() {
        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                short_slot(b"A          ", 0, 3, 0),
                short_slot(b"B          ", 0, 4, 0),
                short_slot(b"C          ", 0, 5, 0),
            ],
        );
        let vol = FATVol::mount(builder.build()).unwrap();

        let mut seen = vec![];
        vol.list_entries(2, |entry, index| {
            seen.push((entry.name().clone(), index));
            if index == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        assert_eq!(seen, [("A".to_string(), 0), ("B".to_string(), 1)]);
    }

    #[test]
    fn broken_chain_fails_listing() {
        let slots: Vec<[u8; 32]> = (0..16)
            .map(|i| {
                let name = format!("X{i:02}        ");
                short_slot(name.as_bytes().try_into().unwrap(), 0, 100 + i, 0)
            })
            .collect();

        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &slots);
        // The full cluster is followed by a free one.
        builder.set_fat(2, 0);
        let vol = FATVol::mount(builder.build()).unwrap();

        assert!(matches!(
            vol.list_dir(2),
            Err(FATError::CorruptChain(2))
        ));
    }

    #[test]
    fn circular_directory_chain_fails() {
        let slots: Vec<[u8; 32]> = (0..16)
            .map(|i| {
                let name = format!("Y{i:02}        ");
                short_slot(name.as_bytes().try_into().unwrap(), 0, 100 + i, 0)
            })
            .collect();

        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &slots);
        builder.set_fat(2, 2);
        let vol = FATVol::mount(builder.build()).unwrap();

        assert!(matches!(
            vol.list_dir(2),
            Err(FATError::CorruptChain(2))
        ));
    }

    #[test]
    fn read_dir_rejects_files() {
        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &[short_slot(b"FILE    TXT", 0, 3, 4)]);
        let vol = FATVol::mount(builder.build()).unwrap();

        assert!(matches!(
            vol.read_dir("/FILE.TXT"),
            Err(FATError::NotADirectory(_))
        ));
        assert_eq!(vol.read_dir("/").unwrap().len(), 1);
    }
}
