//! File content reads.
//!
//! A byte range of a file is translated into positioned reads of the clusters holding it,
//! following the chain of the file from its first cluster.

use log::trace;

use super::fat::FATVol;
use super::fat_error::FATError;
use super::metadata::FileMetadata;
use crate::traits::BlockDevice;
use crate::utils;

impl<D: BlockDevice> FATVol<D> {
    /// Reads the content of a file, starting at byte `offset`, into `buf`.
    ///
    /// The read is clamped to the size recorded in `meta`: reading at or past the end of
    /// the file returns 0 and is not an error.
    ///
    /// # Parameters
    /// - `meta`: Metadata of the file, as returned by [`FATVol::resolve`].
    /// - `offset`: Offset in the file of the first byte to read.
    /// - `buf`: Destination buffer. Its length is the count of bytes wanted.
    ///
    /// # Returns
    /// The count of bytes copied into `buf`.
    ///
    /// # Errors
    /// - `FATError::CorruptChain` if the chain of the file ends before the requested range
    ///   or loops
    /// - `FATError::IOError` if a cluster cannot be read
    /// - `FATError::PartialRead` wrapping one of the above when some bytes were already
    ///   copied into `buf`
    pub fn read(
        &self,
        meta: &FileMetadata,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize, FATError> {
        let size = meta.size() as u64;
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let wanted = (buf.len() as u64).min(size - offset) as usize;

        let mut copied = 0;
        match self.copy_range(meta.cluster(), offset, &mut buf[..wanted], &mut copied) {
            Ok(()) => Ok(copied),
            Err(err) if copied > 0 => Err(FATError::PartialRead {
                read: copied,
                source: Box::new(err),
            }),
            Err(err) => Err(err),
        }
    }

    /// Reads a whole file.
    ///
    /// The content grows one cluster at a time while the chain is walked, so a size the
    /// chain cannot back is never allocated.
    ///
    /// # Errors
    /// Same as [`FATVol::read`].
    pub fn read_to_end(&self, meta: &FileMetadata) -> Result<Vec<u8>, FATError> {
        let mut content = Vec::new();
        match self.append_chain(meta, &mut content) {
            Ok(()) => Ok(content),
            Err(err) if !content.is_empty() => Err(FATError::PartialRead {
                read: content.len(),
                source: Box::new(err),
            }),
            Err(err) => Err(err),
        }
    }

    fn append_chain(&self, meta: &FileMetadata, content: &mut Vec<u8>) -> Result<(), FATError> {
        let size = meta.size() as usize;
        let cluster_size = self.geometry().cluster_size() as usize;
        let mut chain = self.fat().chain(meta.cluster());

        while content.len() < size {
            let cluster = chain.next().ok_or(FATError::CorruptChain(meta.cluster()))??;
            let len = cluster_size.min(size - content.len());

            let start = content.len();
            content.resize(start + len, 0);
            let at = self.geometry().cluster_offset(cluster)?;
            if let Err(err) = utils::read_exact_at(self.device(), at, &mut content[start..]) {
                content.truncate(start);
                return Err(err.into());
            }
        }

        Ok(())
    }

    /// Fills `buf` with the bytes found at `offset` in the chain starting at `start`.
    ///
    /// `copied` tracks the progress so the caller can report a prefix on failure.
    fn copy_range(
        &self,
        start: u32,
        offset: u64,
        buf: &mut [u8],
        copied: &mut usize,
    ) -> Result<(), FATError> {
        let cluster_size = self.geometry().cluster_size() as u64;
        let mut chain = self.fat().chain(start);

        let skip = offset / cluster_size;
        for _ in 0..skip {
            chain.next().ok_or(FATError::CorruptChain(start))??;
        }

        let mut position = offset;
        while *copied < buf.len() {
            let cluster = chain.next().ok_or(FATError::CorruptChain(start))??;
            let in_cluster = position % cluster_size;
            let len = ((cluster_size - in_cluster) as usize).min(buf.len() - *copied);

            let at = self.geometry().cluster_offset(cluster)? + in_cluster;
            trace!("Reading {len} bytes of cluster {cluster} at offset {at}");
            utils::read_exact_at(self.device(), at, &mut buf[*copied..*copied + len])?;

            *copied += len;
            position += len as u64;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BootSector, ImageBuilder, SparseImage, short_slot};

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    /// DATA.BIN spans clusters 5, 9 and 6, EMPTY.TXT has no cluster.
    fn volume(content: &[u8]) -> FATVol<SparseImage> {
        let mut builder = ImageBuilder::new();
        builder.write_dir(
            &[2],
            &[
                short_slot(b"DATA    BIN", 0, 5, content.len() as u32),
                short_slot(b"EMPTY   TXT", 0, 0, 0),
            ],
        );
        builder.write_file(&[5, 9, 6], content);
        FATVol::mount(builder.build()).unwrap()
    }

    #[test]
    fn reads_whole_file_across_clusters() {
        let content = pattern(1300);
        let vol = volume(&content);
        let meta = vol.resolve("/DATA.BIN").unwrap();

        assert_eq!(vol.read_to_end(&meta).unwrap(), content);
    }

    #[test]
    fn reads_range_across_cluster_boundary() {
        let content = pattern(1300);
        let vol = volume(&content);
        let meta = vol.resolve("/DATA.BIN").unwrap();

        let mut buf = [0u8; 600];
        assert_eq!(vol.read(&meta, 500, &mut buf).unwrap(), 600);
        assert_eq!(&buf[..], &content[500..1100]);
    }

    #[test]
    fn read_is_clamped_to_size() {
        let content = pattern(1300);
        let vol = volume(&content);
        let meta = vol.resolve("/DATA.BIN").unwrap();

        let mut buf = [0u8; 512];
        assert_eq!(vol.read(&meta, 1200, &mut buf).unwrap(), 100);
        assert_eq!(&buf[..100], &content[1200..]);
        assert_eq!(vol.read(&meta, 1300, &mut buf).unwrap(), 0);
        assert_eq!(vol.read(&meta, 5000, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_is_idempotent() {
        let vol = volume(&pattern(1300));
        let meta = vol.resolve("/DATA.BIN").unwrap();

        let mut first = [0u8; 333];
        let mut second = [0u8; 333];
        vol.read(&meta, 444, &mut first).unwrap();
        vol.read(&meta, 444, &mut second).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn empty_file_reads_nothing() {
        let vol = volume(&pattern(10));
        let meta = vol.resolve("/EMPTY.TXT").unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(vol.read(&meta, 0, &mut buf).unwrap(), 0);
        assert!(vol.read_to_end(&meta).unwrap().is_empty());
    }

    #[test]
    fn large_clusters() {
        let content = pattern(5000);
        let mut builder = ImageBuilder::with_boot(BootSector {
            sec_per_clus: 8,
            tot_sec_32: 32 + 2 * 520 + 65536 * 8,
            ..Default::default()
        });
        builder.write_dir(&[2], &[short_slot(b"BIG     BIN", 0, 3, 5000)]);
        builder.write_file(&[3, 4], &content);
        let vol = FATVol::mount(builder.build()).unwrap();
        let meta = vol.resolve("/BIG.BIN").unwrap();

        let mut buf = [0u8; 2000];
        assert_eq!(vol.read(&meta, 3000, &mut buf).unwrap(), 2000);
        assert_eq!(&buf[..], &content[3000..]);
    }

    #[test]
    fn short_chain_returns_prefix_and_error() {
        // Size claims three clusters, the chain holds two.
        let content = pattern(1024);
        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &[short_slot(b"TRUNC   BIN", 0, 5, 1500)]);
        builder.write_file(&[5, 6], &content);
        let vol = FATVol::mount(builder.build()).unwrap();
        let meta = vol.resolve("/TRUNC.BIN").unwrap();

        let mut buf = [0u8; 1500];
        match vol.read(&meta, 0, &mut buf) {
            Err(FATError::PartialRead { read, source }) => {
                assert_eq!(read, 1024);
                assert!(matches!(*source, FATError::CorruptChain(5)));
                assert_eq!(&buf[..1024], &content[..]);
            }
            other => panic!("expected a partial read, got {other:?}"),
        }

        assert!(matches!(
            vol.read(&meta, 1100, &mut buf),
            Err(FATError::CorruptChain(5))
        ));
    }

    #[test]
    fn whole_read_stops_where_the_chain_does() {
        // One cluster backs an entry claiming 4 GiB.
        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &[short_slot(b"HUGE    BIN", 0, 5, u32::MAX)]);
        builder.write_file(&[5], &pattern(512));
        let vol = FATVol::mount(builder.build()).unwrap();
        let meta = vol.resolve("/HUGE.BIN").unwrap();

        match vol.read_to_end(&meta) {
            Err(FATError::PartialRead { read, source }) => {
                assert_eq!(read, 512);
                assert!(matches!(*source, FATError::CorruptChain(5)));
            }
            other => panic!("expected a partial read, got {other:?}"),
        }
    }

    #[test]
    fn circular_chain_is_detected() {
        let mut builder = ImageBuilder::new();
        builder.write_dir(&[2], &[short_slot(b"LOOP    BIN", 0, 5, u32::MAX)]);
        builder.write_file(&[5, 6], &pattern(1024));
        builder.set_fat(6, 5);
        let vol = FATVol::mount(builder.build()).unwrap();
        let meta = vol.resolve("/LOOP.BIN").unwrap();

        // Reaching this offset takes more links than the FAT has entries.
        let mut buf = [0u8; 16];
        assert!(matches!(
            vol.read(&meta, 70_000 * 512, &mut buf),
            Err(FATError::CorruptChain(_))
        ));
    }

    #[test]
    fn concurrent_readers_agree() {
        let content = pattern(1300);
        let vol = volume(&content);
        let meta = vol.resolve("/DATA.BIN").unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let (vol, meta) = (&vol, &meta);
                    scope.spawn(move || {
                        let mut buf = vec![0u8; 256];
                        let offset = i * 300;
                        let len = vol.read(meta, offset as u64, &mut buf).unwrap();
                        (offset, buf[..len].to_vec())
                    })
                })
                .collect();

            for handle in handles {
                let (offset, bytes) = handle.join().unwrap();
                assert_eq!(bytes, content[offset..offset + 256]);
            }
        });
    }
}
