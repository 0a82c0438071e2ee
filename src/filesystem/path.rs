//! Path resolution.
//!
//! A path is split on '/' and each component is looked up, case-sensitively, in the
//! directory matched by the previous one, starting from the root directory.

use log::warn;
use std::ops::ControlFlow;

use super::fat::FATVol;
use super::fat_error::FATError;
use super::metadata::FileMetadata;
use crate::constants::MAX_PATH_LEN;
use crate::traits::BlockDevice;

impl<D: BlockDevice> FATVol<D> {
    /// Resolves a slash-separated path to the metadata of the entry it names.
    ///
    /// Empty components are ignored, so `//a//b` names the same entry as `/a/b`.
    /// When a directory holds several entries with the same name, the first one on disk wins.
    ///
    /// # Errors
    /// - `FATError::PathTooLong` if the path exceeds 255 bytes, before any read
    /// - `FATError::FileNotFound` if a component is missing, if an intermediate component
    ///   is not a directory, or if a directory on the way cannot be read
    pub fn resolve(&self, path: &str) -> Result<FileMetadata, FATError> {
        if path.len() > MAX_PATH_LEN {
            return Err(FATError::PathTooLong(path.len()));
        }
        if path == "/" {
            return Ok(self.root().clone());
        }

        let components = path
            .strip_prefix('/')
            .unwrap_or(path)
            .split('/')
            .filter(|component| !component.is_empty());

        let mut current = self.root().clone();
        for component in components {
            if !current.is_dir() {
                return Err(FATError::FileNotFound);
            }
            current = self.find_in_dir(current.cluster(), component)?;
        }

        Ok(current)
    }

    /// First cluster of the entry at `path`, exposed to debugging tools.
    pub fn cluster_of(&self, path: &str) -> Result<u32, FATError> {
        Ok(self.resolve(path)?.cluster())
    }

    fn find_in_dir(&self, cluster: u32, name: &str) -> Result<FileMetadata, FATError> {
        let mut found = None;

        let listing = self.list_entries(cluster, |entry, _| {
            if entry.name() == name {
                found = Some(entry.clone());
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        if let Err(err) = listing {
            warn!("Looking up `{name}` in the directory at cluster {cluster} failed: {err}");
            return Err(FATError::FileNotFound);
        }

        let mut entry = found.ok_or(FATError::FileNotFound)?;
        // `..` entries of first-level directories point at the root as cluster 0.
        if entry.is_dir() && entry.cluster() == 0 && entry.name() == ".." {
            entry.set_cluster(self.root().cluster());
        }

        Ok(entry)
    }
}
