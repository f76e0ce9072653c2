//! On-disk substrate directory
//!
//! One file per object, named by its hex hash. Files are written to a
//! temporary name and renamed into place so a crash never leaves a partial
//! object under a valid name.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use interconnect_core::{InterconnectError, InterconnectResult};

use crate::{ContentHash, SubstrateObject};

/// Directory of content-addressed files
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Open `dir`, creating it if needed
    pub fn open(dir: impl AsRef<Path>) -> InterconnectResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(DiskStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, hash: &ContentHash) -> PathBuf {
        self.dir.join(hash.to_hex())
    }

    pub fn write(&self, object: &SubstrateObject) -> InterconnectResult<()> {
        let path = self.path_for(&object.hash());
        if path.exists() {
            return Ok(());
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, object.bytes())
            .map_err(|e| InterconnectError::Storage(format!("write {}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, &path)
            .map_err(|e| InterconnectError::Storage(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }

    /// Read every object back. Files whose name is not a hash, or whose
    /// content no longer matches it, are skipped.
    pub fn load_all(&self) -> InterconnectResult<Vec<SubstrateObject>> {
        let mut objects = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(expected) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.parse::<ContentHash>().ok())
            else {
                continue;
            };

            let object = SubstrateObject::new(Bytes::from(fs::read(&path)?));
            if object.hash() != expected {
                tracing::warn!(path = %path.display(), "substrate file does not match its hash, skipping");
                continue;
            }
            objects.push(object);
        }
        tracing::debug!(dir = %self.dir.display(), count = objects.len(), "substrate directory loaded");
        Ok(objects)
    }
}
