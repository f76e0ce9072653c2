//! Substrate cache
//!
//! Shared, read-mostly. Reads never consult authority; a server in ghost
//! mode serves from here while the authority is unreachable. Writes are
//! gated on the caller's authority state and are idempotent per hash.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use parking_lot::RwLock;

use interconnect_core::{AuthorityState, InterconnectError, InterconnectResult};

use crate::{ContentHash, DiskStore, SubstrateObject};

/// Content-addressed object cache, optionally backed by a directory
#[derive(Debug, Default)]
pub struct SubstrateCache {
    objects: RwLock<HashMap<ContentHash, SubstrateObject>>,
    disk: Option<DiskStore>,
}

impl SubstrateCache {
    /// In-memory cache
    pub fn new() -> Self {
        SubstrateCache::default()
    }

    /// Cache backed by `dir`; existing objects are loaded
    pub fn open(dir: impl AsRef<Path>) -> InterconnectResult<Self> {
        let disk = DiskStore::open(dir)?;
        let objects = disk
            .load_all()?
            .into_iter()
            .map(|object| (object.hash(), object))
            .collect();
        Ok(SubstrateCache {
            objects: RwLock::new(objects),
            disk: Some(disk),
        })
    }

    pub fn get(&self, hash: &ContentHash) -> Option<SubstrateObject> {
        self.objects.read().get(hash).cloned()
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.objects.read().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Hashes currently cached
    pub fn hashes(&self) -> Vec<ContentHash> {
        self.objects.read().keys().copied().collect()
    }

    /// Store `bytes` on behalf of a unit in `state`.
    ///
    /// Fails with `AuthorityRequired` unless `state` permits writes. Storing
    /// bytes that are already cached returns the existing hash.
    pub fn put(&self, state: &AuthorityState, bytes: impl Into<Bytes>) -> InterconnectResult<ContentHash> {
        if !state.permits_writes() {
            tracing::debug!(%state, "substrate write refused");
            return Err(InterconnectError::AuthorityRequired(state.clone()));
        }

        let object = SubstrateObject::new(bytes);
        let hash = object.hash();

        let mut objects = self.objects.write();
        if objects.contains_key(&hash) {
            return Ok(hash);
        }
        if let Some(disk) = &self.disk {
            disk.write(&object)?;
        }
        tracing::debug!(?hash, size = object.len(), "substrate object stored");
        objects.insert(hash, object);
        Ok(hash)
    }

    /// Insert an object fetched from a peer. Content addressing makes this
    /// safe in any authority state: the object either hashes to its key or
    /// it is a different object.
    pub fn import(&self, object: SubstrateObject) -> InterconnectResult<ContentHash> {
        let hash = object.hash();
        let mut objects = self.objects.write();
        if !objects.contains_key(&hash) {
            if let Some(disk) = &self.disk {
                disk.write(&object)?;
            }
            objects.insert(hash, object);
        }
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interconnect_core::ServerRef;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_put_get() {
        let cache = SubstrateCache::new();
        let hash = cache.put(&AuthorityState::Active, &b"terrain"[..]).unwrap();
        assert_eq!(&cache.get(&hash).unwrap().bytes()[..], b"terrain");
        assert!(cache.get(&ContentHash::of(b"missing")).is_none());
    }

    #[test]
    fn test_write_requires_authority() {
        let cache = SubstrateCache::new();
        let existing = cache.put(&AuthorityState::Active, &b"map"[..]).unwrap();

        for state in [
            AuthorityState::Ghost,
            AuthorityState::Unreachable,
            AuthorityState::Transferred { to: ServerRef::new("b") },
            AuthorityState::Delegated { to: ServerRef::new("b") },
        ] {
            assert_eq!(
                cache.put(&state, &b"new"[..]),
                Err(InterconnectError::AuthorityRequired(state.clone()))
            );
            assert!(cache.get(&existing).is_some());
        }

        let delegated_here = AuthorityState::DelegatedFrom { origin: ServerRef::new("a") };
        assert!(cache.put(&delegated_here, &b"new"[..]).is_ok());
    }

    #[test]
    fn test_import_ignores_authority() {
        let cache = SubstrateCache::new();
        let object = SubstrateObject::new(&b"peer"[..]);
        let hash = cache.import(object.clone()).unwrap();
        assert_eq!(cache.get(&hash), Some(object));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let hash = {
            let cache = SubstrateCache::open(dir.path()).unwrap();
            cache.put(&AuthorityState::Active, &b"persisted"[..]).unwrap()
        };
        let reopened = SubstrateCache::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.contains(&hash));
    }

    #[test]
    fn test_concurrent_writers_same_bytes() {
        let cache = Arc::new(SubstrateCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.put(&AuthorityState::Active, &b"same"[..]).unwrap())
            })
            .collect();
        let hashes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.len(), 1);
    }

    proptest! {
        #[test]
        fn test_put_is_idempotent(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cache = SubstrateCache::new();
            let first = cache.put(&AuthorityState::Active, bytes.clone()).unwrap();
            let second = cache.put(&AuthorityState::Active, bytes.clone()).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(cache.len(), 1);
            let got = cache.get(&first).unwrap();
            prop_assert_eq!(&got.bytes()[..], &bytes[..]);
        }
    }
}
