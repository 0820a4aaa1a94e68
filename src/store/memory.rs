use parking_lot::Mutex;
use std::collections::HashMap;

use super::error::StoreError;
use super::TorrentStore;
use crate::metainfo::Torrent;

/// In-memory torrent store for tests.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, Torrent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored torrent by infohash hex.
    pub fn get(&self, info_hash_hex: &str) -> Option<Torrent> {
        self.rows.lock().get(info_hash_hex).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl TorrentStore for MemoryStore {
    fn exists(&self, info_hash_hex: &str) -> Result<bool, StoreError> {
        Ok(self.rows.lock().contains_key(info_hash_hex))
    }

    fn insert(&self, torrent: &Torrent) -> Result<(), StoreError> {
        self.rows
            .lock()
            .entry(torrent.info_hash.to_hex())
            .or_insert_with(|| torrent.clone());
        Ok(())
    }
}
