//! Persistence adapter.
//!
//! One table, keyed by infohash. The contract is deliberately small:
//! `exists` answers "have we stored this torrent before", `insert` stores
//! it idempotently. The unique index on the hash column is what makes the
//! dedup guarantee hold even when two workers race the same infohash:
//! the loser's insert becomes a no-op, never an error the pipeline sees.
//!
//! Implementations serialize internally; workers share one adapter behind
//! an `Arc`.

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::metainfo::Torrent;

/// Where recovered torrents end up.
pub trait TorrentStore: Send + Sync {
    /// Returns `true` if a record with this infohash was stored before.
    fn exists(&self, info_hash_hex: &str) -> Result<bool, StoreError>;

    /// Stores a torrent. Inserting an infohash that is already present
    /// is a no-op, not an error.
    fn insert(&self, torrent: &Torrent) -> Result<(), StoreError>;
}
