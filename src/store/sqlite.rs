use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::error::StoreError;
use super::TorrentStore;
use crate::metainfo::Torrent;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS info (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    hash          CHAR(40) NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    piece_length  BIGINT NOT NULL,
    files_number  INT NOT NULL,
    total_length  BIGINT NOT NULL,
    files         TEXT NOT NULL
)";

/// SQLite-backed torrent store.
///
/// A single connection behind a mutex; the workload is one point lookup
/// and at most one small insert per recovered torrent, so contention is
/// noise next to the network round-trips that precede it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a transient in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TorrentStore for SqliteStore {
    fn exists(&self, info_hash_hex: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM info WHERE hash = ?1 LIMIT 1",
                params![info_hash_hex],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, torrent: &Torrent) -> Result<(), StoreError> {
        let files_json = serde_json::to_string(&torrent.files)?;

        let conn = self.conn.lock();
        // OR IGNORE demotes a hash collision to a duplicate: losing the
        // exists/insert race against another worker is not an error.
        conn.execute(
            "INSERT OR IGNORE INTO info (hash, name, piece_length, files_number, total_length, files)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                torrent.info_hash.to_hex(),
                torrent.name,
                torrent.piece_length,
                torrent.files_count() as i64,
                torrent.total_length,
                files_json,
            ],
        )?;
        Ok(())
    }
}
