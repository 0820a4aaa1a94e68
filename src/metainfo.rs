//! Torrent metadata model.
//!
//! Infohashes and the parsed form of a torrent's `info` dictionary. The
//! parser here is deliberately forgiving: the dictionaries it sees come
//! from strangers on the DHT, so missing or oddly-typed fields degrade to
//! defaults instead of failing the whole torrent. The only hard
//! requirements are that the payload is bencode and that its root is a
//! dictionary; authenticity is established separately by comparing the
//! SHA-1 of the raw bytes against the announced infohash.

mod error;
mod info_hash;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::{torrent_file_bytes, Torrent, TorrentFile};

#[cfg(test)]
mod tests;
