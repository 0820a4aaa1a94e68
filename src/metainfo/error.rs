use thiserror::Error;

/// Errors that can occur while handling torrent metadata.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The metadata payload is not valid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    /// The metadata payload is not a dictionary.
    #[error("info is not a dictionary")]
    NotADictionary,

    /// An infohash was not exactly 20 bytes (or 40 hex characters).
    #[error("invalid infohash length")]
    InvalidHashLength,
}
