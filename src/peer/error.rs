use thiserror::Error;

/// Errors that can occur during a metadata exchange.
///
/// Every variant is terminal for the job and lands the peer on the
/// blacklist; none of them are retried.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Network I/O error (connect refused, reset, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The overall deadline for the exchange expired.
    #[error("deadline expired")]
    Timeout,

    /// The peer closed the connection mid-exchange.
    #[error("connection closed")]
    ConnectionClosed,

    /// The handshake was not 68 bytes of BitTorrent protocol.
    #[error("invalid handshake")]
    InvalidHandshake,

    /// The peer answered the handshake with a different infohash.
    #[error("info hash mismatch")]
    InfoHashMismatch,

    /// The peer does not speak the extension protocol (BEP-10).
    #[error("peer does not support extensions")]
    NoExtensionProtocol,

    /// The peer's extension handshake does not offer ut_metadata.
    #[error("peer does not support ut_metadata")]
    NoMetadataExtension,

    /// `metadata_size` was absent, non-positive, or over the cap.
    #[error("unusable metadata size: {0}")]
    BadMetadataSize(i64),

    /// A frame announced a length over the per-message cap.
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// A malformed protocol or extension message.
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),

    /// The peer rejected a metadata piece request.
    #[error("metadata piece {0} rejected")]
    PieceRejected(u32),

    /// A data message carried the wrong piece index.
    #[error("expected metadata piece {expected}, got {got}")]
    UnexpectedPiece { expected: u32, got: u32 },

    /// Assembled metadata did not match the announced size.
    #[error("metadata size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// SHA-1 of the assembled metadata did not match the infohash.
    #[error("metadata hash mismatch")]
    HashMismatch,

    /// Bencode decode error in an extension payload.
    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),
}
