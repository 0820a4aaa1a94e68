use thiserror::Error;

/// Errors from the DHT node.
///
/// Only [`DhtError::Io`] is ever fatal (the UDP socket is gone); parse
/// errors exist so the receive loop can discard a packet with `?` and
/// move on.
#[derive(Debug, Error)]
pub enum DhtError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    #[error("malformed message: {0}")]
    Malformed(&'static str),
}
