use sha1::{Digest, Sha1};
use std::fmt;

use super::error::MetainfoError;

/// A BitTorrent v1 infohash: the SHA-1 of a bencoded `info` dictionary.
///
/// The infohash is the identity of a torrent. Its textual form is always
/// 40 lowercase hex characters.
///
/// # Examples
///
/// ```
/// use btsniff::metainfo::InfoHash;
///
/// let hash = InfoHash::from_bytes(&[0xab; 20]).unwrap();
/// assert_eq!(hash.to_hex(), "abababababababababababababababababababab");
/// assert_eq!(InfoHash::from_hex(&hash.to_hex()).unwrap(), hash);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(pub [u8; 20]);

impl InfoHash {
    /// Creates an infohash from a 20-byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetainfoError> {
        if bytes.len() != 20 {
            return Err(MetainfoError::InvalidHashLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Computes the infohash of raw bencoded `info` bytes.
    pub fn of(info_bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(info_bytes);
        let hash: [u8; 20] = hasher.finalize().into();
        Self(hash)
    }

    /// Parses an infohash from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, MetainfoError> {
        if s.len() != 40 {
            return Err(MetainfoError::InvalidHashLength);
        }
        let bytes = hex_decode(s).ok_or(MetainfoError::InvalidHashLength)?;
        Self::from_bytes(&bytes)
    }

    /// Returns the raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Converts to a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    /// Returns a magnet link for this infohash.
    pub fn magnet(&self) -> String {
        format!("magnet:?xt=urn:btih:{}", self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
            s
        })
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
