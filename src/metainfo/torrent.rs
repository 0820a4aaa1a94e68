use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, Value};

/// A file within a torrent.
///
/// For multi-file torrents the name is the path components joined with
/// `/`; for single-file torrents it is the torrent name itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    pub name: String,
    pub length: i64,
}

/// A torrent parsed from a raw `info` dictionary.
///
/// This is the shape the sniffer persists: no piece hashes, no trackers,
/// just what identifies and describes the content.
#[derive(Debug, Clone)]
pub struct Torrent {
    /// The torrent's identity (SHA-1 of the raw `info` bytes).
    pub info_hash: InfoHash,
    /// Display name (`name.utf-8` preferred over `name`).
    pub name: String,
    /// Total content size; the sum of file lengths when not given directly.
    pub total_length: i64,
    /// Bytes per piece.
    pub piece_length: i64,
    /// Files, with a synthetic single entry for single-file torrents.
    pub files: Vec<TorrentFile>,
}

impl Torrent {
    /// Parses a raw bencoded `info` dictionary.
    ///
    /// Missing fields degrade to defaults (empty name, zero lengths); the
    /// dictionaries arrive from arbitrary peers and partial metadata is
    /// still worth recording once its SHA-1 has been verified upstream.
    ///
    /// # Errors
    ///
    /// Fails only if the payload is not bencode or not a dictionary.
    pub fn from_info_bytes(info: &[u8], info_hash: InfoHash) -> Result<Self, MetainfoError> {
        let value = decode(info)?;
        let dict = value.as_dict().ok_or(MetainfoError::NotADictionary)?;

        let name = dict
            .get(b"name.utf-8".as_slice())
            .or_else(|| dict.get(b"name".as_slice()))
            .and_then(|v| v.as_bytes())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();

        let piece_length = dict
            .get(b"piece length".as_slice())
            .and_then(|v| v.as_integer())
            .unwrap_or(0);

        let mut total_length = dict
            .get(b"length".as_slice())
            .and_then(|v| v.as_integer())
            .unwrap_or(0);

        let mut files = Vec::new();
        if let Some(list) = dict.get(b"files".as_slice()).and_then(|v| v.as_list()) {
            let mut files_total = 0i64;
            for entry in list {
                let Some(file) = entry.as_dict() else {
                    continue;
                };

                let path = file
                    .get(b"path.utf-8".as_slice())
                    .or_else(|| file.get(b"path".as_slice()))
                    .and_then(|v| v.as_list())
                    .map(join_path)
                    .unwrap_or_default();

                let length = file
                    .get(b"length".as_slice())
                    .and_then(|v| v.as_integer())
                    .unwrap_or(0);

                files_total += length;
                files.push(TorrentFile { name: path, length });
            }

            if total_length == 0 {
                total_length = files_total;
            }
        }

        if files.is_empty() {
            files.push(TorrentFile {
                name: name.clone(),
                length: total_length,
            });
        }

        Ok(Self {
            info_hash,
            name,
            total_length,
            piece_length,
            files,
        })
    }

    /// Number of files in the torrent.
    pub fn files_count(&self) -> usize {
        self.files.len()
    }

    /// The torrent name with path separators and NULs replaced, safe to
    /// use as a file name for archiving.
    pub fn sanitized_name(&self) -> String {
        let cleaned: String = self
            .name
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect();

        if cleaned.is_empty() {
            self.info_hash.to_hex()
        } else {
            cleaned
        }
    }
}

fn join_path(components: &Vec<Value>) -> String {
    components
        .iter()
        .filter_map(|v| v.as_bytes())
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Wraps raw `info` bytes into a minimal `.torrent` file.
///
/// The raw bytes are already bencoded, so the wrapper is just the outer
/// dictionary: `d4:info<raw>e`.
pub fn torrent_file_bytes(raw_info: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(raw_info.len() + 8);
    out.extend_from_slice(b"d4:info");
    out.extend_from_slice(raw_info);
    out.push(b'e');
    Bytes::from(out)
}
