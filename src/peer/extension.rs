use bytes::Bytes;
use std::collections::BTreeMap;

use super::error::PeerError;
use crate::bencode::{decode, encode, Value};

/// Extension sub-ID of the extension handshake itself.
pub const EXTENSION_HANDSHAKE_ID: u8 = 0;

/// Name of the metadata exchange extension (BEP-9).
pub const UT_METADATA: &str = "ut_metadata";

/// A BEP-10 extension handshake, reduced to the fields the metadata
/// client cares about: the `m` extension table and `metadata_size`.
#[derive(Debug, Clone, Default)]
pub struct ExtensionHandshake {
    /// Extension name to message ID, from the `m` dictionary.
    pub extensions: BTreeMap<String, u8>,
    /// Total metadata size in bytes, if the peer advertised it.
    pub metadata_size: Option<i64>,
}

impl ExtensionHandshake {
    /// Builds the handshake this client sends: ut_metadata mapped to the
    /// given local message ID.
    pub fn for_metadata(local_id: u8) -> Self {
        let mut hs = Self::default();
        hs.extensions.insert(UT_METADATA.to_string(), local_id);
        hs
    }

    /// The peer's message ID for ut_metadata, if it offers the extension.
    pub fn ut_metadata_id(&self) -> Option<u8> {
        self.extensions.get(UT_METADATA).copied()
    }

    pub fn encode(&self) -> Bytes {
        let mut m = BTreeMap::new();
        for (name, id) in &self.extensions {
            m.insert(
                Bytes::copy_from_slice(name.as_bytes()),
                Value::Integer(*id as i64),
            );
        }

        let mut dict = BTreeMap::new();
        dict.insert(Bytes::from_static(b"m"), Value::Dict(m));

        if let Some(size) = self.metadata_size {
            dict.insert(Bytes::from_static(b"metadata_size"), Value::Integer(size));
        }

        Bytes::from(encode(&Value::Dict(dict)))
    }

    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        let value = decode(data)?;
        let dict = value
            .as_dict()
            .ok_or(PeerError::InvalidMessage("extension handshake not a dict"))?;

        let mut hs = Self::default();

        if let Some(m) = dict.get(b"m".as_slice()).and_then(|v| v.as_dict()) {
            for (key, val) in m {
                if let (Ok(name), Some(id)) = (std::str::from_utf8(key), val.as_integer()) {
                    if (1..=i64::from(u8::MAX)).contains(&id) {
                        hs.extensions.insert(name.to_string(), id as u8);
                    }
                }
            }
        }

        hs.metadata_size = dict
            .get(b"metadata_size".as_slice())
            .and_then(|v| v.as_integer());

        Ok(hs)
    }
}
