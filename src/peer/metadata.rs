use bytes::Bytes;
use std::collections::BTreeMap;

use super::error::PeerError;
use crate::bencode::{decode_prefix, encode, Value};

/// Size of a metadata piece (BEP-9); only the last piece may be smaller.
pub const METADATA_PIECE_SIZE: usize = 16384;

/// ut_metadata message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMessageType {
    /// Request a piece of metadata.
    Request = 0,
    /// Provide a piece of metadata.
    Data = 1,
    /// Refuse a metadata request.
    Reject = 2,
}

impl MetadataMessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MetadataMessageType::Request),
            1 => Some(MetadataMessageType::Data),
            2 => Some(MetadataMessageType::Reject),
            _ => None,
        }
    }
}

/// A ut_metadata message (BEP-9).
///
/// On the wire this is a bencoded header dictionary; data messages put
/// the raw piece bytes immediately after it in the same frame.
#[derive(Debug, Clone)]
pub struct MetadataMessage {
    pub msg_type: MetadataMessageType,
    pub piece: u32,
    /// Total metadata size, echoed in data messages.
    pub total_size: Option<i64>,
    /// Raw piece bytes of a data message.
    pub data: Option<Bytes>,
}

impl MetadataMessage {
    /// Builds a request for one metadata piece.
    pub fn request(piece: u32) -> Self {
        Self {
            msg_type: MetadataMessageType::Request,
            piece,
            total_size: None,
            data: None,
        }
    }

    /// Builds a data message carrying one piece.
    pub fn data(piece: u32, total_size: i64, data: Bytes) -> Self {
        Self {
            msg_type: MetadataMessageType::Data,
            piece,
            total_size: Some(total_size),
            data: Some(data),
        }
    }

    /// Builds a reject for one piece.
    pub fn reject(piece: u32) -> Self {
        Self {
            msg_type: MetadataMessageType::Reject,
            piece,
            total_size: None,
            data: None,
        }
    }

    /// Encodes the header dictionary, with piece bytes appended for data
    /// messages.
    pub fn encode(&self) -> Bytes {
        let mut dict = BTreeMap::new();
        dict.insert(
            Bytes::from_static(b"msg_type"),
            Value::Integer(self.msg_type as u8 as i64),
        );
        dict.insert(
            Bytes::from_static(b"piece"),
            Value::Integer(self.piece as i64),
        );
        if let Some(total_size) = self.total_size {
            dict.insert(
                Bytes::from_static(b"total_size"),
                Value::Integer(total_size),
            );
        }

        let mut out = encode(&Value::Dict(dict));
        if let Some(ref data) = self.data {
            out.extend_from_slice(data);
        }
        Bytes::from(out)
    }

    /// Decodes a message from an extension frame payload.
    ///
    /// The decoder reports where the header dictionary ends, and the rest
    /// of the payload is taken verbatim as the piece bytes.
    pub fn decode(payload: &[u8]) -> Result<Self, PeerError> {
        let (value, consumed) = decode_prefix(payload)?;
        let dict = value
            .as_dict()
            .ok_or(PeerError::InvalidMessage("metadata header not a dict"))?;

        let msg_type = dict
            .get(b"msg_type".as_slice())
            .and_then(|v| v.as_integer())
            .and_then(|v| u8::try_from(v).ok())
            .and_then(MetadataMessageType::from_byte)
            .ok_or(PeerError::InvalidMessage("bad metadata msg_type"))?;

        let piece = dict
            .get(b"piece".as_slice())
            .and_then(|v| v.as_integer())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(PeerError::InvalidMessage("bad metadata piece"))?;

        let total_size = dict
            .get(b"total_size".as_slice())
            .and_then(|v| v.as_integer());

        let data = if msg_type == MetadataMessageType::Data {
            Some(Bytes::copy_from_slice(&payload[consumed..]))
        } else {
            None
        };

        Ok(Self {
            msg_type,
            piece,
            total_size,
            data,
        })
    }
}

/// Number of pieces a metadata blob of the given size transfers as.
pub fn piece_count(metadata_size: usize) -> usize {
    metadata_size.div_ceil(METADATA_PIECE_SIZE)
}
