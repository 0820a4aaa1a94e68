use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::PeerError;

/// The BitTorrent protocol identifier.
pub const PROTOCOL: &[u8] = b"BitTorrent protocol";
/// Length of the handshake message in bytes.
pub const HANDSHAKE_LEN: usize = 68;

/// Message ID of extension protocol frames (BEP-10).
pub const EXTENDED_ID: u8 = 20;

/// The BitTorrent handshake message.
///
/// 68 bytes on the wire: length-prefixed protocol string, 8 reserved
/// bytes, the infohash, and the sender's peer ID. Bit 0x10 of reserved
/// byte 5 advertises the extension protocol ([BEP-10]), which is the one
/// capability the sniffer needs from a peer.
///
/// [BEP-10]: http://bittorrent.org/beps/bep_0010.html
#[derive(Debug, Clone)]
pub struct Handshake {
    /// The torrent's infohash.
    pub info_hash: [u8; 20],
    /// The sender's peer ID.
    pub peer_id: [u8; 20],
    /// Reserved bytes carrying capability flags.
    pub reserved: [u8; 8],
}

impl Handshake {
    /// Creates a handshake advertising extension protocol support.
    pub fn new(info_hash: [u8; 20], peer_id: [u8; 20]) -> Self {
        let mut reserved = [0u8; 8];
        reserved[5] |= 0x10;
        Self {
            info_hash,
            peer_id,
            reserved,
        }
    }

    /// Returns `true` if the peer supports the extension protocol.
    pub fn supports_extension_protocol(&self) -> bool {
        (self.reserved[5] & 0x10) != 0
    }

    /// Encodes the handshake to bytes for transmission.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HANDSHAKE_LEN);
        buf.put_u8(19);
        buf.put_slice(PROTOCOL);
        buf.put_slice(&self.reserved);
        buf.put_slice(&self.info_hash);
        buf.put_slice(&self.peer_id);
        buf.freeze()
    }

    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        if data.len() < HANDSHAKE_LEN {
            return Err(PeerError::InvalidHandshake);
        }

        if data[0] != 19 || &data[1..20] != PROTOCOL {
            return Err(PeerError::InvalidHandshake);
        }

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&data[20..28]);

        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&data[28..48]);

        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&data[48..68]);

        Ok(Self {
            info_hash,
            peer_id,
            reserved,
        })
    }
}

/// A peer wire frame, reduced to what the metadata client reacts to.
///
/// Frames are `u32` big-endian length, one ID byte, payload. Announcing
/// peers still send bitfields, haves, and chokes; none of that matters
/// here, so everything that is not an extension frame decodes to
/// [`Message::Other`] with its payload discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Zero-length heartbeat.
    KeepAlive,
    /// Extension protocol frame ([BEP-10]): sub-ID plus bencoded payload.
    ///
    /// [BEP-10]: http://bittorrent.org/beps/bep_0010.html
    Extended { id: u8, payload: Bytes },
    /// Any other message; the sniffer skips it.
    Other { id: u8 },
}

impl Message {
    /// Creates an extension frame.
    pub fn extended(id: u8, payload: impl Into<Bytes>) -> Self {
        Message::Extended {
            id,
            payload: payload.into(),
        }
    }

    /// Encodes the message, including the length prefix.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        match self {
            Message::KeepAlive => {
                buf.put_u32(0);
            }
            Message::Extended { id, payload } => {
                buf.put_u32(2 + payload.len() as u32);
                buf.put_u8(EXTENDED_ID);
                buf.put_u8(*id);
                buf.put_slice(payload);
            }
            Message::Other { id } => {
                buf.put_u32(1);
                buf.put_u8(*id);
            }
        }

        buf.freeze()
    }

    /// Decodes a complete frame, length prefix included.
    pub fn decode(mut data: Bytes) -> Result<Self, PeerError> {
        if data.len() < 4 {
            return Err(PeerError::InvalidMessage("frame too short"));
        }

        let length = data.get_u32() as usize;

        if length == 0 {
            return Ok(Message::KeepAlive);
        }

        if data.remaining() < length {
            return Err(PeerError::InvalidMessage("incomplete frame"));
        }

        let id = data.get_u8();

        if id == EXTENDED_ID {
            if length < 2 {
                return Err(PeerError::InvalidMessage("extended frame too short"));
            }
            let ext_id = data.get_u8();
            let payload = data.copy_to_bytes(length - 2);
            Ok(Message::Extended {
                id: ext_id,
                payload,
            })
        } else {
            Ok(Message::Other { id })
        }
    }
}
