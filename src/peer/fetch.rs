use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use super::error::PeerError;
use super::extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID};
use super::message::{Handshake, Message};
use super::metadata::{piece_count, MetadataMessage, MetadataMessageType, METADATA_PIECE_SIZE};
use super::peer_id::PeerId;
use super::transport::PeerTransport;
use crate::metainfo::InfoHash;

/// Upper bound on `metadata_size`. Real `info` dictionaries top out far
/// below this; anything larger is a peer trying to waste memory.
pub const MAX_METADATA_SIZE: i64 = 10 * 1024 * 1024;

/// The extension message ID this client assigns to ut_metadata in its own
/// handshake; peers address their data messages to it.
const LOCAL_UT_METADATA_ID: u8 = 1;

/// Fetches the raw bencoded `info` dictionary for `info_hash` from a peer.
///
/// Runs the whole exchange (connect, both handshakes, the in-order piece
/// loop, SHA-1 verification) under one `deadline`. On success the
/// returned bytes are authentic: their SHA-1 equals `info_hash`.
pub async fn fetch_metadata(
    peer: SocketAddr,
    info_hash: InfoHash,
    deadline: Duration,
) -> Result<Bytes, PeerError> {
    timeout(deadline, fetch_inner(peer, info_hash))
        .await
        .map_err(|_| PeerError::Timeout)?
}

async fn fetch_inner(peer: SocketAddr, info_hash: InfoHash) -> Result<Bytes, PeerError> {
    let stream = TcpStream::connect(peer).await?;
    let mut transport = PeerTransport::new(stream);

    let ours = Handshake::new(*info_hash.as_bytes(), *PeerId::generate().as_bytes());
    transport.send_handshake(&ours).await?;

    let theirs = transport.receive_handshake().await?;
    if theirs.info_hash != *info_hash.as_bytes() {
        return Err(PeerError::InfoHashMismatch);
    }
    if !theirs.supports_extension_protocol() {
        return Err(PeerError::NoExtensionProtocol);
    }

    let hello = ExtensionHandshake::for_metadata(LOCAL_UT_METADATA_ID);
    transport
        .send_message(&Message::extended(EXTENSION_HANDSHAKE_ID, hello.encode()))
        .await?;

    let (remote_id, metadata_size) = wait_for_extension_handshake(&mut transport).await?;
    let total = metadata_size as usize;
    let pieces = piece_count(total);

    trace!(%peer, metadata_size, pieces, "metadata exchange negotiated");

    let mut assembled = BytesMut::with_capacity(total);
    for piece in 0..pieces as u32 {
        let request = MetadataMessage::request(piece).encode();
        transport
            .send_message(&Message::extended(remote_id, request))
            .await?;

        let reply = wait_for_metadata_message(&mut transport).await?;
        match reply.msg_type {
            MetadataMessageType::Data => {}
            MetadataMessageType::Reject => return Err(PeerError::PieceRejected(piece)),
            MetadataMessageType::Request => {
                return Err(PeerError::InvalidMessage("peer sent metadata request"))
            }
        }

        if reply.piece != piece {
            return Err(PeerError::UnexpectedPiece {
                expected: piece,
                got: reply.piece,
            });
        }

        let data = reply
            .data
            .ok_or(PeerError::InvalidMessage("data message without payload"))?;
        if data.len() > METADATA_PIECE_SIZE {
            return Err(PeerError::InvalidMessage("oversized metadata piece"));
        }

        assembled.extend_from_slice(&data);
    }

    if assembled.len() != total {
        return Err(PeerError::SizeMismatch {
            expected: total,
            got: assembled.len(),
        });
    }

    let assembled = assembled.freeze();
    if InfoHash::of(&assembled) != info_hash {
        return Err(PeerError::HashMismatch);
    }

    Ok(assembled)
}

/// Reads frames until the peer's extension handshake arrives, skipping the
/// bitfields, haves, and chokes peers volunteer after connecting.
async fn wait_for_extension_handshake(
    transport: &mut PeerTransport,
) -> Result<(u8, i64), PeerError> {
    loop {
        match transport.receive_message().await? {
            Message::Extended {
                id: EXTENSION_HANDSHAKE_ID,
                payload,
            } => {
                let theirs = ExtensionHandshake::decode(&payload)?;
                let remote_id = theirs
                    .ut_metadata_id()
                    .ok_or(PeerError::NoMetadataExtension)?;

                let metadata_size = theirs.metadata_size.ok_or(PeerError::BadMetadataSize(0))?;
                if metadata_size <= 0 || metadata_size > MAX_METADATA_SIZE {
                    return Err(PeerError::BadMetadataSize(metadata_size));
                }

                return Ok((remote_id, metadata_size));
            }
            _ => continue,
        }
    }
}

/// Reads frames until a ut_metadata message addressed to us arrives.
async fn wait_for_metadata_message(
    transport: &mut PeerTransport,
) -> Result<MetadataMessage, PeerError> {
    loop {
        match transport.receive_message().await? {
            Message::Extended {
                id: LOCAL_UT_METADATA_ID,
                payload,
            } => return MetadataMessage::decode(&payload),
            _ => continue,
        }
    }
}
