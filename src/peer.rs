//! Peer wire metadata client (BEP-3, BEP-10, BEP-9).
//!
//! A deliberately small slice of the peer wire protocol: enough to shake
//! hands with an announcing peer, negotiate the ut_metadata extension,
//! and pull down the torrent's `info` dictionary. No pieces, no choking,
//! no seeding. Peers here are strangers who claimed, over UDP, to serve
//! a torrent; most of them lie, stall, or speak garbage, so every exchange
//! runs under a single deadline and any failure is terminal.

mod error;
mod extension;
mod fetch;
mod message;
mod metadata;
mod peer_id;
mod transport;

pub use error::PeerError;
pub use extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID, UT_METADATA};
pub use fetch::{fetch_metadata, MAX_METADATA_SIZE};
pub use message::{Handshake, Message, HANDSHAKE_LEN};
pub use metadata::{piece_count, MetadataMessage, MetadataMessageType, METADATA_PIECE_SIZE};
pub use peer_id::PeerId;
pub use transport::{PeerTransport, MAX_FRAME_SIZE};
