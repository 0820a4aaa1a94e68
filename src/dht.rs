//! Write-only DHT node ([BEP-5]).
//!
//! This is not a well-behaved Kademlia participant. The node keeps no
//! routing table and tracks no outstanding transactions; its only goal is
//! to be *queried*: to look like a close neighbor of as many infohashes
//! as possible so strangers send it `get_peers` and `announce_peer`.
//!
//! Two tricks make that work:
//!
//! - **Sybil-neighbor IDs.** Replies are signed with an ephemeral ID whose
//!   first 15 bytes are copied from the counterparty's target (their node
//!   ID or the infohash), so the remote routing tables file this node next
//!   to whatever they were asking about.
//! - **Friend-making.** A periodic loop sends `find_node` queries (random
//!   targets, rate-capped) to every node address it has ever heard of.
//!   Nodes harvested from the replies become the next round's targets and
//!   are then forgotten.
//!
//! Announces extracted from incoming queries are published to an
//! [`AnnounceQueue`](crate::announce::AnnounceQueue) with a non-blocking
//! push; when the workers fall behind, announcements are dropped rather
//! than ever stalling the UDP receive loop. Malformed packets are dropped
//! in silence; no KRPC error replies, nothing to fingerprint.
//!
//! [BEP-5]: http://bittorrent.org/beps/bep_0005.html

mod error;
mod message;
mod node;
mod sniffer;

pub use error::DhtError;
pub use message::{KrpcPacket, KrpcQuery};
pub use node::{Node, NodeId};
pub use sniffer::{DhtSniffer, BOOTSTRAP_NODES};

#[cfg(test)]
mod tests;
