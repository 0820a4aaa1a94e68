//! btsniff - a passive BitTorrent DHT sniffer
//!
//! btsniff joins the Mainline DHT as a write-only node, harvests
//! `announce_peer` traffic from strangers, connects back to each announcing
//! peer over the peer wire protocol, downloads the torrent's `info`
//! dictionary via ut_metadata, and persists the parsed metadata
//! deduplicated by infohash.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode encoding/decoding
//! - [`dht`] - BEP-5 write-only DHT node that harvests announces
//! - [`peer`] - BEP-3/10/9 peer wire client that fetches `info` dictionaries
//! - [`metainfo`] - parsed torrent metadata and infohashes
//! - [`announce`] - bounded queue between the DHT node and the workers
//! - [`blacklist`] - time-windowed set of misbehaving peers
//! - [`store`] - persistence adapter deduplicating by infohash
//! - [`sniffer`] - worker supervisor tying the pipeline together

pub mod announce;
pub mod bencode;
pub mod blacklist;
pub mod dht;
pub mod metainfo;
pub mod peer;
pub mod sniffer;
pub mod store;

pub use announce::{AnnounceQueue, Announcement};
pub use bencode::{decode, decode_prefix, encode, BencodeError, Value};
pub use blacklist::Blacklist;
pub use dht::{DhtError, DhtSniffer, KrpcPacket, KrpcQuery, Node, NodeId};
pub use metainfo::{InfoHash, MetainfoError, Torrent, TorrentFile};
pub use peer::{fetch_metadata, ExtensionHandshake, Handshake, MetadataMessage, PeerError};
pub use sniffer::{Config, Sniffer};
pub use store::{MemoryStore, SqliteStore, StoreError, TorrentStore};
