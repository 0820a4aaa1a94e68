use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::error::DhtError;
use super::message::{self, KrpcPacket, KrpcQuery};
use super::node::{Node, NodeId};
use crate::announce::{AnnounceQueue, Announcement};
use crate::metainfo::InfoHash;

/// Well-known routers used to (re)join the network when no other node
/// addresses are on hand.
pub const BOOTSTRAP_NODES: &[&str] = &[
    "router.bittorrent.com:6881",
    "dht.transmissionbt.com:6881",
    "router.utorrent.com:6881",
];

const RECV_BUFFER_SIZE: usize = 65535;
const MIN_CANDIDATE_CAPACITY: usize = 64;

/// The write-only DHT node.
///
/// One task owns the receive side of the UDP socket via [`DhtSniffer::run`];
/// outbound writes go through `send_to`, which is safe to issue from the
/// same task between reads. Harvested announces are published to the
/// shared [`AnnounceQueue`] and never awaited on.
pub struct DhtSniffer {
    socket: UdpSocket,
    base_id: NodeId,
    queue: Arc<AnnounceQueue>,
    max_friends: usize,
    peek_get_peers: bool,
    candidates: Mutex<VecDeque<Node>>,
    candidate_capacity: usize,
}

impl DhtSniffer {
    /// Binds the UDP socket.
    ///
    /// A bind failure is fatal; everything after this point degrades
    /// gracefully except the loss of this socket.
    pub async fn bind(
        addr: SocketAddr,
        queue: Arc<AnnounceQueue>,
        max_friends: usize,
        peek_get_peers: bool,
    ) -> Result<Self, DhtError> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        let base_id = NodeId::generate();

        info!(%local_addr, %base_id, "dht node listening");

        Ok(Self {
            socket,
            base_id,
            queue,
            max_friends,
            peek_get_peers,
            candidates: Mutex::new(VecDeque::new()),
            candidate_capacity: max_friends.max(MIN_CANDIDATE_CAPACITY),
        })
    }

    /// Port the socket is bound to.
    pub fn port(&self) -> u16 {
        self.socket.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    /// Runs the receive loop and the friend-making loop.
    ///
    /// Returns only when the socket is lost; that error is the one fatal
    /// condition the supervisor shuts down on.
    pub async fn run(&self) -> Result<(), DhtError> {
        tokio::select! {
            result = self.recv_loop() => result,
            _ = self.friends_loop() => unreachable!("friends loop never returns"),
        }
    }

    /// Sole reader of the socket. Must never wait on downstream work:
    /// announcements are published with a non-blocking push.
    async fn recv_loop(&self) -> Result<(), DhtError> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (n, from) = self.socket.recv_from(&mut buf).await?;
            self.handle_packet(&buf[..n], from).await;
        }
    }

    async fn friends_loop(&self) {
        let mut tick = interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            self.make_friends().await;
        }
    }

    /// Sends one round of `find_node` queries, at most `max_friends` per
    /// tick. Targets are random so coverage spreads over the whole ID
    /// space; queried nodes are forgotten once the packet is out.
    async fn make_friends(&self) {
        let batch: Vec<Node> = {
            let mut candidates = self.candidates.lock();
            let n = candidates.len().min(self.max_friends);
            candidates.drain(..n).collect()
        };

        if batch.is_empty() {
            self.bootstrap().await;
            return;
        }

        for node in batch {
            let transaction_id: [u8; 2] = rand::random();
            let packet = message::find_node_query(
                &transaction_id,
                &NodeId::neighbor(node.id.as_bytes()),
                &NodeId::generate(),
            );
            self.send(&packet, node.addr).await;
        }
    }

    async fn bootstrap(&self) {
        for &host in BOOTSTRAP_NODES {
            let addr = match tokio::net::lookup_host(host).await {
                Ok(mut addrs) => addrs.find(|a| a.is_ipv4()),
                Err(err) => {
                    debug!(%err, host, "bootstrap resolve failed");
                    continue;
                }
            };

            if let Some(addr) = addr {
                let transaction_id: [u8; 2] = rand::random();
                let packet =
                    message::find_node_query(&transaction_id, &self.base_id, &NodeId::generate());
                self.send(&packet, addr).await;
            }
        }
    }

    async fn handle_packet(&self, data: &[u8], from: SocketAddr) {
        if !from.is_ipv4() {
            return;
        }

        // Anything that does not parse is dropped without a reply;
        // answering malformed traffic with KRPC errors would only make
        // this node easier to fingerprint.
        let Ok(packet) = KrpcPacket::parse(data) else {
            return;
        };

        match packet {
            KrpcPacket::Response { nodes } => self.add_candidates(nodes),
            KrpcPacket::Query {
                transaction_id,
                sender_id,
                query,
            } => match query {
                KrpcQuery::Ping => {
                    let id = NodeId::neighbor(sender_id.as_bytes());
                    self.send(&message::pong_reply(&transaction_id, &id), from)
                        .await;
                }
                KrpcQuery::FindNode { .. } => {
                    let id = NodeId::neighbor(sender_id.as_bytes());
                    self.send(&message::find_node_reply(&transaction_id, &id), from)
                        .await;
                }
                KrpcQuery::GetPeers { info_hash } => {
                    let id = NodeId::neighbor(&info_hash);
                    let token: [u8; 8] = rand::random();
                    self.send(
                        &message::get_peers_reply(&transaction_id, &id, &token),
                        from,
                    )
                    .await;

                    // A get_peers is a weaker signal than an announce
                    // (the sender is looking for the torrent, not serving
                    // it) but it often precedes one and widens coverage.
                    // The TCP port is unknown, so the UDP source port
                    // stands in.
                    if self.peek_get_peers {
                        self.publish(info_hash, from);
                    }
                }
                KrpcQuery::AnnouncePeer {
                    info_hash,
                    port,
                    implied_port,
                } => {
                    // With implied_port the announced port field is
                    // irrelevant (often 0 or absent); without it, an
                    // unusable port means there is no peer to dial.
                    let peer_port = if implied_port { Some(from.port()) } else { port };
                    if let Some(peer_port) = peer_port {
                        self.publish(info_hash, SocketAddr::new(from.ip(), peer_port));
                    }

                    let id = NodeId::neighbor(sender_id.as_bytes());
                    self.send(&message::pong_reply(&transaction_id, &id), from)
                        .await;
                }
            },
        }
    }

    fn publish(&self, info_hash: [u8; 20], peer: SocketAddr) {
        let announcement = Announcement::new(InfoHash(info_hash), peer);
        if !self.queue.push(announcement) {
            debug!(total_dropped = self.queue.dropped(), "announce queue full");
        }
    }

    fn add_candidates(&self, nodes: Vec<Node>) {
        let mut candidates = self.candidates.lock();
        for node in nodes {
            if candidates.len() >= self.candidate_capacity {
                break;
            }
            candidates.push_back(node);
        }
    }

    async fn send(&self, packet: &[u8], to: SocketAddr) {
        if let Err(err) = self.socket.send_to(packet, to).await {
            debug!(%err, %to, "udp send failed");
        }
    }
}
