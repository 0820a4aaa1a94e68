//! Worker supervisor.
//!
//! Glues the pipeline together: one DHT node producing announcements, a
//! pool of short-lived metadata jobs consuming them. The pool is bounded
//! by a semaphore of `max_peers` permits; a job holds exactly one permit
//! from before it is spawned until it finishes. Per-job errors are logged
//! and swallowed, after blacklisting the peer where it earned it; the
//! only error that takes the process down is losing the DHT socket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::announce::{AnnounceQueue, Announcement, DEFAULT_QUEUE_CAPACITY};
use crate::blacklist::Blacklist;
use crate::dht::{DhtError, DhtSniffer};
use crate::metainfo::{torrent_file_bytes, Torrent};
use crate::peer::fetch_metadata;
use crate::store::TorrentStore;

/// Tuning knobs for a sniffer instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the DHT socket.
    pub addr: IpAddr,
    /// UDP port; also the TCP port this node advertises as a peer.
    pub port: u16,
    /// Outbound DHT queries per second.
    pub max_friends: usize,
    /// Concurrent metadata jobs.
    pub max_peers: usize,
    /// Deadline for one whole metadata exchange.
    pub fetch_timeout: Duration,
    /// Where to archive recovered `.torrent` files, if anywhere.
    pub archive_dir: Option<PathBuf>,
    /// Also chase infohashes seen only in `get_peers` queries.
    pub peek_get_peers: bool,
    /// Announcement queue capacity.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 6882,
            max_friends: 5000,
            max_peers: 5000,
            fetch_timeout: Duration::from_secs(10),
            archive_dir: None,
            peek_get_peers: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// The sniffer: DHT node, announcement queue, worker pool, store.
pub struct Sniffer {
    config: Config,
    store: Arc<dyn TorrentStore>,
    blacklist: Arc<Blacklist>,
    queue: Arc<AnnounceQueue>,
}

impl Sniffer {
    pub fn new(config: Config, store: Arc<dyn TorrentStore>) -> Self {
        let queue = Arc::new(AnnounceQueue::new(config.queue_capacity));
        Self {
            config,
            store,
            blacklist: Arc::new(Blacklist::default()),
            queue,
        }
    }

    /// The announcement queue, exposed for observability (length, drops).
    pub fn queue(&self) -> &Arc<AnnounceQueue> {
        &self.queue
    }

    /// The peer blacklist.
    pub fn blacklist(&self) -> &Arc<Blacklist> {
        &self.blacklist
    }

    /// Runs until the DHT socket is lost.
    ///
    /// Binding failures surface immediately; after that the loop drains
    /// the queue whenever its readiness signal fires, spawning one job
    /// per announcement under the `max_peers` semaphore.
    pub async fn run(&self) -> Result<(), DhtError> {
        let bind_addr = SocketAddr::new(self.config.addr, self.config.port);
        let dht = Arc::new(
            DhtSniffer::bind(
                bind_addr,
                Arc::clone(&self.queue),
                self.config.max_friends,
                self.config.peek_get_peers,
            )
            .await?,
        );

        let mut dht_task = tokio::spawn({
            let dht = Arc::clone(&dht);
            async move { dht.run().await }
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_peers));
        let worker = Worker {
            store: Arc::clone(&self.store),
            blacklist: Arc::clone(&self.blacklist),
            fetch_timeout: self.config.fetch_timeout,
            archive_dir: self.config.archive_dir.clone(),
        };

        loop {
            tokio::select! {
                _ = self.queue.ready() => {
                    while let Some(announcement) = self.queue.pop() {
                        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                            break;
                        };
                        let worker = worker.clone();
                        tokio::spawn(async move {
                            worker.handle(announcement).await;
                            drop(permit);
                        });
                    }
                }
                result = &mut dht_task => {
                    return match result {
                        Ok(inner) => inner,
                        Err(err) => {
                            error!(%err, "dht task aborted");
                            Ok(())
                        }
                    };
                }
            }
        }
    }
}

/// Everything one metadata job needs, cheap to clone per announcement.
#[derive(Clone)]
struct Worker {
    store: Arc<dyn TorrentStore>,
    blacklist: Arc<Blacklist>,
    fetch_timeout: Duration,
    archive_dir: Option<PathBuf>,
}

impl Worker {
    async fn handle(&self, announcement: Announcement) {
        let info_hash = announcement.info_hash;
        let peer_key = announcement.peer.to_string();

        if self.blacklist.has(&peer_key) {
            return;
        }

        let meta = match fetch_metadata(announcement.peer, info_hash, self.fetch_timeout).await {
            Ok(meta) => meta,
            Err(err) => {
                debug!(%err, peer = %peer_key, %info_hash, "metadata fetch failed");
                self.blacklist.add(&peer_key);
                return;
            }
        };

        let torrent = match Torrent::from_info_bytes(&meta, info_hash) {
            Ok(torrent) => torrent,
            Err(err) => {
                debug!(%err, %info_hash, "metadata did not parse");
                return;
            }
        };

        match self.store.exists(&info_hash.to_hex()) {
            Ok(true) => {
                debug!(%info_hash, "duplicate infohash");
                return;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(%err, %info_hash, "existence check failed");
                return;
            }
        }

        if let Err(err) = self.store.insert(&torrent) {
            warn!(%err, %info_hash, "insert failed");
            return;
        }

        if let Some(dir) = &self.archive_dir {
            let path = dir.join(format!("{}.torrent", torrent.sanitized_name()));
            if let Err(err) = tokio::fs::write(&path, torrent_file_bytes(&meta)).await {
                warn!(%err, path = %path.display(), "failed to archive torrent");
            }
        }

        info!(
            magnet = %info_hash.magnet(),
            name = %torrent.name,
            size = torrent.total_length,
            files = torrent.files_count(),
            "torrent recovered"
        );
    }
}
