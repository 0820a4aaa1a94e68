//! Bounded announcement queue.
//!
//! The DHT node produces [`Announcement`]s faster than the metadata
//! workers can possibly drain them, so the queue between the two is a
//! fixed-capacity FIFO with an explicit overflow policy: a full queue
//! drops the new announcement rather than stalling the UDP receive loop.
//! The network replays popular announces constantly, so dropped items are
//! cheap; a blocked socket reader is not.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;
use tokio::sync::Notify;

use crate::metainfo::InfoHash;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 25_000;

/// An observed announce: a torrent identity plus the address claiming to
/// serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Infohash extracted from the query.
    pub info_hash: InfoHash,
    /// TCP address of the announcing peer.
    pub peer: SocketAddr,
}

impl Announcement {
    pub fn new(info_hash: InfoHash, peer: SocketAddr) -> Self {
        Self { info_hash, peer }
    }
}

/// Bounded single-producer/multi-consumer queue of announcements.
///
/// `push` never blocks and never allocates past capacity; `pop` is
/// non-blocking; [`AnnounceQueue::ready`] parks until an item has been
/// pushed. The readiness signal is edge-triggered and coalesced: several
/// pushes may wake a waiter once, which is fine because consumers drain
/// in a loop until `pop` returns `None`.
pub struct AnnounceQueue {
    items: ArrayQueue<Announcement>,
    ready: Notify,
    dropped: AtomicU64,
}

impl AnnounceQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: ArrayQueue::new(capacity),
            ready: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueues an announcement, dropping it if the queue is full.
    ///
    /// Returns `false` on drop.
    pub fn push(&self, announcement: Announcement) -> bool {
        match self.items.push(announcement) {
            Ok(()) => {
                self.ready.notify_one();
                true
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Dequeues the next announcement, if any.
    pub fn pop(&self) -> Option<Announcement> {
        self.items.pop()
    }

    /// Waits until an announcement has been pushed.
    ///
    /// A push that happened while nobody was waiting is remembered, so a
    /// consumer never misses the wakeup for an item already in the queue.
    pub async fn ready(&self) {
        self.ready.notified().await;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Number of announcements dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn announcement(n: u8) -> Announcement {
        Announcement::new(
            InfoHash([n; 20]),
            format!("127.0.0.1:{}", 6000 + n as u16).parse().unwrap(),
        )
    }

    #[test]
    fn test_push_pop_fifo() {
        let queue = AnnounceQueue::new(4);
        assert!(queue.push(announcement(1)));
        assert!(queue.push(announcement(2)));

        assert_eq!(queue.pop(), Some(announcement(1)));
        assert_eq!(queue.pop(), Some(announcement(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_drops_when_full() {
        let queue = AnnounceQueue::new(2);
        assert!(queue.push(announcement(1)));
        assert!(queue.push(announcement(2)));
        assert!(!queue.push(announcement(3)));
        assert!(!queue.push(announcement(4)));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 2);
    }

    #[tokio::test]
    async fn test_ready_wakes_consumer() {
        let queue = Arc::new(AnnounceQueue::new(4));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue.ready().await;
                queue.pop()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(announcement(7));

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer timed out")
            .expect("consumer panicked");
        assert_eq!(got, Some(announcement(7)));
    }

    #[tokio::test]
    async fn test_push_before_wait_is_not_lost() {
        let queue = AnnounceQueue::new(4);
        queue.push(announcement(1));

        // The permit from the earlier push must satisfy this wait.
        tokio::time::timeout(Duration::from_millis(200), queue.ready())
            .await
            .expect("missed wakeup for queued item");
        assert_eq!(queue.pop(), Some(announcement(1)));
    }
}
