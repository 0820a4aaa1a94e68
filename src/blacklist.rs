//! Time-windowed set of misbehaving peer addresses.
//!
//! Every failed metadata exchange lands the peer here for a few minutes,
//! so the workers stop burning connection slots on addresses that just
//! refused, timed out, or served garbage. Entries expire lazily and the
//! set is bounded: at capacity the oldest entry is evicted.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default expiry window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
/// Default maximum number of tracked addresses.
pub const DEFAULT_CAPACITY: usize = 50_000;

struct Inner {
    // `order` mirrors `expires` exactly; entries are only ever removed
    // from both at once, and expiry order equals insertion order because
    // the TTL is constant and re-adds don't refresh.
    expires: HashMap<String, Instant>,
    order: VecDeque<String>,
}

/// Bounded blacklist keyed by `ip:port` text.
pub struct Blacklist {
    inner: Mutex<Inner>,
    ttl: Duration,
    capacity: usize,
}

impl Blacklist {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                expires: HashMap::new(),
                order: VecDeque::new(),
            }),
            ttl,
            capacity,
        }
    }

    /// Adds an address for the configured window.
    ///
    /// Re-adding an existing address does not extend its expiry. At
    /// capacity the oldest live entry is evicted first.
    pub fn add(&self, addr: &str) {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        Self::purge_expired(&mut inner, now);

        if inner.expires.contains_key(addr) {
            return;
        }

        if inner.expires.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.expires.remove(&oldest);
            }
        }

        inner.expires.insert(addr.to_string(), now + self.ttl);
        inner.order.push_back(addr.to_string());
    }

    /// Returns `true` if the address is present and not yet expired.
    pub fn has(&self, addr: &str) -> bool {
        let now = Instant::now();
        let inner = self.inner.lock();
        match inner.expires.get(addr) {
            Some(expires_at) => *expires_at > now,
            None => false,
        }
    }

    /// Number of tracked addresses, including ones awaiting lazy purge.
    pub fn len(&self) -> usize {
        self.inner.lock().expires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expires.is_empty()
    }

    fn purge_expired(inner: &mut Inner, now: Instant) {
        loop {
            let expired = match inner.order.front() {
                Some(front) => inner
                    .expires
                    .get(front)
                    .is_none_or(|expires_at| *expires_at <= now),
                None => break,
            };

            if !expired {
                break;
            }

            if let Some(addr) = inner.order.pop_front() {
                inner.expires.remove(&addr);
            }
        }
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}
