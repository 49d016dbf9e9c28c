// src/sync/poller.rs
//! Fixed-cadence drain of the fetch handoff queue

use super::cache::MarkerCache;
use crate::model::MarkerEntry;
use std::sync::{mpsc, Arc};
use tracing::{debug, info};

/// Drains the handoff queue into the marker cache.
///
/// Runs on the event thread under a fixed timer (default 100 ms). Each tick
/// performs at most one non-blocking dequeue; an empty queue is the normal
/// case, not an error. Repainting is left to cache subscribers.
pub struct Poller {
    queue: mpsc::Receiver<Vec<MarkerEntry>>,
    cache: Arc<MarkerCache>,
}

impl Poller {
    pub fn new(queue: mpsc::Receiver<Vec<MarkerEntry>>, cache: Arc<MarkerCache>) -> Self {
        Self { queue, cache }
    }

    /// One poll tick. Returns `true` when a fetch result was delivered to
    /// the cache.
    pub fn tick(&self) -> bool {
        match self.queue.try_recv() {
            Ok(markers) => {
                info!(markers = markers.len(), "marker snapshot delivered");
                self.cache.replace(markers);
                true
            }
            Err(mpsc::TryRecvError::Empty) => false,
            Err(mpsc::TryRecvError::Disconnected) => {
                debug!("handoff queue disconnected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;

    fn marker(name: &str) -> MarkerEntry {
        MarkerEntry::new(name, vec![GeoPoint::new(1.0, 2.0)])
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let (_tx, rx) = mpsc::channel();
        let cache = Arc::new(MarkerCache::new());
        let changes = cache.subscribe();
        let poller = Poller::new(rx, Arc::clone(&cache));

        assert!(!poller.tick());
        assert_eq!(cache.marker_count(), 0);
        assert!(cache.last_updated().is_none());
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_delivery_overwrites_cache() {
        let (tx, rx) = mpsc::channel();
        let cache = Arc::new(MarkerCache::new());
        let poller = Poller::new(rx, Arc::clone(&cache));

        tx.send(vec![marker("Aloe")]).unwrap();
        assert!(poller.tick());
        assert_eq!(cache.snapshot()[0].name, "Aloe");

        tx.send(vec![marker("Neem"), marker("Tulsi")]).unwrap();
        assert!(poller.tick());
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|m| m.name != "Aloe"));
    }

    #[test]
    fn test_one_item_drained_per_tick() {
        let (tx, rx) = mpsc::channel();
        let cache = Arc::new(MarkerCache::new());
        let poller = Poller::new(rx, Arc::clone(&cache));

        tx.send(vec![marker("A")]).unwrap();
        tx.send(vec![marker("B")]).unwrap();

        assert!(poller.tick());
        assert_eq!(cache.snapshot()[0].name, "A");
        assert!(poller.tick());
        assert_eq!(cache.snapshot()[0].name, "B");
        assert!(!poller.tick());
    }

    #[test]
    fn test_disconnected_queue_keeps_cache() {
        let (tx, rx) = mpsc::channel();
        let cache = Arc::new(MarkerCache::new());
        let poller = Poller::new(rx, Arc::clone(&cache));

        tx.send(vec![marker("Aloe")]).unwrap();
        drop(tx);

        assert!(poller.tick());
        // Sender gone: ticks become no-ops, cache keeps the last snapshot
        assert!(!poller.tick());
        assert_eq!(cache.snapshot()[0].name, "Aloe");
    }
}
