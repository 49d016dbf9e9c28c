// src/sync/cache.rs
//! Process-wide marker cache with change notification

use crate::model::MarkerEntry;
use chrono::{DateTime, Utc};
use std::sync::{mpsc, Mutex, RwLock};
use tracing::debug;

/// The most recently delivered marker snapshot.
///
/// Owned by the application root and shared by `Arc`; written only by the
/// [`Poller`](crate::sync::Poller), read by views. Every delivery overwrites
/// the previous snapshot wholesale — there is no merging and no expiry.
///
/// Views subscribe for change notifications instead of being repainted by
/// the poll loop directly.
pub struct MarkerCache {
    entries: RwLock<Vec<MarkerEntry>>,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    subscribers: Mutex<Vec<mpsc::Sender<()>>>,
}

impl MarkerCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            last_updated: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Overwrite the cached snapshot in full and notify subscribers.
    pub fn replace(&self, entries: Vec<MarkerEntry>) {
        {
            let mut guard = self.entries.write().unwrap();
            *guard = entries;
        }
        {
            let mut updated = self.last_updated.write().unwrap();
            *updated = Some(Utc::now());
        }
        self.notify();
    }

    /// Clone the current snapshot.
    pub fn snapshot(&self) -> Vec<MarkerEntry> {
        self.entries.read().unwrap().clone()
    }

    /// Number of markers in the current snapshot.
    pub fn marker_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// When the snapshot was last overwritten, if ever.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.read().unwrap()
    }

    /// Register a change listener. The returned receiver gets one unit
    /// message per snapshot overwrite; dropped receivers are pruned on the
    /// next notification.
    pub fn subscribe(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    fn notify(&self) {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(()).is_ok());
        if subscribers.len() < before {
            debug!(
                dropped = before - subscribers.len(),
                "pruned disconnected cache subscribers"
            );
        }
    }
}

impl Default for MarkerCache {
    fn default() -> Self {
        Self::new()
    }
}
