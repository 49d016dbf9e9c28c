// src/sync/fetch.rs v2
//! Background marker fetch with single-flight dispatch

use super::cache::MarkerCache;
use super::poller::Poller;
use crate::config::ScoutConfig;
use crate::error::Result;
use crate::model::MarkerEntry;
use crate::store::PlantStore;
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    mpsc, Arc,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Assemble the marker list from the remote store.
///
/// A plant contributes a marker only when it carries a non-empty common name
/// and at least one decodable coordinate; anything else is dropped with a log
/// line. Result order follows store iteration order.
///
/// A top-level listing failure aborts the whole cycle; a failure on one
/// plant's coordinate sub-collection drops that plant only.
pub fn fetch_plant_markers(store: &dyn PlantStore) -> Result<Vec<MarkerEntry>> {
    let plants = store.list_plants()?;

    let mut markers = Vec::new();
    for plant in &plants {
        let name = match plant.common_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                debug!(doc = %plant.id, "plant without common name, skipping");
                continue;
            }
        };

        let coordinates = match store.list_coordinates(&plant.id) {
            Ok(coordinates) => coordinates,
            Err(e) => {
                warn!(plant = name, error = %e, "failed to read coordinates, dropping plant");
                continue;
            }
        };

        if coordinates.is_empty() {
            debug!(plant = name, "plant without coordinates, skipping");
            continue;
        }

        markers.push(MarkerEntry::new(name, coordinates));
    }

    info!(plants = plants.len(), markers = markers.len(), "marker fetch assembled");
    Ok(markers)
}

/// Dispatches marker fetches onto worker threads and hands results to the
/// poller through the handoff queue.
///
/// The service never touches the cache; delivery goes through the queue so
/// the cache is only ever written from the poll side.
pub struct SyncService {
    store: Arc<dyn PlantStore>,
    queue: mpsc::Sender<Vec<MarkerEntry>>,
    in_flight: Arc<AtomicBool>,
    consecutive_failures: Arc<AtomicU32>,
}

impl SyncService {
    /// Build the service together with the poller holding the other end of
    /// the handoff queue.
    pub fn new(store: Arc<dyn PlantStore>, cache: Arc<MarkerCache>) -> (Self, Poller) {
        let (tx, rx) = mpsc::channel();
        let service = Self {
            store,
            queue: tx,
            in_flight: Arc::new(AtomicBool::new(false)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
        };
        (service, Poller::new(rx, cache))
    }

    /// Request a marker refresh on a dedicated worker thread.
    ///
    /// Single-flight: when a fetch is already running the request is a
    /// logged no-op and `false` is returned.
    pub fn request_refresh(&self) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("marker fetch already in flight, skipping");
            return false;
        }

        let store = Arc::clone(&self.store);
        let queue = self.queue.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let failures = Arc::clone(&self.consecutive_failures);

        std::thread::spawn(move || {
            match fetch_plant_markers(&*store) {
                Ok(markers) => {
                    failures.store(0, Ordering::SeqCst);
                    if queue.send(markers).is_err() {
                        warn!("handoff queue closed, dropping fetch result");
                    }
                }
                Err(e) => {
                    let count = failures.fetch_add(1, Ordering::SeqCst) + 1;
                    warn!(error = %e, failures = count, "marker fetch failed");
                }
            }
            in_flight.store(false, Ordering::SeqCst);
        });

        true
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }
}

/// Refresh cadence with exponential failure backoff.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    pub interval: Duration,
    pub backoff_cap: Duration,
}

impl RefreshPolicy {
    pub fn from_config(config: &ScoutConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.refresh_interval_secs),
            backoff_cap: Duration::from_secs(config.refresh_backoff_cap_secs),
        }
    }

    /// Delay before the next cycle: the base interval while healthy, doubled
    /// per consecutive failure up to the cap.
    pub fn next_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let factor = 2u32.saturating_pow(failures.min(6));
        self.interval.saturating_mul(factor).min(self.backoff_cap)
    }
}

/// Drive periodic refreshes until the running flag clears.
///
/// Sleeps in short slices so shutdown stays prompt even during a long
/// backoff window.
pub async fn run_refresh_loop(
    service: Arc<SyncService>,
    policy: RefreshPolicy,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        service.request_refresh();

        let mut remaining = policy.next_delay(service.consecutive_failures());
        while running.load(Ordering::Relaxed) && !remaining.is_zero() {
            let slice = remaining.min(Duration::from_millis(250));
            tokio::time::sleep(slice).await;
            remaining -= slice;
        }
    }
    debug!("refresh loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoutError;
    use crate::model::{GeoPoint, PlantRecord};
    use crate::store::PlantDoc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store stand-in with injectable failures.
    struct FakeStore {
        plants: Vec<PlantDoc>,
        coordinates: HashMap<String, Vec<GeoPoint>>,
        fail_listing: bool,
        fail_coordinates_for: Option<String>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                plants: Vec::new(),
                coordinates: HashMap::new(),
                fail_listing: false,
                fail_coordinates_for: None,
            }
        }

        fn with_plant(mut self, id: &str, name: Option<&str>, coords: Vec<GeoPoint>) -> Self {
            self.plants.push(PlantDoc {
                id: id.to_string(),
                common_name: name.map(|n| n.to_string()),
            });
            self.coordinates.insert(id.to_string(), coords);
            self
        }
    }

    impl PlantStore for FakeStore {
        fn list_plants(&self) -> Result<Vec<PlantDoc>> {
            if self.fail_listing {
                return Err(ScoutError::Connection("store unreachable".to_string()));
            }
            Ok(self.plants.clone())
        }

        fn list_coordinates(&self, plant_id: &str) -> Result<Vec<GeoPoint>> {
            if self.fail_coordinates_for.as_deref() == Some(plant_id) {
                return Err(ScoutError::Store("subcollection read failed".to_string()));
            }
            Ok(self.coordinates.get(plant_id).cloned().unwrap_or_default())
        }

        fn put_plant(&self, _record: &PlantRecord) -> Result<()> {
            unimplemented!("not used by fetch tests")
        }

        fn add_coordinate(&self, _plant_id: &str, _point: GeoPoint) -> Result<()> {
            unimplemented!("not used by fetch tests")
        }

        fn add_image_ref(&self, _plant_id: &str, _url: &str) -> Result<()> {
            unimplemented!("not used by fetch tests")
        }
    }

    #[test]
    fn test_filtering_invariant() {
        let store = FakeStore::new()
            .with_plant("Aloe", Some("Aloe"), vec![GeoPoint::new(10.0, 20.0)])
            .with_plant("Neem", Some("Neem"), Vec::new())
            .with_plant("unnamed", None, vec![GeoPoint::new(1.0, 2.0)])
            .with_plant("blank", Some(""), vec![GeoPoint::new(3.0, 4.0)]);

        let markers = fetch_plant_markers(&store).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "Aloe");
        assert_eq!(markers[0].coordinates, vec![GeoPoint::new(10.0, 20.0)]);
    }

    #[test]
    fn test_order_follows_store_iteration() {
        let store = FakeStore::new()
            .with_plant("Zinnia", Some("Zinnia"), vec![GeoPoint::new(1.0, 1.0)])
            .with_plant("Aloe", Some("Aloe"), vec![GeoPoint::new(2.0, 2.0)]);

        let markers = fetch_plant_markers(&store).unwrap();
        let names: Vec<&str> = markers.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Zinnia", "Aloe"]);
    }

    #[test]
    fn test_listing_failure_aborts_cycle() {
        let mut store = FakeStore::new();
        store.fail_listing = true;
        assert!(fetch_plant_markers(&store).is_err());
    }

    #[test]
    fn test_coordinate_failure_drops_plant_only() {
        let mut store = FakeStore::new()
            .with_plant("Aloe", Some("Aloe"), vec![GeoPoint::new(10.0, 20.0)])
            .with_plant("Tulsi", Some("Tulsi"), vec![GeoPoint::new(5.0, 6.0)]);
        store.fail_coordinates_for = Some("Aloe".to_string());

        let markers = fetch_plant_markers(&store).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "Tulsi");
    }

    #[test]
    fn test_end_to_end_fetch_deliver_poll() {
        let store = Arc::new(
            FakeStore::new()
                .with_plant("Aloe", Some("Aloe"), vec![GeoPoint::new(10.0, 20.0)])
                .with_plant("Neem", Some("Neem"), Vec::new()),
        );
        let cache = Arc::new(MarkerCache::new());
        let (service, poller) = SyncService::new(store, Arc::clone(&cache));

        assert!(service.request_refresh());
        // Wait for the worker to finish, then drain on the "UI" side
        while service.is_in_flight() {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(poller.tick());

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "Aloe");
        assert_eq!(snapshot[0].coordinates, vec![GeoPoint::new(10.0, 20.0)]);
    }

    #[test]
    fn test_failed_fetch_leaves_cache_unchanged() {
        let mut failing = FakeStore::new();
        failing.fail_listing = true;
        let store = Arc::new(failing);
        let cache = Arc::new(MarkerCache::new());
        cache.replace(vec![MarkerEntry::new("Aloe", vec![GeoPoint::new(10.0, 20.0)])]);

        let (service, poller) = SyncService::new(store, Arc::clone(&cache));
        service.request_refresh();
        while service.is_in_flight() {
            std::thread::sleep(Duration::from_millis(5));
        }

        // Nothing enqueued, stale snapshot stays
        assert!(!poller.tick());
        assert_eq!(cache.snapshot()[0].name, "Aloe");
        assert_eq!(service.consecutive_failures(), 1);
    }

    /// Store whose listing blocks until the test releases it.
    struct GatedStore {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl PlantStore for GatedStore {
        fn list_plants(&self) -> Result<Vec<PlantDoc>> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(Vec::new())
        }

        fn list_coordinates(&self, _plant_id: &str) -> Result<Vec<GeoPoint>> {
            Ok(Vec::new())
        }

        fn put_plant(&self, _record: &PlantRecord) -> Result<()> {
            unimplemented!()
        }

        fn add_coordinate(&self, _plant_id: &str, _point: GeoPoint) -> Result<()> {
            unimplemented!()
        }

        fn add_image_ref(&self, _plant_id: &str, _url: &str) -> Result<()> {
            unimplemented!()
        }
    }

    #[test]
    fn test_single_flight() {
        let (release, gate) = mpsc::channel();
        let store = Arc::new(GatedStore {
            gate: Mutex::new(gate),
        });
        let cache = Arc::new(MarkerCache::new());
        let (service, _poller) = SyncService::new(store, cache);

        assert!(service.request_refresh());
        // Worker is parked inside list_plants; a second request must not spawn
        assert!(!service.request_refresh());

        release.send(()).unwrap();
        for _ in 0..200 {
            if !service.is_in_flight() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!service.is_in_flight());
        assert!(service.request_refresh());
        release.send(()).unwrap();
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RefreshPolicy {
            interval: Duration::from_secs(300),
            backoff_cap: Duration::from_secs(3600),
        };
        assert_eq!(policy.next_delay(0), Duration::from_secs(300));
        assert_eq!(policy.next_delay(1), Duration::from_secs(600));
        assert_eq!(policy.next_delay(2), Duration::from_secs(1200));
        assert_eq!(policy.next_delay(3), Duration::from_secs(2400));
        // Capped from here on
        assert_eq!(policy.next_delay(4), Duration::from_secs(3600));
        assert_eq!(policy.next_delay(30), Duration::from_secs(3600));
    }
}
