// src/lib.rs
//! Plant Scout Library
//!
//! Field-device services for a plant sighting catalog: background marker
//! synchronization from a remote document store, a fixed-cadence poller
//! feeding the marker cache, and serial NMEA GPS fix acquisition.

pub mod config;
pub mod error;
pub mod gps;
pub mod logging;
pub mod model;
pub mod store;
pub mod sync;
pub mod view;

// Re-export main types for convenience
pub use error::{Result, ScoutError};
pub use gps::reader::FixOutcome;
pub use model::{GeoPoint, MarkerEntry, PlantRecord};
pub use sync::{MarkerCache, Poller, SyncService};
