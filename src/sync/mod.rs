// src/sync/mod.rs
//! Background marker synchronization: fetch, handoff, poll, cache

pub mod cache;
pub mod fetch;
pub mod poller;

pub use cache::MarkerCache;
pub use fetch::{fetch_plant_markers, RefreshPolicy, SyncService};
pub use poller::Poller;
