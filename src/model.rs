// src/model.rs
//! Core data types shared between the store, sync, and GPS layers

use serde::{Deserialize, Serialize};

/// A single (latitude, longitude) pair as stored in the remote document store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// A zero-valued pair is what an unlocked receiver reports; the RMC
    /// parser treats it as no fix.
    pub fn is_zero(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// A catalogued plant as written to the remote document store.
///
/// The common name doubles as the remote document key, so it must be
/// non-empty; the remaining fields are free-form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantRecord {
    pub common_name: String,
    pub description: Option<String>,
    pub family: Option<String>,
    pub scientific_name: Option<String>,
}

impl PlantRecord {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            description: None,
            family: None,
            scientific_name: None,
        }
    }
}

/// A named plant sighting with one or more coordinates, rendered as map pins.
///
/// Built fresh on every fetch cycle and never mutated afterwards; ownership
/// passes from the fetch worker to the cache through the handoff queue.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    pub name: String,
    pub coordinates: Vec<GeoPoint>,
}

impl MarkerEntry {
    pub fn new(name: impl Into<String>, coordinates: Vec<GeoPoint>) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }
}
