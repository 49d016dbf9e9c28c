// src/store/mod.rs
//! Remote document store access

pub mod firestore;

use crate::error::Result;
use crate::model::{GeoPoint, PlantRecord};

pub use firestore::FirestoreClient;

/// A top-level plant document as listed from the store.
///
/// `id` is the document key used to address nested sub-collections; the
/// common name may be absent or empty on malformed documents, in which case
/// the fetch layer drops the plant.
#[derive(Debug, Clone)]
pub struct PlantDoc {
    pub id: String,
    pub common_name: Option<String>,
}

/// Read/write operations against the remote plant catalog.
///
/// Read methods are called from the fetch worker thread; implementations
/// block on network I/O. Write methods serve the catalog flow.
pub trait PlantStore: Send + Sync {
    /// List all top-level plant documents in store iteration order.
    fn list_plants(&self) -> Result<Vec<PlantDoc>>;

    /// List the geo-points in a plant's coordinate sub-collection.
    fn list_coordinates(&self, plant_id: &str) -> Result<Vec<GeoPoint>>;

    /// Create or overwrite a plant document keyed by its common name.
    fn put_plant(&self, record: &PlantRecord) -> Result<()>;

    /// Append one coordinate sub-document to a plant.
    fn add_coordinate(&self, plant_id: &str, point: GeoPoint) -> Result<()>;

    /// Append one image-reference sub-document to a plant.
    fn add_image_ref(&self, plant_id: &str, url: &str) -> Result<()>;
}
