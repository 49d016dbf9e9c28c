// src/store/firestore.rs
//! Firestore REST client for the plant catalog

use super::{PlantDoc, PlantStore};
use crate::config::StoreConfig;
use crate::error::{Result, ScoutError};
use crate::model::{GeoPoint, PlantRecord};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl Document {
    /// The last path segment of the full resource name is the document id.
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn string_field(&self, field: &str) -> Option<String> {
        self.fields
            .get(field)?
            .get("stringValue")?
            .as_str()
            .map(|s| s.to_string())
    }

    fn geo_point_field(&self, field: &str) -> Option<GeoPoint> {
        let value = self.fields.get(field)?.get("geoPointValue")?;
        let latitude = value.get("latitude").and_then(|v| v.as_f64())?;
        let longitude = value.get("longitude").and_then(|v| v.as_f64())?;
        Some(GeoPoint::new(latitude, longitude))
    }
}

/// Blocking client for the Firestore v1 document API.
///
/// Runs on the fetch worker thread and in the catalog CLI path; never on the
/// event loop.
pub struct FirestoreClient {
    client: reqwest::blocking::Client,
    base_url: String,
    project_id: String,
    collection: String,
    auth_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("PlantScout/0.1 (Rust field catalog client)")
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| ScoutError::Other(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            collection: config.collection.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let mut request = self.client.get(url);
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| ScoutError::Connection(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ScoutError::Store(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        Ok(response)
    }

    fn send_json(&self, request: reqwest::blocking::RequestBuilder, url: &str) -> Result<()> {
        let mut request = request;
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| ScoutError::Connection(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ScoutError::Store(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        Ok(())
    }

    /// Fetch one collection, following page tokens until exhausted.
    fn list_collection(&self, path: &str) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/{}?pageSize=300", self.documents_url(), path);
            if let Some(ref token) = page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }

            let page: DocumentList = self.get(&url)?.json().map_err(|e| {
                ScoutError::Store(format!("Malformed document list from {}: {}", path, e))
            })?;

            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }
}

impl PlantStore for FirestoreClient {
    fn list_plants(&self) -> Result<Vec<PlantDoc>> {
        let documents = self.list_collection(&self.collection)?;

        let plants = documents
            .iter()
            .map(|doc| PlantDoc {
                id: doc.id().to_string(),
                common_name: doc.string_field("Common Name"),
            })
            .collect();

        Ok(plants)
    }

    fn list_coordinates(&self, plant_id: &str) -> Result<Vec<GeoPoint>> {
        let path = format!("{}/{}/coordinates", self.collection, plant_id);
        let documents = self.list_collection(&path)?;

        let mut points = Vec::new();
        for doc in &documents {
            match doc.geo_point_field("location") {
                Some(point) => points.push(point),
                None => {
                    // Missing or mistyped location field: drop this sub-document only
                    warn!(plant = plant_id, doc = doc.id(), "coordinate document without geo-point, skipping");
                }
            }
        }

        debug!(plant = plant_id, count = points.len(), "listed coordinates");
        Ok(points)
    }

    fn put_plant(&self, record: &PlantRecord) -> Result<()> {
        if record.common_name.is_empty() {
            return Err(ScoutError::Store(
                "Plant record needs a non-empty common name".to_string(),
            ));
        }

        let mut fields = json!({
            "Common Name": { "stringValue": record.common_name }
        });
        if let Some(ref description) = record.description {
            fields["Description"] = json!({ "stringValue": description });
        }
        if let Some(ref family) = record.family {
            fields["Family"] = json!({ "stringValue": family });
        }
        if let Some(ref scientific) = record.scientific_name {
            fields["Scientific Name"] = json!({ "stringValue": scientific });
        }

        let url = format!(
            "{}/{}/{}",
            self.documents_url(),
            self.collection,
            record.common_name
        );
        let request = self.client.patch(&url).json(&json!({ "fields": fields }));
        self.send_json(request, &url)
    }

    fn add_coordinate(&self, plant_id: &str, point: GeoPoint) -> Result<()> {
        let url = format!(
            "{}/{}/{}/coordinates",
            self.documents_url(),
            self.collection,
            plant_id
        );
        let body = json!({
            "fields": {
                "location": {
                    "geoPointValue": {
                        "latitude": point.latitude,
                        "longitude": point.longitude
                    }
                },
                "observed_at": { "timestampValue": Utc::now().to_rfc3339() }
            }
        });

        let request = self.client.post(&url).json(&body);
        self.send_json(request, &url)
    }

    fn add_image_ref(&self, plant_id: &str, url_value: &str) -> Result<()> {
        let url = format!(
            "{}/{}/{}/images",
            self.documents_url(),
            self.collection,
            plant_id
        );
        let body = json!({
            "fields": {
                "url": { "stringValue": url_value }
            }
        });

        let request = self.client.post(&url).json(&body);
        self.send_json(request, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_doc(raw: &str) -> Document {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_document_id() {
        let doc = parse_doc(
            r#"{"name":"projects/p/databases/(default)/documents/plant_details/Aloe","fields":{}}"#,
        );
        assert_eq!(doc.id(), "Aloe");
    }

    #[test]
    fn test_string_field() {
        let doc = parse_doc(
            r#"{"name":"x/Aloe","fields":{"Common Name":{"stringValue":"Aloe"}}}"#,
        );
        assert_eq!(doc.string_field("Common Name"), Some("Aloe".to_string()));
        assert_eq!(doc.string_field("Family"), None);
    }

    #[test]
    fn test_string_field_wrong_kind() {
        let doc = parse_doc(
            r#"{"name":"x/Aloe","fields":{"Common Name":{"integerValue":"7"}}}"#,
        );
        assert_eq!(doc.string_field("Common Name"), None);
    }

    #[test]
    fn test_geo_point_field() {
        let doc = parse_doc(
            r#"{"name":"x/c1","fields":{"location":{"geoPointValue":{"latitude":10.5,"longitude":-20.25}}}}"#,
        );
        let point = doc.geo_point_field("location").unwrap();
        assert_eq!(point.latitude, 10.5);
        assert_eq!(point.longitude, -20.25);
    }

    #[test]
    fn test_geo_point_field_missing_axis() {
        let doc = parse_doc(
            r#"{"name":"x/c1","fields":{"location":{"geoPointValue":{"latitude":10.5}}}}"#,
        );
        assert!(doc.geo_point_field("location").is_none());
    }

    #[test]
    fn test_document_list_parsing() {
        let raw = r#"{
            "documents": [
                {"name":"x/Aloe","fields":{"Common Name":{"stringValue":"Aloe"}}},
                {"name":"x/Neem"}
            ],
            "nextPageToken": "abc"
        }"#;
        let list: DocumentList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.documents.len(), 2);
        assert_eq!(list.next_page_token, Some("abc".to_string()));
        assert!(list.documents[1].fields.is_empty());
    }

    #[test]
    fn test_empty_document_list() {
        let list: DocumentList = serde_json::from_str("{}").unwrap();
        assert!(list.documents.is_empty());
        assert!(list.next_page_token.is_none());
    }
}
