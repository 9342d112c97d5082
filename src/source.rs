use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::SourceError;
use crate::feature::{Feature, FeatureCollection, NearbyResponse};
use crate::filter::filter_by_radius;
use crate::geo::Coordinate;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Where candidate features come from.
pub trait FeatureSource: Send + Sync {
    fn nearby(&self, center: Coordinate, radius_m: f64) -> Result<Vec<Feature>, SourceError>;
}

/// Shell policy: a failed fetch shows up as zero features.
pub fn fetch_or_empty<S: FeatureSource + ?Sized>(
    source: &S,
    center: Coordinate,
    radius_m: f64,
) -> Vec<Feature> {
    match source.nearby(center, radius_m) {
        Ok(features) => features,
        Err(e) => {
            log::error!("Failed to load parking data: {}", e);
            Vec::new()
        }
    }
}

/// The `/nearby` endpoint, which filters server-side.
pub struct BackendSource {
    base_url: String,
    client: Client,
}

impl BackendSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| SourceError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, client })
    }

    pub fn nearby_url(&self, center: Coordinate, radius_m: f64) -> String {
        format!(
            "{}/nearby?lat={}&lon={}&radius={}",
            self.base_url, center.lat, center.lon, radius_m
        )
    }
}

impl FeatureSource for BackendSource {
    fn nearby(&self, center: Coordinate, radius_m: f64) -> Result<Vec<Feature>, SourceError> {
        let url = self.nearby_url(center, radius_m);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;
        decode_nearby(&body)
    }
}

pub fn decode_nearby(body: &str) -> Result<Vec<Feature>, SourceError> {
    let response: NearbyResponse = serde_json::from_str(body)?;
    if let Some(count) = response.count {
        if count != response.features.len() {
            log::warn!(
                "backend reported {} features but sent {}",
                count,
                response.features.len()
            );
        }
    }
    Ok(response.features)
}

/// A GeoJSON FeatureCollection on disk, filtered locally.
pub struct FileSource {
    features: Vec<Feature>,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let raw = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        let collection: FeatureCollection = serde_json::from_str(&raw)?;
        log::info!(
            "Loaded {} features from {}",
            collection.features.len(),
            path.display()
        );
        Ok(Self::from_features(collection.features))
    }

    pub fn from_features(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

impl FeatureSource for FileSource {
    fn nearby(&self, center: Coordinate, radius_m: f64) -> Result<Vec<Feature>, SourceError> {
        Ok(filter_by_radius(Some(self.features.as_slice()), Some(center), radius_m)
            .into_iter()
            .cloned()
            .collect())
    }
}
