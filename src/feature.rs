use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::geo::Coordinate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type", default = "point_type")]
    pub geometry_type: String,
    /// `[lon, lat]`, see [`Coordinate::from_position`].
    pub coordinates: Vec<f64>,
}

fn point_type() -> String {
    String::from("Point")
}

fn feature_type() -> String {
    String::from("Feature")
}

/// GeoJSON allows `"properties": null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A point feature with open-ended properties. Members we don't model are kept as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub feature_type: String,
    pub geometry: Geometry,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn point(at: Coordinate, properties: Map<String, Value>) -> Self {
        Self {
            feature_type: feature_type(),
            geometry: Geometry {
                geometry_type: point_type(),
                coordinates: at.to_position().to_vec(),
            },
            properties,
            extra: Map::new(),
        }
    }

    /// None when the geometry carries fewer than two numbers.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self.geometry.coordinates.as_slice() {
            [lon, lat, ..] => Some(Coordinate::from_position([*lon, *lat])),
            _ => None,
        }
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Body of the backend's `/nearby` answer.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NearbyResponse {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub features: Vec<Feature>,
}
