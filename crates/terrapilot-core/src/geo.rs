//! Geographic positions read from navigation arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A geographic point in degrees, with an optional height in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            height: None,
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// Read a point from `longitude`/`latitude` (and optional `height`) keys.
    ///
    /// Returns `None` unless both coordinates are present as numbers.
    pub fn from_arguments(arguments: &Map<String, Value>) -> Option<Self> {
        let longitude = arguments.get("longitude").and_then(Value::as_f64)?;
        let latitude = arguments.get("latitude").and_then(Value::as_f64)?;
        let height = arguments.get("height").and_then(Value::as_f64);
        Some(Self {
            longitude,
            latitude,
            height,
        })
    }
}
