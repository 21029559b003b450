#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Choropleth series and bucketized map types.
//!
//! Geomap endpoints reduce provider rows to one [`GeoValue`] per region and
//! return a [`BucketizedMap`] whose features carry the bucket index the
//! frontend uses to pick one of the legend swatches.

use geojson::{Feature, JsonObject};
use serde::{Deserialize, Serialize};

/// Number of equal-width intervals the value range is divided into.
pub const INTERVAL_COUNT: usize = 13;

/// Highest bucket index. Bucket `0` means "no data".
pub const MAX_BUCKET: u8 = 12;

/// One region's aggregated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoValue {
    /// Region code matched against the feature id (usually ISO3).
    pub code: String,
    /// Aggregated value for the region.
    pub value: f64,
    /// Payload attached to the matched feature as `properties.data`.
    #[serde(default)]
    pub data: JsonObject,
}

impl GeoValue {
    /// Creates a value with an empty payload.
    #[must_use]
    pub fn new(code: impl Into<String>, value: f64) -> Self {
        Self {
            code: code.into(),
            value,
            data: JsonObject::new(),
        }
    }
}

/// Features annotated with bucket indices, plus the top of the value range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketizedMap {
    /// Input features with `properties.value` (bucket) and
    /// `properties.data` (payload) set.
    pub features: Vec<Feature>,
    /// Largest value in the series, or `0` for an empty series.
    pub max_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_max_value_in_camel_case() {
        let map = BucketizedMap {
            features: Vec::new(),
            max_value: 12.5,
        };
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            serde_json::json!({"features": [], "maxValue": 12.5})
        );
    }

    #[test]
    fn geo_value_payload_defaults_to_empty() {
        let value: GeoValue =
            serde_json::from_value(serde_json::json!({"code": "KEN", "value": 3.0})).unwrap();
        assert_eq!(value, GeoValue::new("KEN", 3.0));
    }
}
