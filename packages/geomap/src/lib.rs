#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Choropleth value bucketing over `GeoJSON` feature collections.
//!
//! Every geomap (allocations, budgets, disbursements, pledges) shades its
//! regions with the same 13-interval linear scale: the range `[0, max]` is
//! split into equal-width intervals and each matched region gets a bucket
//! index from 1 to 12. Regions without data get bucket 0.

pub mod series;

use std::collections::BTreeMap;
use std::path::Path;

use data_explorer_geomap_models::{BucketizedMap, GeoValue, INTERVAL_COUNT, MAX_BUCKET};
use geojson::feature::Id;
use geojson::{Feature, GeoJson, JsonObject};
use thiserror::Error;

/// Errors that can occur while loading `GeoJSON` features.
#[derive(Debug, Error)]
pub enum GeomapError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The text is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// The document is a bare geometry rather than features.
    #[error("GeoJSON document contains no features")]
    NoFeatures,
}

/// Interval boundaries `interval * i` for `i` in `0..=12`.
pub type Intervals = [f64; INTERVAL_COUNT];

/// Assigns a bucket to every feature from `series`.
///
/// Features are matched by id against [`GeoValue::code`]; the first entry
/// for a code wins. Matched features receive the entry's payload as
/// `properties.data`, unmatched ones an empty object.
#[must_use]
pub fn bucketize(series: &[GeoValue], features: Vec<Feature>) -> BucketizedMap {
    bucketize_by(
        series,
        |v| v.code.as_str(),
        |v| v.value,
        |v| v.data.clone(),
        features,
    )
}

/// [`bucketize`] over arbitrary rows, reading the region code, value and
/// payload through accessors.
#[must_use]
pub fn bucketize_by<T>(
    rows: &[T],
    code: impl Fn(&T) -> &str,
    value: impl Fn(&T) -> f64,
    payload: impl Fn(&T) -> JsonObject,
    mut features: Vec<Feature>,
) -> BucketizedMap {
    let max_value = max_value(rows.iter().map(&value));
    let intervals = intervals(max_value);

    let mut by_code: BTreeMap<&str, &T> = BTreeMap::new();
    for row in rows {
        by_code.entry(code(row)).or_insert(row);
    }

    let mut matched = 0_usize;
    for feature in &mut features {
        let row = feature_code(feature).and_then(|c| by_code.get(c.as_str()).copied());
        let (bucket, data) = row.map_or_else(
            || (0, JsonObject::new()),
            |row| {
                matched += 1;
                (bucket_for(value(row), &intervals), payload(row))
            },
        );

        let properties = feature.properties.get_or_insert_with(JsonObject::new);
        properties.insert("value".to_string(), serde_json::Value::from(bucket));
        properties.insert("data".to_string(), serde_json::Value::Object(data));
    }

    log::debug!(
        "Bucketized {} features ({matched} matched) over max value {max_value}",
        features.len()
    );

    BucketizedMap {
        features,
        max_value,
    }
}

/// Largest finite value, or `0` when there is none.
#[must_use]
pub fn max_value(values: impl IntoIterator<Item = f64>) -> f64 {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// Splits `[0, max_value]` into 13 equal-width intervals.
///
/// All boundaries are `0` when `max_value` is not positive.
#[must_use]
pub fn intervals(max_value: f64) -> Intervals {
    let interval = if max_value > 0.0 {
        #[allow(clippy::cast_precision_loss)]
        let count = INTERVAL_COUNT as f64;
        max_value / count
    } else {
        0.0
    };

    let mut out = [0.0; INTERVAL_COUNT];
    let mut step = 0.0;
    for boundary in &mut out {
        *boundary = interval * step;
        step += 1.0;
    }
    out
}

/// Returns the bucket (0 to 12) of a matched value.
///
/// Buckets are checked from 12 down to 1 and the first hit wins, so a
/// value on a shared boundary lands in the higher bucket. Bucket 12 spans
/// everything from `intervals[11]` upward, which keeps the maximum itself
/// in the top bucket. A zero-width scale, a negative value or a non-finite
/// value yields bucket 0.
#[must_use]
pub fn bucket_for(value: f64, intervals: &Intervals) -> u8 {
    if !value.is_finite() || intervals[1] <= 0.0 {
        return 0;
    }

    let top = usize::from(MAX_BUCKET);
    if value >= intervals[top - 1] {
        return MAX_BUCKET;
    }

    (1..top)
        .rev()
        .find(|&b| intervals[b - 1] <= value && value <= intervals[b])
        .and_then(|b| u8::try_from(b).ok())
        .unwrap_or(0)
}

/// The region code of a feature, taken from its id.
#[must_use]
pub fn feature_code(feature: &Feature) -> Option<String> {
    match feature.id.as_ref()? {
        Id::String(s) => Some(s.clone()),
        Id::Number(n) => Some(n.to_string()),
    }
}

/// Parses `GeoJSON` text into its features. A single feature becomes a
/// one-element list.
///
/// # Errors
///
/// Returns [`GeomapError`] if the text is not `GeoJSON` or is a bare
/// geometry.
pub fn parse_feature_collection(text: &str) -> Result<Vec<Feature>, GeomapError> {
    match text.parse::<GeoJson>().map_err(Box::new)? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(GeomapError::NoFeatures),
    }
}

/// Reads and parses a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`GeomapError`] if the file cannot be read or parsed.
pub fn load_feature_collection(path: &Path) -> Result<Vec<Feature>, GeomapError> {
    let text = std::fs::read_to_string(path)?;
    let features = parse_feature_collection(&text)?;
    log::info!("Loaded {} features from {}", features.len(), path.display());
    Ok(features)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feature(id: &str) -> Feature {
        Feature {
            id: Some(Id::String(id.to_string())),
            properties: Some(
                json!({"name": format!("Region {id}")})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            ..Feature::default()
        }
    }

    fn bucket_of(map: &BucketizedMap, id: &str) -> u64 {
        map.features
            .iter()
            .find(|f| feature_code(f).as_deref() == Some(id))
            .and_then(|f| f.property("value"))
            .and_then(serde_json::Value::as_u64)
            .unwrap()
    }

    #[test]
    fn single_value_lands_in_top_bucket() {
        let map = bucketize(&[GeoValue::new("A", 100.0)], vec![feature("A")]);
        assert!((map.max_value - 100.0).abs() < f64::EPSILON);
        assert_eq!(bucket_of(&map, "A"), 12);
    }

    #[test]
    fn unmatched_features_get_bucket_zero_and_empty_data() {
        let map = bucketize(&[GeoValue::new("A", 5.0)], vec![feature("A"), feature("B")]);
        assert_eq!(bucket_of(&map, "B"), 0);
        let b = &map.features[1];
        assert_eq!(b.property("data"), Some(&json!({})));
        assert_eq!(b.property("name"), Some(&json!("Region B")));
    }

    #[test]
    fn matched_features_carry_payload_and_keep_properties() {
        let mut value = GeoValue::new("KEN", 40.0);
        value.data.insert("amount".to_string(), json!(40.0));
        let map = bucketize(&[value], vec![feature("KEN")]);
        let ken = &map.features[0];
        assert_eq!(ken.property("data"), Some(&json!({"amount": 40.0})));
        assert_eq!(ken.property("name"), Some(&json!("Region KEN")));
    }

    #[test]
    fn features_without_properties_gain_them() {
        let bare = Feature {
            id: Some(Id::String("A".to_string())),
            ..Feature::default()
        };
        let map = bucketize(&[GeoValue::new("A", 1.0)], vec![bare]);
        assert_eq!(map.features[0].property("value"), Some(&json!(12)));
    }

    #[test]
    fn equal_nonzero_values_share_a_bucket() {
        let series = [GeoValue::new("A", 7.0), GeoValue::new("B", 7.0), GeoValue::new("C", 7.0)];
        let map = bucketize(&series, vec![feature("A"), feature("B"), feature("C")]);
        for id in ["A", "B", "C"] {
            assert_eq!(bucket_of(&map, id), 12);
        }
    }

    #[test]
    fn all_zero_series_collapses_to_bucket_zero() {
        let series = [GeoValue::new("A", 0.0), GeoValue::new("B", 0.0)];
        let map = bucketize(&series, vec![feature("A"), feature("B")]);
        assert!(map.max_value.abs() < f64::EPSILON);
        assert_eq!(bucket_of(&map, "A"), 0);
        assert_eq!(bucket_of(&map, "B"), 0);
    }

    #[test]
    fn empty_series_has_zero_max() {
        let map = bucketize(&[], vec![feature("A")]);
        assert!(map.max_value.abs() < f64::EPSILON);
        assert_eq!(bucket_of(&map, "A"), 0);
    }

    #[test]
    fn max_value_ignores_non_finite_values() {
        assert!((max_value([3.0, f64::NAN, 9.0, f64::INFINITY]) - 9.0).abs() < f64::EPSILON);
        assert!((max_value([-4.0, -2.0]) + 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn spreads_values_across_buckets() {
        let series: Vec<GeoValue> = (0..=13)
            .map(|i| GeoValue::new(format!("R{i}"), f64::from(i)))
            .collect();
        let features = series.iter().map(|v| feature(&v.code)).collect();
        let map = bucketize(&series, features);
        // interval = 1.0: 0 is in bucket 1, boundaries resolve upward.
        assert_eq!(bucket_of(&map, "R0"), 1);
        assert_eq!(bucket_of(&map, "R1"), 2);
        assert_eq!(bucket_of(&map, "R5"), 6);
        assert_eq!(bucket_of(&map, "R10"), 11);
        assert_eq!(bucket_of(&map, "R11"), 12);
        assert_eq!(bucket_of(&map, "R13"), 12);
    }

    #[test]
    fn interior_values_use_their_interval() {
        let intervals = intervals(130.0);
        assert_eq!(bucket_for(5.0, &intervals), 1);
        assert_eq!(bucket_for(15.0, &intervals), 2);
        assert_eq!(bucket_for(109.0, &intervals), 11);
        assert_eq!(bucket_for(111.0, &intervals), 12);
        assert_eq!(bucket_for(130.0, &intervals), 12);
        assert_eq!(bucket_for(-1.0, &intervals), 0);
        assert_eq!(bucket_for(f64::NAN, &intervals), 0);
    }

    #[test]
    fn first_entry_for_a_code_wins() {
        let series = [GeoValue::new("A", 0.5), GeoValue::new("A", 13.0), GeoValue::new("B", 13.0)];
        let map = bucketize(&series, vec![feature("A")]);
        assert_eq!(bucket_of(&map, "A"), 1);
    }

    #[test]
    fn numeric_feature_ids_match_codes() {
        let numeric = Feature {
            id: Some(Id::Number(serde_json::Number::from(404))),
            ..Feature::default()
        };
        let map = bucketize(&[GeoValue::new("404", 2.0)], vec![numeric]);
        assert_eq!(map.features[0].property("value"), Some(&json!(12)));
    }

    #[test]
    fn bucketize_by_reads_through_accessors() {
        let rows = vec![json!({"iso": "A", "amount": 50}), json!({"iso": "B", "amount": 100})];
        let map = bucketize_by(
            &rows,
            |r| r["iso"].as_str().unwrap_or_default(),
            |r| r["amount"].as_f64().unwrap_or_default(),
            |r| r.as_object().cloned().unwrap_or_default(),
            vec![feature("A"), feature("B")],
        );
        assert_eq!(bucket_of(&map, "A"), 7);
        assert_eq!(bucket_of(&map, "B"), 12);
        assert_eq!(map.features[0].property("data"), Some(&rows[0]));
    }

    #[test]
    fn parses_feature_collections() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":"KEN","properties":{"name":"Kenya"},"geometry":null}
        ]}"#;
        let features = parse_feature_collection(text).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(feature_code(&features[0]).as_deref(), Some("KEN"));
    }

    #[test]
    fn rejects_bare_geometries() {
        let text = r#"{"type":"Point","coordinates":[1.0,2.0]}"#;
        assert!(matches!(
            parse_feature_collection(text),
            Err(GeomapError::NoFeatures)
        ));
    }
}
