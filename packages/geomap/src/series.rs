//! Reducing provider rows to a [`GeoValue`] series.
//!
//! OData aggregation responses come back as one JSON object per group.
//! These helpers pick the region code and value out of each row (values
//! may be JSON numbers or numeric strings) and keep the whole row as the
//! payload shown in the map tooltip.

use std::collections::BTreeMap;

use data_explorer_geomap_models::GeoValue;
use geojson::JsonObject;
use serde_json::Value;

/// Reads a dot-separated path (`"geographicArea.code"`) from a JSON row.
#[must_use]
pub fn field<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |current, key| current.get(key))
}

/// Reads a numeric field, accepting numbers and numeric strings.
#[must_use]
pub fn number(row: &Value, path: &str) -> Option<f64> {
    match field(row, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Builds a series from rows, skipping rows without a string code.
///
/// Rows with a code but no readable value count as `0`. Rows sharing a code
/// are summed; the first row is kept as payload with its value field
/// replaced by the sum, so the tooltip matches the shaded value.
#[must_use]
pub fn from_rows(rows: &[Value], code_path: &str, value_path: &str) -> Vec<GeoValue> {
    let mut series: Vec<GeoValue> = Vec::new();
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();

    for row in rows {
        let Some(code) = field(row, code_path).and_then(Value::as_str) else {
            continue;
        };
        let value = number(row, value_path).unwrap_or_default();

        if let Some(&i) = index.get(code) {
            let existing = &mut series[i];
            existing.value += value;
            set_number(&mut existing.data, value_path, existing.value);
        } else {
            index.insert(code, series.len());
            series.push(GeoValue {
                code: code.to_string(),
                value,
                data: row.as_object().cloned().unwrap_or_default(),
            });
        }
    }

    log::debug!("Reduced {} rows to {} regions", rows.len(), series.len());
    series
}

/// Writes `value` at a dot-separated path, creating intermediate objects.
/// Leaves `object` untouched if the path runs through a non-object value.
fn set_number(object: &mut JsonObject, path: &str, value: f64) {
    let (parents, last) = match path.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };

    let mut current = object;
    for key in parents.into_iter().flat_map(|p| p.split('.')) {
        let Value::Object(next) = current
            .entry(key)
            .or_insert_with(|| Value::Object(JsonObject::new()))
        else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), Value::from(value));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_nested_fields() {
        let row = json!({"geographicArea": {"code": "KEN"}, "value": "12.5"});
        assert_eq!(field(&row, "geographicArea.code"), Some(&json!("KEN")));
        assert_eq!(number(&row, "value"), Some(12.5));
        assert_eq!(field(&row, "geographicArea.name"), None);
        assert_eq!(number(&row, "geographicArea"), None);
    }

    #[test]
    fn sums_duplicate_codes_and_skips_codeless_rows() {
        let rows = vec![
            json!({"iso": "KEN", "value": 10}),
            json!({"iso": "UGA", "value": 4}),
            json!({"iso": "KEN", "value": 5}),
            json!({"value": 100}),
            json!({"iso": "TZA"}),
        ];
        let series = from_rows(&rows, "iso", "value");
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].code, "KEN");
        assert!((series[0].value - 15.0).abs() < f64::EPSILON);
        assert_eq!(series[0].data.get("value"), Some(&json!(15.0)));
        assert_eq!(series[1].data.get("value"), Some(&json!(4)));
        assert!(series[2].value.abs() < f64::EPSILON);
    }

    #[test]
    fn summed_value_is_written_to_nested_payload_field() {
        let rows = vec![
            json!({"iso": "KEN", "totals": {"amount": "2.5", "currency": "USD"}}),
            json!({"iso": "KEN", "totals": {"amount": 1.5}}),
        ];
        let series = from_rows(&rows, "iso", "totals.amount");
        assert_eq!(series.len(), 1);
        assert!((series[0].value - 4.0).abs() < f64::EPSILON);
        assert_eq!(
            Value::Object(series[0].data.clone()),
            json!({"iso": "KEN", "totals": {"amount": 4.0, "currency": "USD"}})
        );
    }
}
