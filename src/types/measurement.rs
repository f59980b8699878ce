//! Measurement records produced by the paginated fetcher and persisted by the cache.

use crate::types::category::Category;
use crate::types::station::string_or_number;
use chrono::NaiveDateTime;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Upstream timestamp layout (`monitordate`), local time of the regional zone.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Name of the timestamp field in upstream records, cache files and plot artifacts.
pub const TIMESTAMP_FIELD: &str = "monitordate";

/// One observation of one category at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub station_id: String,
    pub category: Category,
    pub value: f64,
    /// Local time in the configured regional zone, minute precision.
    pub timestamp: NaiveDateTime,
}

impl MeasurementRecord {
    /// The timestamp rendered the way upstream writes it.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Serializes as `{"siteid": .., "<value_field>": .., "monitordate": ..}`.
impl Serialize for MeasurementRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("siteid", &self.station_id)?;
        map.serialize_entry(self.category.value_field(), &self.value)?;
        map.serialize_entry(TIMESTAMP_FIELD, &self.timestamp_string())?;
        map.end()
    }
}

#[derive(Deserialize)]
struct StoredRecord {
    #[serde(deserialize_with = "string_or_number")]
    siteid: String,
    monitordate: String,
    #[serde(flatten)]
    values: serde_json::Map<String, serde_json::Value>,
}

/// Decodes a JSON array written by [`MeasurementRecord`]'s `Serialize` impl.
///
/// The value field name depends on `category`, so it has to be supplied.
pub(crate) fn decode_records(
    bytes: &[u8],
    category: Category,
) -> Result<Vec<MeasurementRecord>, serde_json::Error> {
    let stored: Vec<StoredRecord> = serde_json::from_slice(bytes)?;
    let field = category.value_field();

    stored
        .into_iter()
        .map(|record| {
            let value = record
                .values
                .get(field)
                .and_then(|v| match v {
                    serde_json::Value::Number(n) => n.as_f64(),
                    serde_json::Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .ok_or_else(|| serde_json::Error::custom(format!("missing numeric field `{field}`")))?;
            let timestamp = NaiveDateTime::parse_from_str(&record.monitordate, TIMESTAMP_FORMAT)
                .map_err(serde_json::Error::custom)?;
            Ok(MeasurementRecord {
                station_id: record.siteid,
                category,
                value,
                timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: Category, value: f64, stamp: &str) -> MeasurementRecord {
        MeasurementRecord {
            station_id: "12".to_string(),
            category,
            value,
            timestamp: NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).unwrap(),
        }
    }

    #[test]
    fn serializes_with_category_field() {
        let json = serde_json::to_value(record(Category::Humidity, 71.0, "2024-01-09 13:00")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"siteid": "12", "humidity": 71.0, "monitordate": "2024-01-09 13:00"})
        );
    }

    #[test]
    fn decodes_string_encoded_values() {
        let bytes = br#"[{"siteid": 12, "temperature": "18.4", "monitordate": "2024-01-09 13:00"}]"#;
        let records = decode_records(bytes, Category::Temperature).unwrap();
        assert_eq!(records, vec![record(Category::Temperature, 18.4, "2024-01-09 13:00")]);
    }

    #[test]
    fn rejects_records_without_the_category_field() {
        let bytes = br#"[{"siteid": "12", "humidity": 70, "monitordate": "2024-01-09 13:00"}]"#;
        assert!(decode_records(bytes, Category::Temperature).is_err());
    }
}
