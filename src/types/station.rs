//! Defines the data structure representing an air-quality monitoring station as
//! delivered by the environmental API's station list.

use crate::stations::error::LocateStationError;
use crate::types::location::LatLon;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single air-quality monitoring station.
///
/// Field names follow the upstream JSON. Coordinates are kept exactly as the
/// upstream encodes them (decimal degrees in a string); use [`Station::location`]
/// to get them as numbers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// The station identifier (e.g. `"12"`). Upstream sends either a string or a number.
    #[serde(rename = "siteid", deserialize_with = "string_or_number")]
    pub id: String,
    /// Human-readable station name.
    #[serde(rename = "sitename", default)]
    pub name: String,
    /// County the station is located in.
    #[serde(default)]
    pub county: String,
    /// Township the station is located in.
    #[serde(default)]
    pub township: String,
    /// Air-quality area the station reports for.
    #[serde(rename = "areaname", default)]
    pub area_name: String,
    /// Latitude in decimal degrees, string-encoded.
    #[serde(rename = "twd97lat", deserialize_with = "string_or_number")]
    pub latitude: String,
    /// Longitude in decimal degrees, string-encoded.
    #[serde(rename = "twd97lon", deserialize_with = "string_or_number")]
    pub longitude: String,
}

impl Station {
    /// Parses the string-encoded coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`LocateStationError::InvalidCoordinates`] if either coordinate is not a number.
    pub fn location(&self) -> Result<LatLon, LocateStationError> {
        let parse = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| LocateStationError::InvalidCoordinates {
                    station: self.id.clone(),
                    value: value.to_string(),
                })
        };
        Ok(LatLon(parse(&self.latitude)?, parse(&self.longitude)?))
    }
}

/// Accepts a JSON string or number and yields it as a `String`. `null` becomes empty.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl Visitor<'_> for StringOrNumber {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
