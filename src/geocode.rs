//! Address → coordinates.

use crate::types::location::LatLon;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

pub const GOOGLE_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response body from {0}")]
    ResponseBody(String, #[source] reqwest::Error),

    #[error("Failed to parse geocoding response for '{address}'")]
    JsonParse {
        address: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Geocoding service refused the request with status {status}")]
    Refused {
        status: String,
        message: Option<String>,
    },
}

/// Resolves a free-form address to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// # Errors
    ///
    /// [`GeocodeError::InvalidAddress`] when the service knows no such address.
    async fn geocode(&self, address: &str) -> Result<LatLon, GeocodeError>;
}

/// [`Geocoder`] backed by the Google Geocoding API.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    http: Client,
    url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GeocodeError::ClientBuild)?;
        Ok(Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: GeoLocation,
}

#[derive(Debug, Deserialize)]
struct GeoLocation {
    lat: f64,
    lng: f64,
}

fn parse_response(address: &str, body: &str) -> Result<LatLon, GeocodeError> {
    let parsed: GeocodeResponse =
        serde_json::from_str(body).map_err(|source| GeocodeError::JsonParse {
            address: address.to_string(),
            source,
        })?;

    if let Some(first) = parsed.results.first() {
        let location = &first.geometry.location;
        return Ok(LatLon(location.lat, location.lng));
    }

    match parsed.status.as_str() {
        "" | "OK" | "ZERO_RESULTS" | "INVALID_REQUEST" => {
            Err(GeocodeError::InvalidAddress(address.to_string()))
        }
        _ => Err(GeocodeError::Refused {
            status: parsed.status,
            message: parsed.error_message,
        }),
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<LatLon, GeocodeError> {
        info!("Geocoding '{}'", address);
        let response = self
            .http
            .get(&self.url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkRequest(self.url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", self.url, e.status());
                return Err(if let Some(status) = e.status() {
                    GeocodeError::HttpStatus {
                        url: self.url.clone(),
                        status,
                        source: e,
                    }
                } else {
                    GeocodeError::NetworkRequest(self.url.clone(), e)
                });
            }
        };

        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::ResponseBody(self.url.clone(), e))?;
        parse_response(address, &body)
    }
}
