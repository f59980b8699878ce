//! In-memory stand-ins for the upstream services, used by unit tests.

use crate::fetching::client::EnvironmentApi;
use crate::fetching::error::FetchError;
use crate::fetching::raw::RawRecord;
use crate::geocode::{GeocodeError, Geocoder};
use crate::plot::{PlotError, PlotSink};
use crate::types::location::LatLon;
use crate::types::measurement::MeasurementRecord;
use crate::types::station::Station;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

type PageFn = Box<dyn Fn(usize, usize) -> Vec<RawRecord> + Send + Sync>;

pub(crate) fn raw(siteid: &str, label: &str, value: &str, stamp: &str) -> RawRecord {
    RawRecord {
        siteid: siteid.to_string(),
        itemengname: label.to_string(),
        concentration: value.to_string(),
        monitordate: stamp.to_string(),
        county: "臺北市".to_string(),
        sitename: format!("站{siteid}"),
    }
}

pub(crate) fn station(id: &str, lat: f64, lon: f64) -> Station {
    Station {
        id: id.to_string(),
        name: format!("站{id}"),
        county: "臺北市".to_string(),
        township: "中正區".to_string(),
        area_name: "北部空品區".to_string(),
        latitude: lat.to_string(),
        longitude: lon.to_string(),
    }
}

/// Serves pages from per-endpoint generators and records every request.
#[derive(Default)]
pub(crate) struct FakeApi {
    feeds: HashMap<String, PageFn>,
    failing: HashSet<String>,
    stations: Vec<Station>,
    requests: Mutex<Vec<(String, usize)>>,
}

impl fmt::Debug for FakeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeApi")
            .field("feeds", &self.feeds.keys().collect::<Vec<_>>())
            .field("stations", &self.stations.len())
            .finish()
    }
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pages for `endpoint` come from `feed(offset, limit)`.
    pub(crate) fn with_feed(
        mut self,
        endpoint: &str,
        feed: impl Fn(usize, usize) -> Vec<RawRecord> + Send + Sync + 'static,
    ) -> Self {
        self.feeds.insert(endpoint.to_string(), Box::new(feed));
        self
    }

    /// Page `n` (offset `n * limit`) is `pages[n]`; past the end pages are empty.
    pub(crate) fn with_pages(self, endpoint: &str, pages: Vec<Vec<RawRecord>>) -> Self {
        self.with_feed(endpoint, move |offset, limit| {
            pages.get(offset / limit.max(1)).cloned().unwrap_or_default()
        })
    }

    pub(crate) fn with_stations(mut self, stations: Vec<Station>) -> Self {
        self.stations = stations;
        self
    }

    /// Requests to `endpoint` fail as if upstream sent garbage.
    pub(crate) fn failing(mut self, endpoint: &str) -> Self {
        self.failing.insert(endpoint.to_string());
        self
    }

    /// Offsets requested from `endpoint`, in order.
    pub(crate) fn offsets(&self, endpoint: &str) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, offset)| *offset)
            .collect()
    }

    /// Number of complete runs against `endpoint`, counted by requests at offset 0.
    pub(crate) fn runs(&self, endpoint: &str) -> usize {
        self.offsets(endpoint).iter().filter(|o| **o == 0).count()
    }
}

fn garbage_error(url: &str) -> FetchError {
    FetchError::JsonParse {
        url: url.to_string(),
        source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
    }
}

#[async_trait]
impl EnvironmentApi for FakeApi {
    async fn fetch_page(
        &self,
        endpoint: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), offset));
        if self.failing.contains(endpoint) {
            return Err(garbage_error(endpoint));
        }
        Ok(self
            .feeds
            .get(endpoint)
            .map(|feed| feed(offset, limit))
            .unwrap_or_default())
    }

    async fn fetch_stations(&self) -> Result<Vec<Station>, FetchError> {
        if self.failing.contains("stations") {
            return Err(garbage_error("stations"));
        }
        Ok(self.stations.clone())
    }
}

/// Geocoder with a fixed address book.
#[derive(Debug, Default)]
pub(crate) struct FakeGeocoder {
    known: HashMap<String, LatLon>,
}

impl FakeGeocoder {
    pub(crate) fn with(mut self, address: &str, location: LatLon) -> Self {
        self.known.insert(address.to_string(), location);
        self
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<LatLon, GeocodeError> {
        self.known
            .get(address)
            .copied()
            .ok_or_else(|| GeocodeError::InvalidAddress(address.to_string()))
    }
}

/// Plot sink that keeps what it was handed.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub(crate) rendered: Mutex<Vec<(usize, usize, usize)>>,
}

#[async_trait]
impl PlotSink for RecordingSink {
    async fn render(
        &self,
        pollution: &[MeasurementRecord],
        temperature: &[MeasurementRecord],
        humidity: &[MeasurementRecord],
    ) -> Result<(), PlotError> {
        self.rendered
            .lock()
            .unwrap()
            .push((pollution.len(), temperature.len(), humidity.len()));
        Ok(())
    }
}
