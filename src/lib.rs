mod airbox;
mod cache;
mod config;
mod error;
mod fetching;
mod geocode;
mod plot;
mod stations;
mod types;
mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use airbox::{Airbox, QueryReport};
pub use config::{AirboxConfig, ConfigError, GOOGLE_API_KEY_VAR, MOE_API_KEY_VAR};
pub use error::AirboxError;

pub use types::category::Category;
pub use types::location::LatLon;
pub use types::measurement::{MeasurementRecord, TIMESTAMP_FORMAT};
pub use types::station::Station;

pub use stations::distance::distance;
pub use stations::error::LocateStationError;
pub use stations::locate_station::StationLocator;

pub use fetching::client::{EnvironmentApi, MoeClient};
pub use fetching::error::FetchError;
pub use fetching::paginated::{
    PaginatedFetcher, StopReason, WindowedRecords, DEFAULT_MAX_EMPTY_FETCHES,
    DEFAULT_OFFSET_CEILING, DEFAULT_PAGE_SIZE,
};
pub use fetching::raw::RawRecord;

pub use cache::error::CacheError;
pub use cache::refresh::spawn_refresh_task;
pub use cache::storage::CacheStorage;
pub use cache::supplementary::{RefreshSummary, SupplementaryCache, SupplementarySettings};

pub use geocode::{GeocodeError, Geocoder, GoogleGeocoder, GOOGLE_GEOCODING_URL};
pub use plot::{JsonPlotSink, PlotError, PlotName, PlotSink};
