//! The main entry point: resolve an address to its nearest monitoring station and
//! gather that station's recent PM2.5, temperature and humidity series.

use crate::cache::refresh::spawn_refresh_task;
use crate::cache::storage::CacheStorage;
use crate::cache::supplementary::{RefreshSummary, SupplementaryCache};
use crate::config::AirboxConfig;
use crate::error::AirboxError;
use crate::fetching::client::{EnvironmentApi, MoeClient};
use crate::fetching::error::FetchError;
use crate::fetching::paginated::{PaginatedFetcher, StopReason};
use crate::geocode::{Geocoder, GoogleGeocoder};
use crate::plot::{JsonPlotSink, PlotName, PlotSink};
use crate::stations::locate_station::StationLocator;
use crate::types::category::Category;
use crate::types::location::LatLon;
use crate::types::measurement::MeasurementRecord;
use crate::types::station::Station;
use bon::bon;
use log::{info, warn};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Everything one address query produced.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    pub address: String,
    /// Geocoded coordinates of `address`.
    pub location: LatLon,
    pub station: Station,
    pub distance_km: f64,
    pub pollution: Vec<MeasurementRecord>,
    pub temperature: Vec<MeasurementRecord>,
    pub humidity: Vec<MeasurementRecord>,
    /// How the pollution run ended; anything but `TargetReached` means fewer records than asked for.
    pub pollution_stop: StopReason,
}

impl QueryReport {
    /// One-line, `~`-separated description of the address and its station, as shown to users.
    pub fn summary(&self) -> String {
        format!(
            "地址: {}~緯度: {}~經度: {}~~空氣品質區:{}~城市: {}~鄉鎮: {}~測站名稱: {}~測站編號: {}~緯度: {}~經度: {}",
            self.address,
            self.location.latitude(),
            self.location.longitude(),
            self.station.area_name,
            self.station.county,
            self.station.township,
            self.station.name,
            self.station.id,
            self.station.latitude,
            self.station.longitude,
        )
    }
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Client tying together geocoding, station resolution, the pollution fetch,
/// the supplementary cache and the plot sink.
///
/// # Examples
///
/// ```rust,no_run
/// # use airbox::{Airbox, AirboxConfig, AirboxError};
/// # async fn run() -> Result<(), AirboxError> {
/// let config = AirboxConfig::from_env();
/// let airbox = Airbox::new(config)?;
/// let report = airbox.query("臺北市中正區重慶南路一段122號").await?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Airbox {
    config: AirboxConfig,
    api: Arc<dyn EnvironmentApi>,
    geocoder: Arc<dyn Geocoder>,
    plot_sink: Arc<dyn PlotSink>,
    fetcher: PaginatedFetcher,
    supplementary: Arc<SupplementaryCache>,
    plot_dir: PathBuf,
}

#[bon]
impl Airbox {
    /// Creates a client talking to the real environmental and geocoding APIs, writing
    /// plots as JSON into the configured plot directory.
    ///
    /// # Errors
    ///
    /// [`crate::ConfigError::MissingApiKey`] if either API key is empty, other
    /// [`crate::ConfigError`]s for an unusable zone or cache directory, and
    /// [`FetchError::ClientBuild`] / [`crate::GeocodeError::ClientBuild`] if the HTTP
    /// clients cannot be built.
    pub fn new(config: AirboxConfig) -> Result<Self, AirboxError> {
        config.require_api_keys()?;
        let api = MoeClient::new(
            &config.api_base_url,
            &config.api_key,
            &config.stations_endpoint,
            config.request_timeout(),
        )?;
        let geocoder = GoogleGeocoder::new(
            &config.geocoding_url,
            &config.geocoding_api_key,
            config.request_timeout(),
        )?;
        let plot_sink = JsonPlotSink::new(config.resolved_plot_dir()?);

        Self::from_parts()
            .config(config)
            .api(Arc::new(api))
            .geocoder(Arc::new(geocoder))
            .plot_sink(Arc::new(plot_sink))
            .call()
    }

    /// Creates a client from explicit collaborators.
    ///
    /// # Arguments
    ///
    /// * `.config(AirboxConfig)`: **Required.** Paging limits, window, zone, cache layout.
    /// * `.api(Arc<dyn EnvironmentApi>)`: **Required.** Station list and measurement pages.
    /// * `.geocoder(Arc<dyn Geocoder>)`: **Required.** Address resolution.
    /// * `.plot_sink(Arc<dyn PlotSink>)`: **Required.** Receives each query's series.
    #[builder]
    pub fn from_parts(
        config: AirboxConfig,
        api: Arc<dyn EnvironmentApi>,
        geocoder: Arc<dyn Geocoder>,
        plot_sink: Arc<dyn PlotSink>,
    ) -> Result<Self, AirboxError> {
        let fetcher = PaginatedFetcher::new(api.clone(), config.zone()?)
            .with_offset_ceiling(config.offset_ceiling)
            .with_max_empty_fetches(config.max_empty_fetches);
        let supplementary = SupplementaryCache::new(
            fetcher.clone(),
            CacheStorage::new(config.resolved_cache_dir()?),
            config.supplementary_settings(),
        );
        let plot_dir = config.resolved_plot_dir()?;

        Ok(Self {
            config,
            api,
            geocoder,
            plot_sink,
            fetcher,
            supplementary: Arc::new(supplementary),
            plot_dir,
        })
    }

    pub fn config(&self) -> &AirboxConfig {
        &self.config
    }

    pub fn supplementary(&self) -> &Arc<SupplementaryCache> {
        &self.supplementary
    }

    /// Runs a full query for `address`.
    ///
    /// Geocodes the address, resolves the nearest non-denied station, collects its PM2.5
    /// records for the configured window, loads its temperature and humidity from the
    /// cache (refreshing on a miss), and hands all three series to the plot sink.
    ///
    /// # Errors
    ///
    /// [`crate::GeocodeError::InvalidAddress`] (see [`AirboxError::is_invalid_input`])
    /// when the address does not resolve, [`crate::LocateStationError`] when no station is
    /// left after the deny-list, [`FetchError::NoEndpointForStation`] when the station has
    /// no pollution endpoint, and any upstream, cache or plot failure. Nothing is retried.
    pub async fn query(&self, address: &str) -> Result<QueryReport, AirboxError> {
        let location = self.geocoder.geocode(address).await?;
        info!("Resolved '{}' to {}", address, location);

        let stations = self.api.fetch_stations().await?;
        let locator = StationLocator::new(stations, self.config.deny_list.as_slice());
        let (station, distance_km) = locator.nearest(location)?;
        let station = station.clone();
        info!(
            "Nearest station is {} ({}) at {:.2} km",
            station.name, station.id, distance_km
        );

        let endpoint = self
            .config
            .station_endpoints
            .get(&station.id)
            .ok_or_else(|| FetchError::NoEndpointForStation(station.id.clone()))?;
        let mut windowed = self
            .fetcher
            .fetch_windowed()
            .endpoint(endpoint)
            .categories(&[Category::Pm25])
            .target_count(self.config.pollution_target())
            .window_hours(self.config.window_hours())
            .page_size(self.config.page_size)
            .station(&station.id)
            .call()
            .await?;
        if windowed.stop_reason() != StopReason::TargetReached {
            warn!(
                "Pollution run for station {} ended early ({}) with {} of {} records",
                station.id,
                windowed.stop_reason(),
                windowed.count(Category::Pm25),
                self.config.pollution_target()
            );
        }
        let pollution = windowed.take_station(Category::Pm25, &station.id);

        let (temperature, humidity) = self.supplementary.load(&station.id).await?;
        self.plot_sink
            .render(&pollution, &temperature, &humidity)
            .await?;

        Ok(QueryReport {
            address: address.to_string(),
            location,
            station,
            distance_km,
            pollution,
            temperature,
            humidity,
            pollution_stop: windowed.stop_reason(),
        })
    }

    /// Refreshes temperature and humidity for every station now.
    pub async fn refresh_supplementary(&self) -> Result<RefreshSummary, AirboxError> {
        Ok(self.supplementary.refresh().await?)
    }

    /// Starts the periodic supplementary refresh at the configured interval.
    pub fn spawn_scheduled_refresh(&self) -> JoinHandle<()> {
        spawn_refresh_task(self.supplementary.clone(), self.config.refresh_interval())
    }

    /// File backing the plot artifact called `name`.
    ///
    /// # Errors
    ///
    /// [`crate::PlotError::UnknownPlot`] for a name other than `total` or `pm25_average`.
    pub fn plot_path(&self, name: &str) -> Result<PathBuf, AirboxError> {
        let plot = PlotName::from_name(name)?;
        Ok(self.plot_dir.join(plot.file_name()))
    }
}
