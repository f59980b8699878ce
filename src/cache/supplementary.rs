//! File-backed cache of per-station temperature and humidity series.
//!
//! A refresh pages through the shared supplementary endpoint for all stations at
//! once and rewrites one JSON file per station per category. Loading a station
//! whose files are missing triggers a full refresh first.

use crate::cache::error::CacheError;
use crate::cache::storage::CacheStorage;
use crate::fetching::paginated::{PaginatedFetcher, StopReason, DEFAULT_PAGE_SIZE};
use crate::types::category::Category;
use crate::types::measurement::{decode_records, MeasurementRecord};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Parameters of a supplementary refresh run.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplementarySettings {
    /// Shared endpoint covering all stations.
    pub endpoint: String,
    /// Number of stations the target is sized for.
    pub station_count: usize,
    pub records_per_day: usize,
    pub past_days: usize,
    pub page_size: usize,
    pub temperature_folder: String,
    pub humidity_folder: String,
}

impl Default for SupplementarySettings {
    fn default() -> Self {
        Self {
            endpoint: "aqx_p_35".to_string(),
            station_count: 0,
            records_per_day: 24,
            past_days: 3,
            page_size: DEFAULT_PAGE_SIZE,
            temperature_folder: "temperature".to_string(),
            humidity_folder: "humidity".to_string(),
        }
    }
}

impl SupplementarySettings {
    /// Records wanted per category, summed over all stations.
    pub fn target_count(&self) -> usize {
        self.records_per_day * self.past_days * self.station_count
    }

    pub fn window_hours(&self) -> i64 {
        i64::try_from(self.past_days * 24).unwrap_or(i64::MAX)
    }

    fn folder(&self, category: Category) -> &str {
        match category {
            Category::Humidity => &self.humidity_folder,
            _ => &self.temperature_folder,
        }
    }
}

/// What a refresh wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSummary {
    pub temperature_files: usize,
    pub humidity_files: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug)]
pub struct SupplementaryCache {
    fetcher: PaginatedFetcher,
    storage: CacheStorage,
    settings: SupplementarySettings,
    refresh_lock: Mutex<()>,
}

impl SupplementaryCache {
    pub fn new(
        fetcher: PaginatedFetcher,
        storage: CacheStorage,
        settings: SupplementarySettings,
    ) -> Self {
        Self {
            fetcher,
            storage,
            settings,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &SupplementarySettings {
        &self.settings
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Cache file of `station` for `category`: `<root>/<folder>/station_<id>.json`.
    pub fn file_path(&self, category: Category, station: &str) -> PathBuf {
        self.storage
            .path(self.settings.folder(category), &format!("station_{station}.json"))
    }

    /// Fetches temperature and humidity for all stations and overwrites their files.
    ///
    /// Only stations that received records in this run get a file; files of other
    /// stations are left as they were. Refreshes within one process run one at a time.
    pub async fn refresh(&self) -> Result<RefreshSummary, CacheError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<RefreshSummary, CacheError> {
        info!(
            "Refreshing supplementary data for {} stations from {}",
            self.settings.station_count, self.settings.endpoint
        );
        for category in Category::SUPPLEMENTARY {
            self.storage.ensure_dir(self.settings.folder(category)).await?;
        }

        let records = self
            .fetcher
            .fetch_windowed()
            .endpoint(&self.settings.endpoint)
            .categories(&Category::SUPPLEMENTARY)
            .target_count(self.settings.target_count())
            .window_hours(self.settings.window_hours())
            .page_size(self.settings.page_size)
            .call()
            .await?;
        if records.stop_reason() != StopReason::TargetReached {
            warn!(
                "Supplementary refresh ended early ({}); temperature {}, humidity {} of {} records",
                records.stop_reason(),
                records.count(Category::Temperature),
                records.count(Category::Humidity),
                self.settings.target_count()
            );
        }

        let mut written = [0usize; 2];
        for (slot, category) in Category::SUPPLEMENTARY.into_iter().enumerate() {
            for (station, station_records) in records.stations(category) {
                let bytes = serde_json::to_vec_pretty(station_records)
                    .map_err(CacheError::CacheEncode)?;
                self.storage
                    .write(&self.file_path(category, station), bytes)
                    .await?;
                written[slot] += 1;
            }
        }

        let summary = RefreshSummary {
            temperature_files: written[0],
            humidity_files: written[1],
            stop_reason: records.stop_reason(),
        };
        info!("Supplementary refresh done: {:?}", summary);
        Ok(summary)
    }

    /// Reads the cached temperature and humidity series of `station`.
    ///
    /// If either file is missing, all stations are refreshed first.
    ///
    /// # Errors
    ///
    /// [`CacheError::Corrupt`] if a file exists but is not valid cache JSON (no refetch
    /// is attempted), [`CacheError::MissingAfterRefresh`] if the refresh produced no data
    /// for the station, and any error of [`SupplementaryCache::refresh`].
    pub async fn load(
        &self,
        station: &str,
    ) -> Result<(Vec<MeasurementRecord>, Vec<MeasurementRecord>), CacheError> {
        let temperature_path = self.file_path(Category::Temperature, station);
        let humidity_path = self.file_path(Category::Humidity, station);

        if !self.both_exist(&temperature_path, &humidity_path).await {
            let _guard = self.refresh_lock.lock().await;
            // A refresh that held the lock may already have written them.
            if !self.both_exist(&temperature_path, &humidity_path).await {
                info!("Cache miss for station {}, refreshing all stations", station);
                self.refresh_locked().await?;
            }
        }

        let temperature = self.read(Category::Temperature, station).await?;
        let humidity = self.read(Category::Humidity, station).await?;
        Ok((temperature, humidity))
    }

    async fn both_exist(&self, first: &Path, second: &Path) -> bool {
        self.storage.exists(first).await && self.storage.exists(second).await
    }

    async fn read(
        &self,
        category: Category,
        station: &str,
    ) -> Result<Vec<MeasurementRecord>, CacheError> {
        let path = self.file_path(category, station);
        if !self.storage.exists(&path).await {
            return Err(CacheError::MissingAfterRefresh {
                station: station.to_string(),
                category,
            });
        }
        let bytes = self.storage.read(&path).await?;
        decode_records(&bytes, category).map_err(|source| CacheError::Corrupt { path, source })
    }
}
