//! Offset-paged collection of recent measurements from the environmental API.
//!
//! A run walks one endpoint page by page, keeps records of the requested
//! categories that fall inside a trailing time window, and stops at the first of:
//! every category reached its target, too many consecutive pages added nothing,
//! or the offset safety ceiling.

use crate::fetching::client::EnvironmentApi;
use crate::fetching::error::FetchError;
use crate::fetching::raw::RawRecord;
use crate::types::category::Category;
use crate::types::measurement::{MeasurementRecord, TIMESTAMP_FORMAT};
use bon::bon;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_OFFSET_CEILING: usize = 30_000;
pub const DEFAULT_MAX_EMPTY_FETCHES: usize = 3;

/// Why a paginated run ended. Only `TargetReached` means the data is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every requested category reached its target count.
    TargetReached,
    /// Too many consecutive pages added no record to any tracked category.
    EmptyStreak,
    /// The offset safety ceiling was reached.
    OffsetCeiling,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::TargetReached => "target reached",
            StopReason::EmptyStreak => "consecutive empty pages",
            StopReason::OffsetCeiling => "offset ceiling",
        };
        f.write_str(s)
    }
}

/// The records collected by one run, grouped by category and then by station id.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedRecords {
    buckets: BTreeMap<Category, BTreeMap<String, Vec<MeasurementRecord>>>,
    counts: BTreeMap<Category, usize>,
    pages_fetched: usize,
    stop_reason: StopReason,
}

impl WindowedRecords {
    fn new(categories: &[Category]) -> Self {
        Self {
            buckets: categories.iter().map(|c| (*c, BTreeMap::new())).collect(),
            counts: categories.iter().map(|c| (*c, 0)).collect(),
            pages_fetched: 0,
            stop_reason: StopReason::TargetReached,
        }
    }

    fn push(&mut self, record: MeasurementRecord) {
        *self.counts.entry(record.category).or_default() += 1;
        self.buckets
            .entry(record.category)
            .or_default()
            .entry(record.station_id.clone())
            .or_default()
            .push(record);
    }

    fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn all_reached(&self, target_count: usize) -> bool {
        self.counts.values().all(|count| *count >= target_count)
    }

    /// Number of records kept for `category`, summed over all stations.
    pub fn count(&self, category: Category) -> usize {
        self.counts.get(&category).copied().unwrap_or_default()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    /// Records of `category` for one station, in upstream order.
    pub fn station_records(&self, category: Category, station: &str) -> &[MeasurementRecord] {
        self.buckets
            .get(&category)
            .and_then(|stations| stations.get(station))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Station id → records for `category`. Stations without records are absent.
    pub fn stations(&self, category: Category) -> impl Iterator<Item = (&str, &[MeasurementRecord])> {
        self.buckets
            .get(&category)
            .into_iter()
            .flat_map(|stations| stations.iter().map(|(id, records)| (id.as_str(), records.as_slice())))
    }

    /// Takes the records of `category` for one station out of the result.
    pub fn take_station(&mut self, category: Category, station: &str) -> Vec<MeasurementRecord> {
        self.buckets
            .get_mut(&category)
            .and_then(|stations| stations.remove(station))
            .unwrap_or_default()
    }
}

/// Runs offset-paged collections against an [`EnvironmentApi`].
#[derive(Debug, Clone)]
pub struct PaginatedFetcher {
    api: Arc<dyn EnvironmentApi>,
    zone: FixedOffset,
    offset_ceiling: usize,
    max_empty_fetches: usize,
}

#[bon]
impl PaginatedFetcher {
    /// Creates a fetcher interpreting upstream timestamps in `zone`, with the
    /// default offset ceiling and empty-page limit.
    pub fn new(api: Arc<dyn EnvironmentApi>, zone: FixedOffset) -> Self {
        Self {
            api,
            zone,
            offset_ceiling: DEFAULT_OFFSET_CEILING,
            max_empty_fetches: DEFAULT_MAX_EMPTY_FETCHES,
        }
    }

    pub fn with_offset_ceiling(mut self, offset_ceiling: usize) -> Self {
        self.offset_ceiling = offset_ceiling;
        self
    }

    pub fn with_max_empty_fetches(mut self, max_empty_fetches: usize) -> Self {
        self.max_empty_fetches = max_empty_fetches.max(1);
        self
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// Collects records of `categories` from `endpoint` that are at most
    /// `window_hours` old, until each category holds `target_count` records.
    ///
    /// # Arguments
    ///
    /// * `.endpoint(&str)`: **Required.** Upstream endpoint to page through.
    /// * `.categories(&[Category])`: **Required.** Categories to keep; each gets its own count.
    /// * `.target_count(usize)`: **Required.** Records wanted per category, summed over stations.
    ///   Records beyond the target are ignored.
    /// * `.window_hours(i64)`: **Required.** Records older than this, relative to `now`, are dropped.
    /// * `.page_size(usize)`: Optional. Offset increment per request. Defaults to `1000`.
    /// * `.station(&str)`: Optional. Keep only records of this station.
    /// * `.now(DateTime<FixedOffset>)`: Optional. Reference time for the window, fixed for
    ///   the whole run. Defaults to the current time.
    ///
    /// Ending on the empty-page streak or the offset ceiling is not an error; the partial
    /// result is returned and [`WindowedRecords::stop_reason`] tells which guard fired.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] from the API, and [`FetchError::InvalidTimestamp`] for a
    /// tracked record whose timestamp does not parse. Nothing is retried.
    #[builder]
    pub async fn fetch_windowed(
        &self,
        endpoint: &str,
        categories: &[Category],
        target_count: usize,
        window_hours: i64,
        #[builder(default = DEFAULT_PAGE_SIZE)] page_size: usize,
        station: Option<&str>,
        now: Option<DateTime<FixedOffset>>,
    ) -> Result<WindowedRecords, FetchError> {
        let page_size = page_size.max(1);
        let now = now
            .unwrap_or_else(|| Utc::now().fixed_offset())
            .with_timezone(&self.zone)
            .naive_local();
        let window = TimeDelta::try_hours(window_hours).unwrap_or(TimeDelta::MAX);

        let mut records = WindowedRecords::new(categories);
        if records.all_reached(target_count) {
            return Ok(records);
        }

        let mut offset = 0;
        let mut empty_streak = 0;
        loop {
            let page = self.api.fetch_page(endpoint, offset, page_size).await?;
            records.pages_fetched += 1;

            let before = records.total();
            for raw in page {
                if let Some(record) =
                    self.accept(raw, &records, target_count, station, now, window)?
                {
                    records.push(record);
                }
            }
            let added = records.total() - before;
            offset += page_size;
            debug!(
                "Page at offset {} of {} added {} records",
                offset - page_size,
                endpoint,
                added
            );

            if records.all_reached(target_count) {
                records.stop_reason = StopReason::TargetReached;
                break;
            }
            if added == 0 {
                empty_streak += 1;
                if empty_streak >= self.max_empty_fetches {
                    records.stop_reason = StopReason::EmptyStreak;
                    break;
                }
            } else {
                empty_streak = 0;
            }
            if offset >= self.offset_ceiling {
                records.stop_reason = StopReason::OffsetCeiling;
                break;
            }
        }

        info!(
            "Fetched {} from {} in {} pages, stopped on {}: {:?}",
            categories
                .iter()
                .map(|c| c.label())
                .collect::<Vec<_>>()
                .join("/"),
            endpoint,
            records.pages_fetched,
            records.stop_reason,
            records.counts,
        );
        Ok(records)
    }
}

impl PaginatedFetcher {
    /// Turns a raw row into a record if it belongs to the run, `None` if it is filtered out.
    fn accept(
        &self,
        raw: RawRecord,
        records: &WindowedRecords,
        target_count: usize,
        station: Option<&str>,
        now: NaiveDateTime,
        window: TimeDelta,
    ) -> Result<Option<MeasurementRecord>, FetchError> {
        let Some(category) = Category::from_label(&raw.itemengname) else {
            return Ok(None);
        };
        if !records.counts.contains_key(&category) || records.count(category) >= target_count {
            return Ok(None);
        }
        if station.is_some_and(|only| only != raw.siteid) {
            return Ok(None);
        }

        let timestamp = NaiveDateTime::parse_from_str(raw.monitordate.trim(), TIMESTAMP_FORMAT)
            .map_err(|source| FetchError::InvalidTimestamp {
                station: raw.siteid.clone(),
                value: raw.monitordate.clone(),
                source,
            })?;
        if now - timestamp > window {
            return Ok(None);
        }

        let Some(value) = raw
            .concentration
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
        else {
            debug!(
                "Skipping non-numeric {} value '{}' from station {}",
                category, raw.concentration, raw.siteid
            );
            return Ok(None);
        };

        Ok(Some(MeasurementRecord {
            station_id: raw.siteid,
            category,
            value,
            timestamp,
        }))
    }
}
