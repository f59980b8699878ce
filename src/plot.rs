//! Plot artifacts built from a query's series.

use crate::types::category::Category;
use crate::types::measurement::MeasurementRecord;
use async_trait::async_trait;
use chrono::Timelike;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Unknown plot '{0}'")]
    UnknownPlot(String),

    #[error("Failed to create plot directory '{0}'")]
    DirCreation(PathBuf, #[source] io::Error),

    #[error("Failed to write plot '{0}'")]
    Write(PathBuf, #[source] io::Error),

    #[error("Failed to encode plot data")]
    Encode(#[source] serde_json::Error),
}

/// The two artifacts every query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotName {
    /// PM2.5, temperature and humidity over the window.
    Total,
    /// Mean PM2.5 per hour of day.
    Pm25Average,
}

impl PlotName {
    pub const ALL: [PlotName; 2] = [PlotName::Total, PlotName::Pm25Average];

    pub fn from_name(name: &str) -> Result<Self, PlotError> {
        Self::ALL
            .into_iter()
            .find(|plot| plot.as_str() == name)
            .ok_or_else(|| PlotError::UnknownPlot(name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlotName::Total => "total",
            PlotName::Pm25Average => "pm25_average",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for PlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer of the series gathered for one query.
#[async_trait]
pub trait PlotSink: Send + Sync + Debug {
    async fn render(
        &self,
        pollution: &[MeasurementRecord],
        temperature: &[MeasurementRecord],
        humidity: &[MeasurementRecord],
    ) -> Result<(), PlotError>;
}

/// Writes plot data as JSON files named after [`PlotName::file_name`].
#[derive(Debug, Clone)]
pub struct JsonPlotSink {
    dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct TotalPlot<'a> {
    pm25: &'a [MeasurementRecord],
    temperature: &'a [MeasurementRecord],
    humidity: &'a [MeasurementRecord],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct HourlyAverage {
    hour: u32,
    average: f64,
    samples: usize,
}

/// Mean value per hour of day, for hours that have samples.
fn hourly_averages(records: &[MeasurementRecord]) -> Vec<HourlyAverage> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for record in records {
        let slot = sums.entry(record.timestamp.hour()).or_insert((0.0, 0));
        slot.0 += record.value;
        slot.1 += 1;
    }
    sums.into_iter()
        .map(|(hour, (sum, samples))| HourlyAverage {
            hour,
            average: sum / samples as f64,
            samples,
        })
        .collect()
}

impl JsonPlotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: PlotName) -> PathBuf {
        self.dir.join(name.file_name())
    }

    async fn write_json<T: Serialize>(&self, name: PlotName, value: &T) -> Result<(), PlotError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(PlotError::Encode)?;
        let path = self.path(name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| PlotError::Write(path.clone(), e))?;
        info!("Wrote plot {} to {}", name, path.display());
        Ok(())
    }
}

#[async_trait]
impl PlotSink for JsonPlotSink {
    async fn render(
        &self,
        pollution: &[MeasurementRecord],
        temperature: &[MeasurementRecord],
        humidity: &[MeasurementRecord],
    ) -> Result<(), PlotError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PlotError::DirCreation(self.dir.clone(), e))?;

        let total = TotalPlot {
            pm25: pollution,
            temperature,
            humidity,
        };
        self.write_json(PlotName::Total, &total).await?;

        let pm25: Vec<MeasurementRecord> = pollution
            .iter()
            .filter(|r| r.category == Category::Pm25)
            .cloned()
            .collect();
        self.write_json(PlotName::Pm25Average, &hourly_averages(&pm25))
            .await
    }
}
