use crate::cache::error::CacheError;
use crate::config::ConfigError;
use crate::fetching::error::FetchError;
use crate::geocode::GeocodeError;
use crate::plot::PlotError;
use crate::stations::error::LocateStationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirboxError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    LocateStation(#[from] LocateStationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Plot(#[from] PlotError),
}

impl AirboxError {
    /// Whether the caller asked for something that does not exist (an address the
    /// geocoder cannot resolve, an unknown plot name), as opposed to a failure upstream
    /// or on disk.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            AirboxError::Geocode(GeocodeError::InvalidAddress(_))
                | AirboxError::Plot(PlotError::UnknownPlot(_))
        )
    }
}
