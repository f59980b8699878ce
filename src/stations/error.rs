use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateStationError {
    #[error("No stations available to resolve against")]
    NoStations,

    #[error("Station '{station}' has invalid coordinate '{value}'")]
    InvalidCoordinates { station: String, value: String },
}
