use crate::fetching::error::FetchError;
use crate::types::category::Category;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache path exists but is not a directory: '{0}'")]
    NotADirectory(PathBuf),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Cache file '{path}' is not valid JSON")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] serde_json::Error),

    #[error("No {category} data for station '{station}' even after a refresh")]
    MissingAfterRefresh { station: String, category: Category },

    #[error("Refresh fetch failed")]
    Fetch(#[from] FetchError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
