use crate::cache::supplementary::SupplementaryCache;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Refreshes `cache` every `every`, starting one interval from now.
///
/// A failed refresh is logged and the schedule continues. Abort the returned
/// handle to stop it.
pub fn spawn_refresh_task(cache: Arc<SupplementaryCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            info!("Scheduled supplementary refresh");
            if let Err(e) = cache.refresh().await {
                error!("Scheduled supplementary refresh failed: {e}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::storage::CacheStorage;
    use crate::cache::supplementary::SupplementarySettings;
    use crate::fetching::paginated::PaginatedFetcher;
    use crate::test_support::FakeApi;
    use chrono::FixedOffset;

    #[tokio::test]
    async fn refreshes_repeatedly_and_survives_failures() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new().failing("aqx_p_35"));
        let fetcher = PaginatedFetcher::new(api.clone(), FixedOffset::east_opt(8 * 3600).unwrap());
        let settings = SupplementarySettings {
            station_count: 1,
            ..Default::default()
        };
        let cache = Arc::new(SupplementaryCache::new(
            fetcher,
            CacheStorage::new(dir.path()),
            settings,
        ));

        let handle = spawn_refresh_task(cache, Duration::from_millis(20));
        assert_eq!(api.runs("aqx_p_35"), 0, "first refresh waits one interval");

        let deadline = Instant::now() + Duration::from_secs(5);
        while api.runs("aqx_p_35") < 2 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(api.runs("aqx_p_35") >= 2);
    }
}
