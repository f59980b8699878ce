//! Access to the environmental API: the station list and offset-paged measurement endpoints.

use crate::fetching::error::FetchError;
use crate::fetching::raw::{PageBody, RawRecord};
use crate::types::station::Station;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::time::Duration;

/// The upstream environmental API as seen by the fetcher and the orchestrator.
#[async_trait]
pub trait EnvironmentApi: Send + Sync + Debug {
    /// Fetches one page of measurement records from `endpoint`, skipping `offset` records.
    async fn fetch_page(
        &self,
        endpoint: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>, FetchError>;

    /// Fetches the current list of monitoring stations.
    async fn fetch_stations(&self) -> Result<Vec<Station>, FetchError>;
}

/// [`EnvironmentApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct MoeClient {
    http: Client,
    base_url: String,
    api_key: String,
    stations_endpoint: String,
}

impl MoeClient {
    /// Creates a client. `timeout` bounds every request, connect to last byte.
    pub fn new(
        base_url: &str,
        api_key: &str,
        stations_endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            stations_endpoint: stations_endpoint.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        // Used in errors and logs; never includes the api key.
        let display_url = match query.iter().find(|(k, _)| *k == "offset") {
            Some((_, offset)) => format!("{url}?offset={offset}"),
            None => url.clone(),
        };
        debug!("Requesting {}", display_url);

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(display_url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", display_url, e.status());
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url: display_url,
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(display_url, e)
                });
            }
        };

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::ResponseBody(display_url.clone(), e))?;

        serde_json::from_str(&body).map_err(|source| FetchError::JsonParse {
            url: display_url,
            source,
        })
    }
}

#[async_trait]
impl EnvironmentApi for MoeClient {
    async fn fetch_page(
        &self,
        endpoint: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let body: PageBody<RawRecord> = self
            .get_json(
                endpoint,
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(body.into_records())
    }

    async fn fetch_stations(&self) -> Result<Vec<Station>, FetchError> {
        let body: PageBody<Station> = self.get_json(&self.stations_endpoint, &[]).await?;
        Ok(body.into_records())
    }
}
