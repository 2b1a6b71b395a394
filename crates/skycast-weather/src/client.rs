//! Weather proxy client.
//!
//! The proxy exposes three read-only endpoints:
//! - `GET /api/search/query/{text}` → `[LocationCandidate]`
//! - `GET /api/search/lattlong/{lat},{long}` → `[LocationCandidate]`
//! - `GET /api/location/{id}` → `Forecast`

use std::future::Future;

use reqwest::Client;
use serde::de::DeserializeOwned;
use skycast_core::{ApiConfig, ReqwestErrorExt};
use tracing::instrument;
use url::Url;

use crate::types::{ApiError, Coordinates, Forecast, LocationCandidate};

/// Location lookups used by the search session.
pub trait LocationApi: Send + Sync + 'static {
    /// Search locations by free text.
    fn search_query(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<LocationCandidate>, ApiError>> + Send;

    /// Search locations nearest to the given coordinates.
    fn search_lattlong(
        &self,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<Vec<LocationCandidate>, ApiError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::build(base_url, Client::builder())
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Self::build(&config.base_url, builder)
    }

    fn build(base_url: &str, builder: reqwest::ClientBuilder) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = builder
            .build()
            .map_err(|e| ApiError::Network(e.into_network_error()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch the forecast for a location id.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(&self, id: u64) -> Result<Forecast, ApiError> {
        let url = self.endpoint(&["api", "location", &id.to_string()])?;
        let forecast: Forecast = self.get_json(url).await?;
        tracing::debug!(
            "Forecast for {} has {} days",
            forecast.title,
            forecast.consolidated_weather.len()
        );
        Ok(forecast)
    }

    /// GET a URL and decode its JSON body. Any non-2xx status is an error and
    /// the body is left unread.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                endpoint: url.path().to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("{}: {}", url.path(), e)))
    }
}

impl LocationApi for ApiClient {
    #[instrument(skip(self), level = "info")]
    async fn search_query(&self, query: &str) -> Result<Vec<LocationCandidate>, ApiError> {
        let url = self.endpoint(&["api", "search", "query", query])?;
        self.get_json(url).await
    }

    #[instrument(skip(self), level = "info")]
    async fn search_lattlong(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<LocationCandidate>, ApiError> {
        let lattlong = coordinates.to_string();
        let url = self.endpoint(&["api", "search", "lattlong", &lattlong])?;
        self.get_json(url).await
    }
}
