//! HTTP client for the published dataset documents.

use super::{DataSource, DataSourceError};
use crate::domain::{DatasetMeta, PriceTable, SetCode, SetDetail, SetSummary};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const SET_LIST_DOCUMENT: &str = "SetList.json";
const PRICES_DOCUMENT: &str = "AllPricesToday.json";
const META_DOCUMENT: &str = "Meta.json";

/// Data source reading `{base}/<Document>.json` files over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: Client,
    base_url: String,
    max_retry_elapsed: Duration,
}

impl HttpDataSource {
    /// Create a new HTTP data source rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retry_elapsed: Duration::from_secs(30),
        }
    }

    /// Cap the total time spent retrying transient failures.
    pub fn with_max_retry_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_retry_elapsed = elapsed;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, document: &str) -> String {
        format!("{}/{}", self.base_url, document)
    }

    async fn get_json(&self, document: &str) -> Result<serde_json::Value, DataSourceError> {
        let url = self.document_url(document);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                warn!(url = %url, error = %e, "Dataset request failed; retrying");
                backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(backoff::Error::permanent(DataSourceError::NotFound(
                    document.to_string(),
                )));
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }

    async fn get_document<T: DeserializeOwned>(
        &self,
        document: &str,
    ) -> Result<T, DataSourceError> {
        debug!(document = %document, "Fetching dataset document");
        let body = self.get_json(document).await?;
        serde_json::from_value(unwrap_envelope(body))
            .map_err(|e| DataSourceError::ParseError(format!("{}: {}", document, e)))
    }
}

/// Documents are published as `{"meta": ..., "data": ...}`; bare bodies pass through.
pub(crate) fn unwrap_envelope(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_set_list(&self) -> Result<Vec<SetSummary>, DataSourceError> {
        let sets: Vec<SetSummary> = self.get_document(SET_LIST_DOCUMENT).await?;
        info!(count = sets.len(), "Fetched set list");
        Ok(sets)
    }

    async fn fetch_set_detail(&self, code: &SetCode) -> Result<SetDetail, DataSourceError> {
        let document = format!("{}.json", code.canonical());
        let detail: SetDetail = self.get_document(&document).await?;
        info!(
            set = %detail.code,
            cards = detail.cards.len(),
            products = detail.booster.len(),
            "Fetched set detail"
        );
        Ok(detail)
    }

    async fn fetch_prices(&self) -> Result<PriceTable, DataSourceError> {
        let prices: PriceTable = self.get_document(PRICES_DOCUMENT).await?;
        info!(entries = prices.len(), "Fetched price snapshot");
        Ok(prices)
    }

    async fn fetch_meta(&self) -> Result<DatasetMeta, DataSourceError> {
        self.get_document(META_DOCUMENT).await
    }
}
