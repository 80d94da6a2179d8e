//! Cache-wrapped loading of dataset documents.

use crate::cache::{keys, ValuationCache};
use crate::datasource::{DataSource, DataSourceError};
use crate::domain::{DatasetMeta, PriceTable, SetCode, SetDetail, SetSummary};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// A dataset document the loader can be asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    SetList,
    SetDetail(SetCode),
    PriceTable,
    Meta,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::SetList => write!(f, "set list"),
            Resource::SetDetail(code) => write!(f, "set {}", code),
            Resource::PriceTable => write!(f, "price table"),
            Resource::Meta => write!(f, "dataset meta"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The document exists upstream but could not be fetched or parsed.
    #[error("{resource} is unavailable: {reason}")]
    DataUnavailable { resource: Resource, reason: String },

    /// Upstream has no such document.
    #[error("{0} not found")]
    NotFound(Resource),
}

impl LoadError {
    fn from_source(resource: Resource, err: DataSourceError) -> Self {
        match err {
            DataSourceError::NotFound(_) => LoadError::NotFound(resource),
            other => LoadError::DataUnavailable {
                resource,
                reason: other.to_string(),
            },
        }
    }
}

/// Loads dataset documents through the cache.
///
/// A requested document that cannot be loaded is always an error; it is never
/// replaced with empty data. Failures are not cached.
#[derive(Clone)]
pub struct DatasetLoader {
    datasource: Arc<dyn DataSource>,
    cache: Arc<ValuationCache>,
    ttl: Duration,
}

impl DatasetLoader {
    pub fn new(datasource: Arc<dyn DataSource>, cache: Arc<ValuationCache>, ttl: Duration) -> Self {
        Self {
            datasource,
            cache,
            ttl,
        }
    }

    pub fn cache(&self) -> &Arc<ValuationCache> {
        &self.cache
    }

    pub async fn set_list(&self) -> Result<Arc<Vec<SetSummary>>, LoadError> {
        self.cache
            .get_or_try_insert_with(&keys::set_list(), Some(self.ttl), || async {
                self.datasource
                    .fetch_set_list()
                    .await
                    .map_err(|e| self.failed(Resource::SetList, e))
            })
            .await
    }

    pub async fn set_detail(&self, code: &SetCode) -> Result<Arc<SetDetail>, LoadError> {
        let code = code.canonical();
        self.cache
            .get_or_try_insert_with(&keys::set_detail(&code), Some(self.ttl), || async {
                self.datasource
                    .fetch_set_detail(&code)
                    .await
                    .map_err(|e| self.failed(Resource::SetDetail(code.clone()), e))
            })
            .await
    }

    pub async fn prices(&self) -> Result<Arc<PriceTable>, LoadError> {
        self.cache
            .get_or_try_insert_with(&keys::prices(), Some(self.ttl), || async {
                let prices = self
                    .datasource
                    .fetch_prices()
                    .await
                    .map_err(|e| self.failed(Resource::PriceTable, e))?;
                info!(entries = prices.len(), "Loaded price snapshot");
                Ok(prices)
            })
            .await
    }

    pub async fn meta(&self) -> Result<Arc<DatasetMeta>, LoadError> {
        self.cache
            .get_or_try_insert_with(&keys::meta(), Some(self.ttl), || async {
                self.datasource
                    .fetch_meta()
                    .await
                    .map_err(|e| self.failed(Resource::Meta, e))
            })
            .await
    }

    fn failed(&self, resource: Resource, err: DataSourceError) -> LoadError {
        warn!(resource = %resource, error = %err, "Dataset load failed");
        LoadError::from_source(resource, err)
    }
}
