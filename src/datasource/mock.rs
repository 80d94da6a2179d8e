//! Mock data source for testing without network calls.

use super::{DataSource, DataSourceError};
use crate::domain::{DatasetMeta, PriceTable, SetCode, SetDetail, SetSummary};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock data source that returns predefined documents.
///
/// The set list is derived from the registered set details unless one is given
/// explicitly. Every fetch is counted so tests can assert on cache behaviour.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    set_list: Option<Vec<SetSummary>>,
    sets: BTreeMap<SetCode, SetDetail>,
    prices: Option<PriceTable>,
    meta: Option<DatasetMeta>,
    failing_sets: HashSet<SetCode>,
    fetches: Arc<AtomicUsize>,
}

impl MockDataSource {
    /// Create a new mock data source with no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set detail document.
    pub fn with_set(mut self, detail: SetDetail) -> Self {
        self.sets.insert(detail.code.canonical(), detail);
        self
    }

    /// Register multiple set detail documents.
    pub fn with_sets(mut self, details: Vec<SetDetail>) -> Self {
        for detail in details {
            self = self.with_set(detail);
        }
        self
    }

    /// Override the set list instead of deriving it from registered sets.
    pub fn with_set_list(mut self, sets: Vec<SetSummary>) -> Self {
        self.set_list = Some(sets);
        self
    }

    /// Set the price snapshot returned by fetch_prices.
    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = Some(prices);
        self
    }

    /// Set the build stamp returned by fetch_meta.
    pub fn with_meta(mut self, meta: DatasetMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Make fetch_set_detail fail for this set with a server error.
    pub fn with_failing_set(mut self, code: &str) -> Self {
        self.failing_sets.insert(SetCode::from(code).canonical());
        self
    }

    /// Total number of fetch calls served so far (shared across clones).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch_set_list(&self) -> Result<Vec<SetSummary>, DataSourceError> {
        self.record_fetch();
        Ok(self
            .set_list
            .clone()
            .unwrap_or_else(|| self.sets.values().map(SetDetail::summary).collect()))
    }

    async fn fetch_set_detail(&self, code: &SetCode) -> Result<SetDetail, DataSourceError> {
        self.record_fetch();
        let code = code.canonical();
        if self.failing_sets.contains(&code) {
            return Err(DataSourceError::HttpError {
                status: 500,
                message: "Server error".to_string(),
            });
        }
        self.sets
            .get(&code)
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound(format!("{}.json", code)))
    }

    async fn fetch_prices(&self) -> Result<PriceTable, DataSourceError> {
        self.record_fetch();
        self.prices
            .clone()
            .ok_or_else(|| DataSourceError::NotFound("AllPricesToday.json".to_string()))
    }

    async fn fetch_meta(&self) -> Result<DatasetMeta, DataSourceError> {
        self.record_fetch();
        self.meta
            .clone()
            .ok_or_else(|| DataSourceError::NotFound("Meta.json".to_string()))
    }
}
