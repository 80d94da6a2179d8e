//! Valuation service: the operations the HTTP surface exposes.

use super::loader::{DatasetLoader, LoadError};
use crate::cache::{keys, GenerationToken, ValuationCache};
use crate::config::Config;
use crate::domain::{
    CardContribution, CardId, CardIndex, DatasetMeta, Decimal, ProductType, ProductValuation,
    Quote, Ranking, ReferencePriceBook, SetCode, SetSummary,
};
use crate::engine::{FinishPreference, PriceResolver, ProductValuator, RankingEngine};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("set {set} has no {product_type} booster")]
    UnknownProduct {
        set: SetCode,
        product_type: ProductType,
    },

    #[error("computation superseded by newer inputs")]
    Superseded,
}

/// Tunables the service reads from [`Config`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub min_price: Decimal,
    pub years_back: u32,
    pub ranking_product_types: Vec<ProductType>,
    pub ranking_limit: usize,
    pub batch_size: usize,
    pub valuation_ttl: Duration,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_price: config.min_price,
            years_back: config.years_back,
            ranking_product_types: config.ranking_product_types.clone(),
            ranking_limit: config.ranking_limit,
            batch_size: config.valuation_batch_size.max(1),
            valuation_ttl: config.valuation_ttl,
        }
    }
}

#[derive(Clone)]
pub struct ValuationService {
    loader: DatasetLoader,
    references: Arc<ReferencePriceBook>,
    settings: ServiceSettings,
}

impl ValuationService {
    pub fn new(
        loader: DatasetLoader,
        references: Arc<ReferencePriceBook>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            loader,
            references,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<ValuationCache> {
        self.loader.cache()
    }

    pub async fn meta(&self) -> Result<Arc<DatasetMeta>, OrchestrationError> {
        Ok(self.loader.meta().await?)
    }

    pub async fn list_sets(&self) -> Result<Arc<Vec<SetSummary>>, OrchestrationError> {
        Ok(self.loader.set_list().await?)
    }

    /// One valuation per booster product of the set, cached per threshold.
    ///
    /// A computation that overlaps a cache clear still answers its caller but
    /// is not cached, so later calls see the reloaded dataset.
    pub async fn value_set(
        &self,
        code: &SetCode,
        min_price: Option<Decimal>,
    ) -> Result<Arc<Vec<ProductValuation>>, OrchestrationError> {
        let min_price = min_price.unwrap_or(self.settings.min_price);
        let key = keys::valuation(code, min_price);

        let valuations = self
            .cache()
            .get_or_try_insert_with(&key, Some(self.settings.valuation_ttl), || async {
                let detail = self.loader.set_detail(code).await?;
                let prices = self.loader.prices().await?;
                let valuations = ProductValuator::new(min_price)
                    .value_set(&detail, &PriceResolver::new(&prices));
                info!(
                    set = %detail.code,
                    min_price = %min_price,
                    products = valuations.len(),
                    "Valued set"
                );
                Ok::<_, LoadError>(valuations)
            })
            .await?;

        Ok(valuations)
    }

    /// Price a single card. With `set`, the id must belong to that set.
    pub async fn resolve_price(
        &self,
        card_id: &CardId,
        set: Option<&SetCode>,
        preference: FinishPreference,
    ) -> Result<Option<Quote>, OrchestrationError> {
        if let Some(code) = set {
            let detail = self.loader.set_detail(code).await?;
            let known = detail.cards.iter().any(|c| &c.uuid == card_id)
                || detail.sealed_product.iter().any(|p| &p.uuid == card_id);
            if !known {
                debug!(card = %card_id, set = %code, "Card not in set");
                return Ok(None);
            }
        }

        let prices = self.loader.prices().await?;
        Ok(PriceResolver::new(&prices).resolve(card_id, preference))
    }

    /// Cards carrying the most EV in one product of a set.
    pub async fn top_cards(
        &self,
        code: &SetCode,
        product_type: &ProductType,
        min_price: Option<Decimal>,
        limit: usize,
    ) -> Result<Vec<CardContribution>, OrchestrationError> {
        let min_price = min_price.unwrap_or(self.settings.min_price);
        let detail = self.loader.set_detail(code).await?;
        let product = detail.booster.get(product_type).ok_or_else(|| {
            OrchestrationError::UnknownProduct {
                set: detail.code.clone(),
                product_type: product_type.clone(),
            }
        })?;
        let prices = self.loader.prices().await?;
        let cards = CardIndex::new(detail.cards.iter().cloned());

        Ok(ProductValuator::new(min_price).top_cards(
            product,
            &PriceResolver::new(&prices),
            &cards,
            limit,
        ))
    }

    /// Rank under the current generation.
    pub async fn rank(
        &self,
        years_back: Option<u32>,
        min_price: Option<Decimal>,
    ) -> Result<Ranking, OrchestrationError> {
        let token = self.cache().generations().token();
        self.rank_with_token(years_back, min_price, token).await
    }

    /// Rank every eligible set, a batch at a time.
    ///
    /// Yields to the runtime between batches. When `token` goes stale the run
    /// is abandoned with [`OrchestrationError::Superseded`] and nothing is
    /// returned. A set that fails to load is skipped, logged, and listed in
    /// `skipped`; the set list and price table are required.
    pub async fn rank_with_token(
        &self,
        years_back: Option<u32>,
        min_price: Option<Decimal>,
        token: GenerationToken,
    ) -> Result<Ranking, OrchestrationError> {
        let engine = RankingEngine::new(
            years_back.unwrap_or(self.settings.years_back),
            min_price.unwrap_or(self.settings.min_price),
        )
        .with_product_types(self.settings.ranking_product_types.clone())
        .with_limit(self.settings.ranking_limit);

        let today = chrono::Utc::now().date_naive();
        let sets = self.loader.set_list().await?;
        let prices = self.loader.prices().await?;

        let candidates: Vec<&SetSummary> = sets
            .iter()
            .filter(|s| engine.is_eligible(s.release_date, today))
            .collect();
        info!(
            candidates = candidates.len(),
            cutoff = %engine.cutoff(today),
            generation = token.generation(),
            "Starting ranking run"
        );

        let mut rows = Vec::new();
        let mut skipped = Vec::new();

        for batch in candidates.chunks(self.settings.batch_size) {
            let loaded = join_all(batch.iter().map(|s| self.loader.set_detail(&s.code))).await;

            for (summary, result) in batch.iter().zip(loaded) {
                match result {
                    Ok(detail) => {
                        rows.extend(engine.rows_for_set(&detail, &prices, &self.references))
                    }
                    Err(e) => {
                        warn!(set = %summary.code, error = %e, "Skipping set in ranking");
                        skipped.push(summary.code.clone());
                    }
                }
            }

            if !token.is_current() {
                info!(generation = token.generation(), "Ranking run superseded");
                return Err(OrchestrationError::Superseded);
            }
            tokio::task::yield_now().await;
        }

        let mut ranking = engine.rank(rows);
        ranking.skipped = skipped;

        if !token.is_current() {
            info!(generation = token.generation(), "Ranking run superseded");
            return Err(OrchestrationError::Superseded);
        }
        Ok(ranking)
    }

    /// Drop cached entries and invalidate in-flight runs.
    pub async fn clear_cache(&self, prefix: Option<&str>) {
        let token = self.cache().clear(prefix).await;
        info!(prefix = ?prefix, generation = token.generation(), "Cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{DataSource, DataSourceError, MockDataSource};
    use crate::domain::{PriceTable, ReferenceSource, SetDetail};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn set(code: &str, release: &str, common_price_card: &str) -> SetDetail {
        serde_json::from_str(&format!(
            r#"{{
                "code": "{code}",
                "name": "Set {code}",
                "releaseDate": "{release}",
                "cards": [{{"uuid": "{common_price_card}", "name": "Card {code}", "rarity": "common"}}],
                "booster": {{
                    "play": {{"sheets": {{"common": {{"cards": {{"{common_price_card}": 1}}}}}}, "boosters": [{{"contents": {{"common": 2}}}}]}}
                }}
            }}"#
        ))
        .unwrap()
    }

    fn prices() -> PriceTable {
        serde_json::from_str(
            r#"{
                "a": {"paper": {"tcgplayer": {"retail": {"normal": {"2024-05-01": 3.0}}, "currency": "USD"}}},
                "b": {"paper": {"tcgplayer": {"retail": {"normal": {"2024-05-01": 1.0}, "foil": {"2024-05-01": 9.0}}, "currency": "USD"}}}
            }"#,
        )
        .unwrap()
    }

    fn recent() -> String {
        (chrono::Utc::now().date_naive() - chrono::Days::new(30)).to_string()
    }

    fn service(mock: MockDataSource, references: ReferencePriceBook) -> ValuationService {
        let cache = Arc::new(ValuationCache::memory_only());
        let loader = DatasetLoader::new(Arc::new(mock), cache, Duration::from_secs(60));
        let mut settings = ServiceSettings::from_config(&Config::with_dataset_url("mock://"));
        settings.batch_size = 1;
        ValuationService::new(loader, Arc::new(references), settings)
    }

    #[tokio::test]
    async fn test_value_set_is_cached_per_threshold() {
        let mock = MockDataSource::new()
            .with_set(set("AAA", &recent(), "a"))
            .with_prices(prices());
        let service = service(mock.clone(), ReferencePriceBook::new());

        let first = service.value_set(&SetCode::from("aaa"), None).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].ev, d("6"));
        let fetches = mock.fetch_count();

        service.value_set(&SetCode::from("AAA"), None).await.unwrap();
        assert_eq!(mock.fetch_count(), fetches);

        let floored = service.value_set(&SetCode::from("AAA"), Some(d("5"))).await.unwrap();
        assert!(floored[0].ev.is_zero());
    }

    #[tokio::test]
    async fn test_resolve_price_with_and_without_set() {
        let mock = MockDataSource::new()
            .with_set(set("AAA", &recent(), "a"))
            .with_prices(prices());
        let service = service(mock, ReferencePriceBook::new());

        let quote = service
            .resolve_price(&CardId::from("b"), None, FinishPreference::ForceFoil)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quote.value, d("9"));

        let outside = service
            .resolve_price(
                &CardId::from("b"),
                Some(&SetCode::from("AAA")),
                FinishPreference::Unconstrained,
            )
            .await
            .unwrap();
        assert!(outside.is_none());
    }

    #[tokio::test]
    async fn test_top_cards_unknown_product() {
        let mock = MockDataSource::new()
            .with_set(set("AAA", &recent(), "a"))
            .with_prices(prices());
        let service = service(mock, ReferencePriceBook::new());

        let rows = service
            .top_cards(&SetCode::from("AAA"), &ProductType::from("play"), None, 5)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name.as_deref(), Some("Card AAA"));

        let err = service
            .top_cards(&SetCode::from("AAA"), &ProductType::from("collector"), None, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::UnknownProduct { .. }));
    }

    #[tokio::test]
    async fn test_rank_skips_failing_and_old_sets() {
        let mock = MockDataSource::new()
            .with_set(set("AAA", &recent(), "a"))
            .with_set(set("BBB", &recent(), "b"))
            .with_set(set("BAD", &recent(), "a"))
            .with_set(set("OLD", "2001-01-01", "a"))
            .with_failing_set("BAD")
            .with_prices(prices());
        let references = ReferencePriceBook::new()
            .with_trend("AAA", "play", d("5"))
            .with_trend("BBB", "play", d("5"));
        let service = service(mock, references);

        let ranking = service.rank(None, None).await.unwrap();
        let top: Vec<&str> = ranking.top.iter().map(|r| r.set_code.as_str()).collect();
        assert_eq!(top, vec!["AAA", "BBB"]);
        assert_eq!(ranking.top[0].diff, Some(d("1")));
        assert_eq!(ranking.top[0].reference_source, Some(ReferenceSource::Trend));
        assert_eq!(ranking.bottom[0].set_code, SetCode::from("BBB"));
        assert_eq!(ranking.bottom[0].diff, Some(d("-3")));
        assert_eq!(ranking.skipped, vec![SetCode::from("BAD")]);
    }

    #[tokio::test]
    async fn test_rank_requires_price_table() {
        let mock = MockDataSource::new().with_set(set("AAA", &recent(), "a"));
        let service = service(mock, ReferencePriceBook::new());
        let err = service.rank(None, None).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Load(LoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_token_abandons_run() {
        let mock = MockDataSource::new()
            .with_set(set("AAA", &recent(), "a"))
            .with_prices(prices());
        let service = service(mock, ReferencePriceBook::new());

        let token = service.cache().generations().token();
        service.clear_cache(None).await;
        let err = service.rank_with_token(None, None, token).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Superseded));

        let ranking = service
            .rank_with_token(None, None, GenerationToken::detached())
            .await
            .unwrap();
        assert_eq!(ranking.top.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_reload() {
        let mock = MockDataSource::new()
            .with_set(set("AAA", &recent(), "a"))
            .with_prices(prices());
        let service = service(mock.clone(), ReferencePriceBook::new());

        service.value_set(&SetCode::from("AAA"), None).await.unwrap();
        let fetches = mock.fetch_count();
        service.clear_cache(Some(keys::VALUATION_PREFIX)).await;
        service.value_set(&SetCode::from("AAA"), None).await.unwrap();
        // Dataset documents stay cached; only the valuation is recomputed.
        assert_eq!(mock.fetch_count(), fetches);
        assert!(service
            .cache()
            .get::<Vec<ProductValuation>>("valuation:AAA:0")
            .await
            .is_some());
    }

    /// Serves set documents from a mock, but holds the first price fetch open
    /// until released. That fetch answers 1.0 for card `a`; later ones 9.0.
    #[derive(Debug)]
    struct HeldPrices {
        inner: MockDataSource,
        started: Arc<Notify>,
        release: Arc<Notify>,
        price_fetches: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for HeldPrices {
        async fn fetch_set_list(&self) -> Result<Vec<SetSummary>, DataSourceError> {
            self.inner.fetch_set_list().await
        }

        async fn fetch_set_detail(&self, code: &SetCode) -> Result<SetDetail, DataSourceError> {
            self.inner.fetch_set_detail(code).await
        }

        async fn fetch_prices(&self) -> Result<PriceTable, DataSourceError> {
            let json = if self.price_fetches.fetch_add(1, Ordering::SeqCst) == 0 {
                self.started.notify_one();
                self.release.notified().await;
                r#"{"a": {"paper": {"tcgplayer": {"retail": {"normal": {"2024-05-01": 1.0}}}}}}"#
            } else {
                r#"{"a": {"paper": {"tcgplayer": {"retail": {"normal": {"2024-05-01": 9.0}}}}}}"#
            };
            serde_json::from_str(json).map_err(|e| DataSourceError::ParseError(e.to_string()))
        }

        async fn fetch_meta(&self) -> Result<DatasetMeta, DataSourceError> {
            self.inner.fetch_meta().await
        }
    }

    #[tokio::test]
    async fn test_value_set_overlapping_clear_is_not_cached() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let source = HeldPrices {
            inner: MockDataSource::new().with_set(set("AAA", &recent(), "a")),
            started: started.clone(),
            release: release.clone(),
            price_fetches: AtomicUsize::new(0),
        };
        let cache = Arc::new(ValuationCache::memory_only());
        let loader = DatasetLoader::new(Arc::new(source), cache, Duration::from_secs(60));
        let settings = ServiceSettings::from_config(&Config::with_dataset_url("mock://"));
        let service = ValuationService::new(loader, Arc::new(ReferencePriceBook::new()), settings);

        let in_flight = tokio::spawn({
            let service = service.clone();
            async move { service.value_set(&SetCode::from("AAA"), None).await }
        });
        started.notified().await;
        service.clear_cache(None).await;
        release.notify_one();

        // The overlapping call still answers with what it loaded.
        let stale = in_flight.await.unwrap().unwrap();
        assert_eq!(stale[0].ev, d("2"));

        // Neither its prices nor its valuation survived the clear.
        let fresh = service.value_set(&SetCode::from("AAA"), None).await.unwrap();
        assert_eq!(fresh[0].ev, d("18"));
    }
}
