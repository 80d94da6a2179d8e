use anyhow::Context;
use sealed_ev::cache::PersistentStore;
use sealed_ev::datasource::load_reference_prices;
use sealed_ev::orchestration::{DatasetLoader, ServiceSettings, ValuationService};
use sealed_ev::{api, Config, DataSource, HttpDataSource, ReferencePriceBook, ValuationCache};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let port = config.port;

    // Persistent tier is optional; without a path the cache is memory-only.
    let store = match &config.cache_db_path {
        Some(path) => match PersistentStore::open(path).await {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "Cache store unavailable; using memory only"
                );
                None
            }
        },
        None => None,
    };
    let cache = Arc::new(ValuationCache::new(store, config.cache_max_entry_bytes));

    let references = match &config.reference_prices_file {
        Some(path) => load_reference_prices(path)
            .with_context(|| format!("loading reference prices from {}", path))?,
        None => ReferencePriceBook::new(),
    };

    let datasource: Arc<dyn DataSource> =
        Arc::new(HttpDataSource::new(config.dataset_url.clone()));
    let loader = DatasetLoader::new(datasource, cache, config.dataset_ttl);
    let service = Arc::new(ValuationService::new(
        loader,
        Arc::new(references),
        ServiceSettings::from_config(&config),
    ));

    let app = api::create_router(api::AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
