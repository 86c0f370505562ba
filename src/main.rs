use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chord_recommender::{
    api::{create_router, AppState},
    catalog::{CatalogCache, CatalogSource, HttpCatalogSource, JsonFileCatalogSource},
    config::Config,
    services::Recommender,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chord_recommender=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let source: Arc<dyn CatalogSource> = match (&config.catalog_url, &config.catalog_path) {
        (Some(url), _) => Arc::new(HttpCatalogSource::new(url.clone())),
        (None, Some(path)) => Arc::new(JsonFileCatalogSource::new(path.clone())),
        (None, None) => anyhow::bail!("No catalog source configured"),
    };
    tracing::info!(
        source = source.name(),
        ttl_secs = config.catalog_ttl_secs,
        "Catalog source configured"
    );

    let cache = Arc::new(CatalogCache::new(source, config.catalog_ttl()));
    // Startup continues without a catalog; the first request retries the fetch
    if let Err(e) = cache.warm().await {
        tracing::warn!(error = %e, "Catalog warm-up failed");
    }

    let recommender = Recommender::new(cache)
        .with_known_chord_policy(config.known_chord_policy)
        .with_unreachable_member_policy(config.unreachable_member_policy);
    let state = AppState::new(Arc::new(recommender), config.default_page_size);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
