use reqwest::Client as HttpClient;

use crate::{
    catalog::{Catalog, CatalogDocument, CatalogSource},
    error::{AppError, AppResult},
};

/// Fetches the catalog from a remote catalog service
///
/// API Flow:
/// 1. `GET {base_url}/catalog` → `{ "chords": [...], "songs": [...] }`
///
/// Timeouts and retries belong to the caller's `reqwest::Client`.
#[derive(Clone)]
pub struct HttpCatalogSource {
    http_client: HttpClient,
    base_url: String,
}

impl HttpCatalogSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(HttpClient::new(), base_url)
    }

    pub fn with_client(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    fn catalog_url(&self) -> String {
        format!("{}/catalog", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_catalog(&self) -> AppResult<Catalog> {
        let url = self.catalog_url();
        tracing::debug!(url = %url, "Fetching catalog from remote service");

        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                url = %url,
                status = %status,
                body = %body,
                "Catalog service request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Catalog service returned status {}: {}",
                status, body
            )));
        }

        let document: CatalogDocument = response.json().await?;
        let catalog = Catalog::from(document);

        tracing::info!(
            chords = catalog.chords.len(),
            songs = catalog.songs.len(),
            source = "http",
            "Catalog fetched"
        );

        Ok(catalog)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
