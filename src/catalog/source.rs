//! Catalog collaborator abstraction
//!
//! The catalog (all chords and all songs) is owned by an external system. A
//! source knows how to fetch a full copy of it; the `CatalogCache` decides when.

use crate::{catalog::Catalog, error::AppResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch a complete, validated copy of the catalog
    async fn fetch_catalog(&self) -> AppResult<Catalog>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Serves a fixed in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    catalog: Catalog,
}

impl StaticCatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch_catalog(&self) -> AppResult<Catalog> {
        Ok(self.catalog.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
