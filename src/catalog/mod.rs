pub mod cache;
pub mod file;
pub mod http;
pub mod snapshot;
pub mod source;

pub use cache::{CacheStatus, CatalogCache, DEFAULT_CATALOG_TTL};
pub use file::JsonFileCatalogSource;
pub use http::HttpCatalogSource;
pub use snapshot::{Catalog, CatalogDocument, CatalogPayload, CatalogSnapshot};
#[cfg(test)]
pub use source::MockCatalogSource;
pub use source::{CatalogSource, StaticCatalogSource};
