use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::{
    catalog::{CatalogSnapshot, CatalogSource},
    error::{AppError, AppResult},
};

/// Default snapshot lifetime: 30 minutes
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
struct CacheEntry {
    snapshot: Arc<CatalogSnapshot>,
    loaded_at: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.invalidated && self.loaded_at.elapsed() < ttl
    }
}

/// Diagnostic view of the cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub populated: bool,
    pub stale: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub ttl_secs: u64,
    pub chords: usize,
    pub songs: usize,
}

/// Time-bounded catalog snapshot, refreshed from a `CatalogSource`
///
/// Snapshots are replaced wholesale, never patched. Concurrent readers that
/// find the snapshot expired share a single refresh. When a refresh fails the
/// previous snapshot, if any, keeps being served.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    refresh_lock: Mutex<()>,
    /// Bumped by every `invalidate`, under the `entry` write lock
    generation: AtomicU64,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entry: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_default_ttl(source: Arc<dyn CatalogSource>) -> Self {
        Self::new(source, DEFAULT_CATALOG_TTL)
    }

    /// Returns the current snapshot, refetching it first if it has expired
    pub async fn get_snapshot(&self) -> AppResult<Arc<CatalogSnapshot>> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            tracing::debug!("Catalog cache hit");
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock().await;

        // Someone else may have refreshed while we waited for the lock
        if let Some(snapshot) = self.fresh_snapshot().await {
            tracing::debug!("Catalog refreshed by concurrent caller");
            return Ok(snapshot);
        }

        tracing::debug!("Catalog cache miss");
        self.refresh_locked().await
    }

    /// Populates the cache ahead of the first request
    pub async fn warm(&self) -> AppResult<()> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await.map(|_| ())
    }

    /// Forces the next read to refetch; the old snapshot stays as a fallback
    ///
    /// A refresh already in flight may have read the catalog before the
    /// change, so its result is stored as invalidated too.
    pub async fn invalidate(&self) {
        let mut entry = self.entry.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(entry) = entry.as_mut() {
            entry.invalidated = true;
        }
        drop(entry);
        tracing::info!(source = self.source.name(), "Catalog cache invalidated");
    }

    pub async fn status(&self) -> CacheStatus {
        let entry = self.entry.read().await;
        match entry.as_ref() {
            Some(entry) => CacheStatus {
                populated: true,
                stale: !entry.is_fresh(self.ttl),
                fetched_at: Some(entry.snapshot.fetched_at()),
                age_secs: Some(entry.loaded_at.elapsed().as_secs()),
                ttl_secs: self.ttl.as_secs(),
                chords: entry.snapshot.chords().len(),
                songs: entry.snapshot.songs().len(),
            },
            None => CacheStatus {
                populated: false,
                stale: true,
                fetched_at: None,
                age_secs: None,
                ttl_secs: self.ttl.as_secs(),
                chords: 0,
                songs: 0,
            },
        }
    }

    async fn fresh_snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.snapshot.clone())
    }

    /// Fetches and stores a new snapshot. Caller must hold `refresh_lock`.
    async fn refresh_locked(&self) -> AppResult<Arc<CatalogSnapshot>> {
        let started = Instant::now();
        let generation = self.generation.load(Ordering::SeqCst);

        match self.source.fetch_catalog().await {
            Ok(catalog) => {
                let snapshot = Arc::new(CatalogSnapshot::new(catalog));

                let mut entry = self.entry.write().await;
                let invalidated = self.generation.load(Ordering::SeqCst) != generation;
                *entry = Some(CacheEntry {
                    snapshot: snapshot.clone(),
                    loaded_at: Instant::now(),
                    invalidated,
                });
                drop(entry);

                if invalidated {
                    tracing::info!(
                        source = self.source.name(),
                        "Catalog invalidated during refresh, next read refetches"
                    );
                }

                tracing::info!(
                    source = self.source.name(),
                    chords = snapshot.chords().len(),
                    songs = snapshot.songs().len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Catalog snapshot refreshed"
                );

                Ok(snapshot)
            }
            Err(e) => {
                let stale = self
                    .entry
                    .read()
                    .await
                    .as_ref()
                    .map(|entry| entry.snapshot.clone());

                match stale {
                    Some(snapshot) => {
                        tracing::warn!(
                            source = self.source.name(),
                            error = %e,
                            fetched_at = %snapshot.fetched_at(),
                            "Catalog refresh failed, serving stale snapshot"
                        );
                        Ok(snapshot)
                    }
                    None => {
                        tracing::error!(
                            source = self.source.name(),
                            error = %e,
                            "Catalog refresh failed and no snapshot is cached"
                        );
                        Err(AppError::CatalogUnavailable(format!(
                            "{} catalog: {}",
                            self.source.name(),
                            e
                        )))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, MockCatalogSource};
    use crate::models::Song;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(60);

    fn catalog(songs: &[&str]) -> Catalog {
        Catalog::from_payload(crate::catalog::CatalogPayload {
            chords: vec![],
            songs: songs.iter().map(|id| Song::new(*id, ["C", "G"])).collect(),
        })
    }

    fn mock_source(fetches: usize) -> MockCatalogSource {
        let mut source = MockCatalogSource::new();
        source
            .expect_fetch_catalog()
            .times(fetches)
            .returning(|| Ok(catalog(&["song-a"])));
        source.expect_name().return_const("mock");
        source
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_is_reused_within_ttl() {
        let cache = CatalogCache::new(Arc::new(mock_source(1)), TTL);

        let first = cache.get_snapshot().await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = cache.get_snapshot().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_is_refetched_after_ttl() {
        let cache = CatalogCache::new(Arc::new(mock_source(2)), TTL);

        let first = cache.get_snapshot().await.unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        let second = cache.get_snapshot().await.unwrap();
        let third = cache.get_snapshot().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
    }

    #[tokio::test]
    async fn test_warm_populates_cache() {
        let cache = CatalogCache::new(Arc::new(mock_source(1)), TTL);

        assert!(!cache.status().await.populated);
        cache.warm().await.unwrap();

        let status = cache.status().await;
        assert!(status.populated);
        assert!(!status.stale);
        assert_eq!(status.songs, 1);

        // Served from the warmed snapshot, no second fetch
        cache.get_snapshot().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = CatalogCache::new(Arc::new(mock_source(2)), TTL);

        cache.get_snapshot().await.unwrap();
        cache.invalidate().await;
        assert!(cache.status().await.stale);

        cache.get_snapshot().await.unwrap();
        assert!(!cache.status().await.stale);
    }

    #[tokio::test]
    async fn test_failure_without_snapshot_is_catalog_unavailable() {
        let mut source = MockCatalogSource::new();
        source
            .expect_fetch_catalog()
            .times(1)
            .returning(|| Err(AppError::ExternalApi("boom".to_string())));
        source.expect_name().return_const("mock");

        let cache = CatalogCache::new(Arc::new(source), TTL);
        let err = cache.get_snapshot().await.unwrap_err();

        assert!(matches!(err, AppError::CatalogUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_with_stale_snapshot_serves_stale() {
        let mut source = MockCatalogSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_catalog()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(catalog(&["song-a", "song-b"])));
        source
            .expect_fetch_catalog()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(AppError::ExternalApi("boom".to_string())));
        source.expect_name().return_const("mock");

        let cache = CatalogCache::new(Arc::new(source), TTL);
        let first = cache.get_snapshot().await.unwrap();

        tokio::time::advance(TTL * 2).await;
        let second = cache.get_snapshot().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.songs().len(), 2);
    }

    /// Counts fetches and takes a while to answer. Each fetch returns one
    /// more song than the last, so callers can tell versions apart.
    struct SlowSource {
        fetches: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogSource for SlowSource {
        async fn fetch_catalog(&self) -> AppResult<Catalog> {
            let version = self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            let ids: Vec<String> = (0..=version).map(|i| format!("song-{}", i)).collect();
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            Ok(catalog(&ids))
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_refresh() {
        let source = Arc::new(SlowSource {
            fetches: AtomicUsize::new(0),
        });
        let cache = Arc::new(CatalogCache::new(source.clone(), TTL));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move { cache.get_snapshot().await }));
        }

        let mut snapshots = Vec::new();
        for task in tasks {
            snapshots.push(task.await.unwrap().unwrap());
        }

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_refresh_is_not_lost() {
        let source = Arc::new(SlowSource {
            fetches: AtomicUsize::new(0),
        });
        let cache = Arc::new(CatalogCache::new(source.clone(), TTL));

        let refreshing = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_snapshot().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        cache.invalidate().await;

        let first = refreshing.await.unwrap().unwrap();
        assert_eq!(first.songs().len(), 1);
        assert!(cache.status().await.stale);

        let second = cache.get_snapshot().await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(second.songs().len(), 2);
    }
}
