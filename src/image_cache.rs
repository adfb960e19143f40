//! Bounded cache of decoded card images with single-flight fetching.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use image::DynamicImage;
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::remote::CardService;

/// Entry count kept before the oldest insert is evicted.
pub const DEFAULT_CACHE_BOUND: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("image locator must not be empty")]
    EmptyLocator,
}

type Fetch = Arc<OnceCell<Option<Arc<DynamicImage>>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Arc<DynamicImage>>,
    order: VecDeque<String>,
    in_flight: HashMap<String, Fetch>,
}

/// Maps image locators to decoded bitmaps.
///
/// Eviction is first-in first-out: reading an entry does not protect it.
/// Concurrent requests for the same locator share a single download.
pub struct ImageCache {
    service: Arc<dyn CardService>,
    bound: usize,
    state: Mutex<CacheState>,
}

impl ImageCache {
    pub fn new(service: Arc<dyn CardService>) -> Self {
        Self::with_bound(service, DEFAULT_CACHE_BOUND)
    }

    pub fn with_bound(service: Arc<dyn CardService>, bound: usize) -> Self {
        Self {
            service,
            bound: bound.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // The state is consistent after every critical section, so a panic
        // elsewhere does not invalidate it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached bitmap for `locator`, downloading it on a miss.
    ///
    /// `Ok(None)` means the download or decode failed; nothing is cached in
    /// that case and a later call tries again.
    pub async fn get_image(&self, locator: &str) -> Result<Option<Arc<DynamicImage>>, CacheError> {
        if locator.trim().is_empty() {
            return Err(CacheError::EmptyLocator);
        }

        let fetch = {
            let mut state = self.state();
            if let Some(hit) = state.entries.get(locator) {
                return Ok(Some(Arc::clone(hit)));
            }
            Arc::clone(
                state
                    .in_flight
                    .entry(locator.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let image = fetch
            .get_or_init(|| self.fetch(locator))
            .await
            .clone();

        let mut state = self.state();
        let owner = state
            .in_flight
            .get(locator)
            .is_some_and(|current| Arc::ptr_eq(current, &fetch));
        if owner {
            state.in_flight.remove(locator);
            if let Some(image) = &image {
                self.insert(&mut state, locator, Arc::clone(image));
            }
        }
        Ok(image)
    }

    async fn fetch(&self, locator: &str) -> Option<Arc<DynamicImage>> {
        debug!("fetching image {locator}");
        let bytes = self.service.download_image(locator).await?;
        match image::load_from_memory(&bytes) {
            Ok(decoded) => Some(Arc::new(decoded)),
            Err(err) => {
                warn!("could not decode image {locator}: {err}");
                None
            }
        }
    }

    fn insert(&self, state: &mut CacheState, locator: &str, image: Arc<DynamicImage>) {
        if state.entries.insert(locator.to_string(), image).is_none() {
            state.order.push_back(locator.to_string());
        }
        if state.entries.len() > self.bound {
            if let Some(oldest) = state.order.pop_front() {
                debug!("evicting image {oldest}");
                state.entries.remove(&oldest);
            }
        }
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.state().entries.contains_key(locator)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Drop every cached bitmap.
    pub fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardRecord;
    use crate::catalog::CatalogMetadata;
    use async_trait::async_trait;
    use bytes::Bytes;
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingService {
        calls: AtomicUsize,
        delay: Duration,
        png: Bytes,
    }

    impl CountingService {
        fn new(delay: Duration) -> Arc<Self> {
            let mut png = Vec::new();
            RgbaImage::from_pixel(2, 3, Rgba([10, 20, 30, 255]))
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .unwrap();
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                png: Bytes::from(png),
            })
        }
    }

    #[async_trait]
    impl CardService for CountingService {
        async fn fuzzy_find_card(&self, _name: &str) -> Option<CardRecord> {
            None
        }
        async fn list_all_printings(&self, _oracle_id: &str) -> Vec<CardRecord> {
            Vec::new()
        }
        async fn bulk_catalog_metadata(&self) -> Option<CatalogMetadata> {
            None
        }
        async fn download_bulk_catalog(&self, _uri: &str) -> Vec<CardRecord> {
            Vec::new()
        }
        async fn download_image(&self, locator: &str) -> Option<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if locator.contains("missing") {
                None
            } else if locator.contains("garbage") {
                Some(Bytes::from_static(b"not an image"))
            } else {
                Some(self.png.clone())
            }
        }
    }

    #[tokio::test]
    async fn empty_locator_is_rejected() {
        let cache = ImageCache::new(CountingService::new(Duration::ZERO));
        assert_eq!(cache.get_image("").await.unwrap_err(), CacheError::EmptyLocator);
        assert_eq!(cache.get_image("   ").await.unwrap_err(), CacheError::EmptyLocator);
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let service = CountingService::new(Duration::ZERO);
        let cache = ImageCache::new(service.clone());
        let first = cache.get_image("https://img/a.png").await.unwrap().unwrap();
        let second = cache.get_image("https://img/a.png").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.width(), 2);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetches_are_not_cached() {
        let service = CountingService::new(Duration::ZERO);
        let cache = ImageCache::new(service.clone());
        assert!(cache.get_image("https://img/missing").await.unwrap().is_none());
        assert!(cache.get_image("https://img/garbage").await.unwrap().is_none());
        assert!(cache.get_image("https://img/missing").await.unwrap().is_none());
        assert!(cache.is_empty());
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn oldest_inserts_are_evicted_first() {
        let bound = 5;
        let extra = 3;
        let cache = ImageCache::with_bound(CountingService::new(Duration::ZERO), bound);
        let locators: Vec<String> = (0..bound + extra).map(|i| format!("https://img/{i}")).collect();
        for (i, locator) in locators.iter().enumerate() {
            cache.get_image(locator).await.unwrap();
            // Re-reading the first entry must not protect it.
            if i > 0 && cache.contains(&locators[0]) {
                cache.get_image(&locators[0]).await.unwrap();
            }
            assert!(cache.len() <= bound);
        }
        assert_eq!(cache.len(), bound);
        for locator in &locators[..extra] {
            assert!(!cache.contains(locator), "{locator} should be evicted");
        }
        for locator in &locators[extra..] {
            assert!(cache.contains(locator), "{locator} should be cached");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_fetch() {
        let service = CountingService::new(Duration::from_millis(50));
        let cache = Arc::new(ImageCache::new(service.clone()));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move { cache.get_image("https://img/shared.png").await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().unwrap().is_some());
        }
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn clear_releases_everything() {
        let cache = ImageCache::new(CountingService::new(Duration::ZERO));
        cache.get_image("https://img/a").await.unwrap();
        cache.get_image("https://img/b").await.unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("https://img/a"));
    }
}
