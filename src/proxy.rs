//! Application context: owns the catalog, preferences, image cache and card
//! service, and drives a decklist through to a finished document.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use image::{DynamicImage, RgbaImage};
use log::{debug, error, info, warn};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, Semaphore};
use tokio::task::JoinSet;

use crate::card::CardRecord;
use crate::catalog::{CardCatalog, Freshness};
use crate::config::Settings;
use crate::image_cache::ImageCache;
use crate::layout::{CancelFlag, Document, LayoutEngine};
use crate::preferences::ArtworkPreferences;
use crate::print_job::{PrintItem, ResolvedEntry, expand_print_items};
use crate::remote::{CardService, ScryfallClient};
use crate::search_line::{MAX_QUANTITY, SearchLine, parse_decklist};
use crate::storage::StoragePaths;

/// Receives user-facing status messages.
pub trait Reporter: Send + Sync {
    fn status(&self, message: &str);
}

/// Sends status messages to the `info` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn status(&self, message: &str) {
        info!("{message}");
    }
}

/// A recorded preference with the record it points at, when known locally.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceEntry {
    pub oracle_id: String,
    pub printing_id: String,
    pub card: Option<CardRecord>,
}

pub struct ProxyContext {
    service: Arc<dyn CardService>,
    catalog: RwLock<CardCatalog>,
    preferences: Mutex<ArtworkPreferences>,
    images: Arc<ImageCache>,
    paths: StoragePaths,
    settings: Settings,
    reporter: Arc<dyn Reporter>,
}

impl ProxyContext {
    /// Context backed by the live Scryfall API.
    pub fn open(paths: StoragePaths, settings: Settings) -> Result<Self> {
        let client = ScryfallClient::new(settings.request_timeout())
            .context("failed to build HTTP client")?;
        Ok(Self::load(Arc::new(client), paths, settings))
    }

    /// Context over `service`, with catalog and preferences read from `paths`.
    pub fn load(service: Arc<dyn CardService>, paths: StoragePaths, settings: Settings) -> Self {
        let catalog = CardCatalog::load_from_storage(&paths.catalog_file());
        let preferences = ArtworkPreferences::load_from_storage(&paths.preferences_file());
        debug!(
            "loaded {} catalog records and {} preferences",
            catalog.len(),
            preferences.len()
        );
        let images = ImageCache::with_bound(Arc::clone(&service), settings.image_cache_bound);
        Self {
            service,
            catalog: RwLock::new(catalog),
            preferences: Mutex::new(preferences),
            images: Arc::new(images),
            paths,
            settings,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub async fn catalog(&self) -> RwLockReadGuard<'_, CardCatalog> {
        self.catalog.read().await
    }

    pub async fn freshness(&self) -> Freshness {
        self.catalog
            .read()
            .await
            .freshness(Utc::now(), self.settings.stale_after_days)
    }

    /// Download a new catalog snapshot and swap it in.
    ///
    /// Returns `false` when the current catalog is fresh and `force` is off.
    /// The stored catalog is only replaced after a complete download.
    pub async fn refresh_catalog(&self, force: bool) -> Result<bool> {
        if !force && self.freshness().await == Freshness::Fresh {
            self.reporter.status("catalog is up to date");
            return Ok(false);
        }

        let metadata = self
            .service
            .bulk_catalog_metadata()
            .await
            .ok_or_else(|| anyhow!("could not fetch the bulk catalog description"))?;
        self.reporter.status(&format!(
            "downloading {} ({} bytes, updated {})",
            metadata.name, metadata.compressed_size, metadata.updated_at
        ));

        let limit = self.settings.request_timeout();
        let records = tokio::time::timeout(
            limit,
            self.service.download_bulk_catalog(&metadata.permalink),
        )
        .await
        .map_err(|_| anyhow!("catalog download timed out after {}s", limit.as_secs()))?;
        if records.is_empty() {
            bail!("catalog download returned no cards");
        }

        let refreshed = CardCatalog::refresh(metadata, records);
        if let Err(err) = refreshed.save_to_storage(&self.paths.catalog_file()) {
            error!("{err:#}");
        }
        let count = refreshed.len();
        *self.catalog.write().await = refreshed;
        self.reporter
            .status(&format!("catalog refreshed with {count} cards"));
        Ok(true)
    }

    /// Refresh a catalog that has never been downloaded and nag about a stale one.
    pub async fn prepare_catalog(&self) -> Result<()> {
        match self.freshness().await {
            Freshness::NeverUpdated => {
                self.reporter
                    .status("no local catalog yet; downloading one first");
                self.refresh_catalog(true).await.map(|_| ())
            }
            Freshness::Stale => {
                self.reporter.status(&format!(
                    "the local catalog is more than {} days old; run `proxysheet catalog refresh`",
                    self.settings.stale_after_days
                ));
                Ok(())
            }
            Freshness::Fresh => Ok(()),
        }
    }

    /// Exact catalog match, else the remote fuzzy search.
    pub async fn find_card(&self, name: &str) -> Option<CardRecord> {
        if let Some(card) = self.catalog.read().await.find_exact_card(name) {
            return Some(card.clone());
        }
        debug!("'{name}' not in catalog; trying fuzzy search");
        self.service.fuzzy_find_card(name).await
    }

    /// Every printing of `card`'s oracle id. The local catalog stands in when
    /// the service has none. Results become resolvable as preferences.
    pub async fn printings(&self, card: &CardRecord) -> Vec<CardRecord> {
        let mut printings = self.service.list_all_printings(&card.oracle_id).await;
        if printings.is_empty() {
            printings = self.catalog.read().await.printings_of(&card.oracle_id);
        }
        self.preferences.lock().await.remember(&printings);
        printings
    }

    /// The printing to use for `card`, recording `card` if it is the first seen.
    pub async fn preferred(&self, card: &CardRecord) -> CardRecord {
        let resolvable = {
            let catalog = self.catalog.read().await;
            self.preferences
                .lock()
                .await
                .is_resolvable(&card.oracle_id, &catalog)
        };
        if !resolvable {
            self.printings(card).await;
        }

        let catalog = self.catalog.read().await;
        let mut preferences = self.preferences.lock().await;
        match preferences.get_preferred(Some(card), &catalog) {
            Ok(preferred) => preferred,
            Err(err) => {
                warn!("{err}");
                card.clone()
            }
        }
    }

    pub async fn resolve_line(&self, line: &SearchLine) -> ResolvedEntry {
        if line.quantity > MAX_QUANTITY {
            self.reporter.status(&format!(
                "'{}' asks for {} copies; printing {MAX_QUANTITY}",
                line.term, line.quantity
            ));
        }
        let card = match self.find_card(&line.term).await {
            Some(found) => Some(self.preferred(&found).await),
            None => {
                self.reporter
                    .status(&format!("no results for '{}'", line.term));
                None
            }
        };
        ResolvedEntry {
            line: line.clone(),
            card,
        }
    }

    /// Resolve every line of a decklist, in order.
    pub async fn resolve_decklist(&self, text: &str) -> Vec<ResolvedEntry> {
        let lines = parse_decklist(text);
        let mut entries = Vec::with_capacity(lines.len());
        for line in &lines {
            entries.push(self.resolve_line(line).await);
        }
        entries
    }

    /// Make `card` the preferred printing of its oracle id and persist the map.
    pub async fn update_preferred(&self, card: &CardRecord) {
        self.preferences.lock().await.update_preferred(card);
        self.save_preferences().await;
    }

    /// Pick the printing of `name` from `set` (and `collector_number`, if given)
    /// and make it the preference.
    pub async fn choose_printing(
        &self,
        name: &str,
        set: &str,
        collector_number: Option<&str>,
    ) -> Result<CardRecord> {
        let card = self
            .find_card(name)
            .await
            .ok_or_else(|| anyhow!("no results for '{name}'"))?;
        let chosen = self
            .printings(&card)
            .await
            .into_iter()
            .chain(std::iter::once(card.clone()))
            .find(|p| {
                p.set.eq_ignore_ascii_case(set)
                    && collector_number.is_none_or(|n| p.collector_number == n)
            })
            .ok_or_else(|| match collector_number {
                Some(n) => anyhow!("no printing of {} in set {set} numbered {n}", card.name),
                None => anyhow!("no printing of {} in set {set}", card.name),
            })?;
        self.update_preferred(&chosen).await;
        Ok(chosen)
    }

    /// Forget the preference for `name`. Returns the removed printing id.
    pub async fn clear_preference(&self, name: &str) -> Result<Option<String>> {
        let card = self
            .find_card(name)
            .await
            .ok_or_else(|| anyhow!("no results for '{name}'"))?;
        let removed = self.preferences.lock().await.clear(&card.oracle_id);
        if removed.is_some() {
            self.save_preferences().await;
        }
        Ok(removed)
    }

    pub async fn preference_entries(&self) -> Vec<PreferenceEntry> {
        let catalog = self.catalog.read().await;
        let preferences = self.preferences.lock().await;
        preferences
            .iter()
            .map(|(oracle_id, printing_id)| PreferenceEntry {
                oracle_id: oracle_id.to_string(),
                printing_id: printing_id.to_string(),
                card: catalog.find_by_printing_id(printing_id).cloned(),
            })
            .collect()
    }

    /// Persist preferences; failures are logged, never returned.
    pub async fn save_preferences(&self) {
        let preferences = self.preferences.lock().await;
        if let Err(err) = preferences.save_to_storage(&self.paths.preferences_file()) {
            error!("{err:#}");
        }
    }

    /// Fetch artwork for `entries` and lay it out.
    ///
    /// The layout configuration is checked before any image is fetched.
    /// Images that cannot be loaded are reported and left out. When
    /// `time_limit` elapses or `cancel` is raised, no document is returned.
    pub async fn build_document(
        &self,
        entries: &[ResolvedEntry],
        cancel: CancelFlag,
        time_limit: Option<Duration>,
    ) -> Result<Document> {
        let build = self.build_document_inner(entries, cancel.clone());
        let Some(limit) = time_limit else {
            return build.await;
        };
        match tokio::time::timeout(limit, build).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                bail!("document build timed out after {}s", limit.as_secs())
            }
        }
    }

    async fn build_document_inner(
        &self,
        entries: &[ResolvedEntry],
        cancel: CancelFlag,
    ) -> Result<Document> {
        let config = self.settings.layout_config()?;
        let engine = LayoutEngine::new(&config)?.with_cancel_flag(cancel.clone());

        let items = expand_print_items(entries, self.settings.two_sided);
        if items.is_empty() {
            bail!("nothing to print: no decklist entry was resolved");
        }

        let fetched = self.fetch_images(&items, &cancel).await?;
        // On duplex sheets a face that failed to load keeps its slot, blank.
        let two_sided = self.settings.two_sided;
        let blank = Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(1, 1)));
        let mut images = Vec::with_capacity(fetched.len());
        let mut loaded = 0usize;
        for (item, image) in items.iter().zip(fetched) {
            match image {
                Some(image) => {
                    loaded += 1;
                    images.push(image);
                }
                None if two_sided => {
                    self.reporter.status(&format!(
                        "could not load {} artwork for {}; leaving its slot blank",
                        item.face, item.name
                    ));
                    images.push(Arc::clone(&blank));
                }
                None => self
                    .reporter
                    .status(&format!("could not load artwork for {}", item.name)),
            }
        }
        if loaded == 0 {
            bail!("no artwork could be loaded");
        }

        info!("laying out {} images", images.len());
        let document = tokio::task::spawn_blocking(move || {
            let mut engine = engine;
            for image in &images {
                engine.place(image)?;
            }
            engine.finish()
        })
        .await
        .context("layout task failed")??;
        Ok(document)
    }

    /// Bitmaps for `items`, in the same order, with at most
    /// `fetch_concurrency` downloads in flight.
    async fn fetch_images(
        &self,
        items: &[PrintItem],
        cancel: &CancelFlag,
    ) -> Result<Vec<Option<Arc<DynamicImage>>>> {
        let permits = Arc::new(Semaphore::new(self.settings.fetch_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (idx, item) in items.iter().enumerate() {
            let permits = Arc::clone(&permits);
            let images = Arc::clone(&self.images);
            let cancel = cancel.clone();
            let locator = item.locator.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                if cancel.is_cancelled() {
                    return None;
                }
                let image = match images.get_image(&locator).await {
                    Ok(image) => image,
                    Err(err) => {
                        warn!("{err}: {locator:?}");
                        None
                    }
                };
                image.map(|image| (idx, image))
            });
        }

        let mut slots: Vec<Option<Arc<DynamicImage>>> = vec![None; items.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Some((idx, image)) = joined.context("image fetch task failed")? {
                slots[idx] = Some(image);
            }
        }
        if cancel.is_cancelled() {
            bail!("document build was cancelled");
        }
        Ok(slots)
    }

    /// Release cached artwork and persist preferences.
    pub async fn shutdown(&self) {
        self.images.clear();
        self.save_preferences().await;
    }
}
