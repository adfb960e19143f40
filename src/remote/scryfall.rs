use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info, warn};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::CardService;
use super::wire::{BulkData, CardList, ScryfallCard};
use crate::card::CardRecord;
use crate::catalog::CatalogMetadata;

const API_BASE: &str = "https://api.scryfall.com";
const USER_AGENT: &str = concat!("proxysheet/", env!("CARGO_PKG_VERSION"));
/// Scryfall asks clients to leave 50-100 ms between API requests.
const API_SPACING: Duration = Duration::from_millis(100);
/// Upper bound on followed result pages, in case `next_page` ever loops.
const MAX_PAGES: usize = 64;

/// [`CardService`] backed by the public Scryfall API.
pub struct ScryfallClient {
    http: Client,
    base: String,
    last_request: Mutex<Option<Instant>>,
}

impl ScryfallClient {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Self::with_base_url(API_BASE, timeout)
    }

    pub fn with_base_url<S: Into<String>>(base: S, timeout: Duration) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json;q=0.9,*/*;q=0.8"));
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            last_request: Mutex::new(None),
        })
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < API_SPACING {
                tokio::time::sleep(API_SPACING - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET a JSON document. `Ok(None)` means the API answered 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> reqwest::Result<Option<T>> {
        self.throttle().await;
        let response = self.http.get(url).query(query).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.error_for_status()?.json::<T>().await?;
        Ok(Some(body))
    }
}

#[async_trait]
impl CardService for ScryfallClient {
    async fn fuzzy_find_card(&self, name: &str) -> Option<CardRecord> {
        let url = format!("{}/cards/named", self.base);
        match self
            .get_json::<ScryfallCard>(&url, &[("fuzzy", name)])
            .await
        {
            Ok(Some(card)) => card.into_record(),
            Ok(None) => {
                debug!("no fuzzy match for '{name}'");
                None
            }
            Err(err) => {
                warn!("fuzzy search for '{name}' failed: {err}");
                None
            }
        }
    }

    async fn list_all_printings(&self, oracle_id: &str) -> Vec<CardRecord> {
        let query = format!("oracleid:{oracle_id}");
        let first = format!("{}/cards/search", self.base);
        let mut printings = Vec::new();

        let mut page = match self
            .get_json::<CardList>(
                &first,
                &[
                    ("order", "released"),
                    ("unique", "prints"),
                    ("include_extras", "true"),
                    ("q", query.as_str()),
                ],
            )
            .await
        {
            Ok(Some(page)) => page,
            Ok(None) => return printings,
            Err(err) => {
                warn!("listing printings of {oracle_id} failed: {err}");
                return printings;
            }
        };

        for _ in 0..MAX_PAGES {
            printings.extend(page.data.into_iter().filter_map(ScryfallCard::into_record));
            let next = match (page.has_more, page.next_page) {
                (true, Some(next)) => next,
                _ => break,
            };
            page = match self.get_json::<CardList>(&next, &[]).await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(err) => {
                    warn!("following printings page for {oracle_id} failed: {err}");
                    break;
                }
            };
        }

        debug!("{} printings for {oracle_id}", printings.len());
        printings
    }

    async fn bulk_catalog_metadata(&self) -> Option<CatalogMetadata> {
        let url = format!("{}/bulk-data/default-cards", self.base);
        match self.get_json::<BulkData>(&url, &[]).await {
            Ok(Some(bulk)) => Some(bulk.into()),
            Ok(None) => {
                warn!("bulk data descriptor not found");
                None
            }
            Err(err) => {
                warn!("fetching bulk data descriptor failed: {err}");
                None
            }
        }
    }

    async fn download_bulk_catalog(&self, uri: &str) -> Vec<CardRecord> {
        info!("downloading bulk catalog from {uri}");
        match self.get_json::<Vec<ScryfallCard>>(uri, &[]).await {
            Ok(Some(cards)) => cards
                .into_iter()
                .filter_map(ScryfallCard::into_record)
                .collect(),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("bulk catalog download failed: {err}");
                Vec::new()
            }
        }
    }

    async fn download_image(&self, locator: &str) -> Option<Bytes> {
        let response = match self.http.get(locator).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("image request {locator} failed: {err}");
                return None;
            }
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(err) => {
                warn!("image {locator} unavailable: {err}");
                return None;
            }
        };
        match response.bytes().await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("reading image {locator} failed: {err}");
                None
            }
        }
    }
}
