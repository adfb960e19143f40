//! Remote card database access.

mod scryfall;
mod wire;

pub use scryfall::ScryfallClient;

use async_trait::async_trait;
use bytes::Bytes;

use crate::card::CardRecord;
use crate::catalog::CatalogMetadata;

/// Network-backed card database.
///
/// Every call fails soft: transport or decoding problems are logged by the
/// implementation and surface as `None` or an empty list.
#[async_trait]
pub trait CardService: Send + Sync {
    /// Best match for a loosely typed name.
    async fn fuzzy_find_card(&self, name: &str) -> Option<CardRecord>;

    /// Every printing sharing `oracle_id`, across all result pages.
    async fn list_all_printings(&self, oracle_id: &str) -> Vec<CardRecord>;

    /// Description of the current bulk card file.
    async fn bulk_catalog_metadata(&self) -> Option<CatalogMetadata>;

    /// Download and decode the bulk card file at `uri`.
    async fn download_bulk_catalog(&self, uri: &str) -> Vec<CardRecord>;

    /// Raw encoded image bytes for `locator`.
    async fn download_image(&self, locator: &str) -> Option<Bytes>;
}
