//! Response shapes of the Scryfall REST API.
//!
//! Every field the API may omit is optional so a single odd object never
//! poisons a whole page or bulk file.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::card::{CardRecord, FaceImages, Prices};
use crate::catalog::CatalogMetadata;

#[derive(Debug, Deserialize)]
pub(crate) struct CardList {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub data: Vec<ScryfallCard>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkData {
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub download_uri: String,
}

impl From<BulkData> for CatalogMetadata {
    fn from(value: BulkData) -> Self {
        CatalogMetadata {
            permalink: value.download_uri,
            updated_at: value.updated_at,
            compressed_size: value.size,
            name: value.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImageUris {
    pub png: Option<String>,
    pub large: Option<String>,
    pub normal: Option<String>,
    pub small: Option<String>,
}

impl ImageUris {
    /// Highest resolution locator available.
    fn best(&self) -> Option<&str> {
        self.png
            .as_deref()
            .or(self.large.as_deref())
            .or(self.normal.as_deref())
            .or(self.small.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CardFace {
    #[serde(default)]
    pub oracle_id: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePrices {
    pub usd: Option<String>,
    pub usd_foil: Option<String>,
    pub eur: Option<String>,
    pub tix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScryfallCard {
    pub id: String,
    #[serde(default)]
    pub oracle_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub legalities: BTreeMap<String, String>,
    #[serde(default)]
    pub prices: Option<WirePrices>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
}

impl ScryfallCard {
    /// Convert to a printable record. Cards without any image are dropped.
    pub fn into_record(self) -> Option<CardRecord> {
        let faces = self.card_faces.unwrap_or_default();

        let images = match self.image_uris.as_ref().and_then(ImageUris::best) {
            Some(front) => FaceImages::single(front),
            None => {
                let mut face_images = faces
                    .iter()
                    .filter_map(|f| f.image_uris.as_ref().and_then(ImageUris::best));
                let front = face_images.next()?;
                match face_images.next() {
                    Some(back) => FaceImages::double(front, back),
                    None => FaceImages::single(front),
                }
            }
        };

        let oracle_id = self
            .oracle_id
            .or_else(|| faces.iter().find_map(|f| f.oracle_id.clone()))?;

        let prices = self
            .prices
            .map(|p| Prices {
                usd: p.usd,
                usd_foil: p.usd_foil,
                eur: p.eur,
                tix: p.tix,
            })
            .unwrap_or_default();

        Some(CardRecord {
            printing_id: self.id,
            oracle_id,
            name: self.name,
            set: self.set,
            set_name: self.set_name,
            collector_number: self.collector_number,
            lang: self.lang,
            legalities: self.legalities,
            prices,
            images,
            is_token: matches!(self.layout.as_str(), "token" | "double_faced_token" | "emblem"),
        })
    }
}
