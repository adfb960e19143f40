//! Local card catalog used for name resolution without hitting the network.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::card::{CardRecord, normalize_name};
use crate::storage::write_json_atomic;

/// Days after which a catalog is reported as stale.
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 7;

/// Description of the bulk file a catalog was built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogMetadata {
    pub permalink: String,
    pub updated_at: String,
    pub compressed_size: u64,
    pub name: String,
}

/// How current a catalog is, judged by its local refresh timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Never refreshed; callers must refresh before searching.
    NeverUpdated,
    /// Older than the staleness window; usable, but the user should be prompted.
    Stale,
    Fresh,
}

/// Immutable snapshot of canonical card records.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    metadata: CatalogMetadata,
    records: Vec<CardRecord>,
    last_updated: Option<DateTime<Utc>>,
    by_name: HashMap<String, usize>,
    by_printing: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    metadata: CatalogMetadata,
    records: Vec<CardRecord>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct CatalogFileRef<'a> {
    metadata: &'a CatalogMetadata,
    records: &'a [CardRecord],
    last_updated: Option<DateTime<Utc>>,
}

impl CardCatalog {
    /// Empty catalog that has never been updated.
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_parts(
        metadata: CatalogMetadata,
        records: Vec<CardRecord>,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.printing_id.clone()) {
                unique.push(record);
            } else {
                debug!("dropping duplicate printing {}", record.printing_id);
            }
        }

        let mut by_name = HashMap::with_capacity(unique.len());
        let mut by_printing = HashMap::with_capacity(unique.len());
        for (idx, record) in unique.iter().enumerate() {
            by_name.entry(normalize_name(&record.name)).or_insert(idx);
            by_printing.insert(record.printing_id.clone(), idx);
        }

        Self {
            metadata,
            records: unique,
            last_updated,
            by_name,
            by_printing,
        }
    }

    /// Build a fresh snapshot from downloaded records. Nothing is merged from
    /// any previous catalog.
    pub fn refresh(metadata: CatalogMetadata, records: Vec<CardRecord>) -> Self {
        Self::refresh_at(metadata, records, Utc::now())
    }

    pub fn refresh_at(
        metadata: CatalogMetadata,
        records: Vec<CardRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        let catalog = Self::from_parts(metadata, records, Some(now));
        info!(
            "catalog refreshed from '{}' with {} printings",
            catalog.metadata.name,
            catalog.records.len()
        );
        catalog
    }

    /// Load the persisted catalog. Any failure yields an empty, never-updated
    /// catalog.
    pub fn load_from_storage(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(catalog) => {
                debug!(
                    "loaded {} printings from {}",
                    catalog.records.len(),
                    path.display()
                );
                catalog
            }
            Err(err) => {
                if path.exists() {
                    warn!("ignoring unreadable catalog: {err:#}");
                } else {
                    debug!("no catalog at {}", path.display());
                }
                Self::empty()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let file: CatalogFile = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        Ok(Self::from_parts(file.metadata, file.records, file.last_updated))
    }

    /// Persist the full record set. The previous file survives any failure.
    pub fn save_to_storage(&self, path: &Path) -> Result<()> {
        let file = CatalogFileRef {
            metadata: &self.metadata,
            records: &self.records,
            last_updated: self.last_updated,
        };
        write_json_atomic(path, &file)
            .with_context(|| format!("failed to save catalog to {}", path.display()))
    }

    /// Case-insensitive, whitespace-trimmed exact-name lookup.
    pub fn find_exact_card(&self, name: &str) -> Option<&CardRecord> {
        self.by_name
            .get(&normalize_name(name))
            .map(|&idx| &self.records[idx])
    }

    pub fn find_by_printing_id(&self, printing_id: &str) -> Option<&CardRecord> {
        self.by_printing
            .get(printing_id)
            .map(|&idx| &self.records[idx])
    }

    /// Every printing in the catalog sharing `oracle_id`, in catalog order.
    pub fn printings_of(&self, oracle_id: &str) -> Vec<CardRecord> {
        self.records
            .iter()
            .filter(|r| r.oracle_id == oracle_id)
            .cloned()
            .collect()
    }

    pub fn freshness(&self, now: DateTime<Utc>, stale_after_days: i64) -> Freshness {
        match self.last_updated {
            None => Freshness::NeverUpdated,
            Some(ts) if now - ts > Duration::days(stale_after_days) => Freshness::Stale,
            Some(_) => Freshness::Fresh,
        }
    }

    pub fn metadata(&self) -> &CatalogMetadata {
        &self.metadata
    }

    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
