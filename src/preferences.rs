//! Remembers which printing of a card the user wants to print.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use thiserror::Error;

use crate::card::CardRecord;
use crate::catalog::CardCatalog;
use crate::storage::write_json_atomic;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("a card is required to resolve a preferred printing")]
    MissingCard,
}

/// Mapping from oracle id to the preferred printing id.
///
/// Records seen during the session are kept alongside the mapping so a
/// preferred printing can be handed back without another lookup. Only the
/// id mapping is persisted.
#[derive(Debug, Clone, Default)]
pub struct ArtworkPreferences {
    preferred: BTreeMap<String, String>,
    known: HashMap<String, CardRecord>,
}

impl ArtworkPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the preferred printing for `card`'s oracle id.
    ///
    /// With no preference recorded yet, `card` becomes the preference. When
    /// the recorded printing cannot be resolved from the session or the
    /// catalog, `card` is returned and the stored preference is left alone.
    pub fn get_preferred(
        &mut self,
        card: Option<&CardRecord>,
        catalog: &CardCatalog,
    ) -> Result<CardRecord, PreferenceError> {
        let card = card.ok_or(PreferenceError::MissingCard)?;

        let Some(printing_id) = self.preferred.get(&card.oracle_id).cloned() else {
            debug!("recording {} as preferred printing of {}", card, card.name);
            self.preferred
                .insert(card.oracle_id.clone(), card.printing_id.clone());
            self.known.insert(card.printing_id.clone(), card.clone());
            return Ok(card.clone());
        };

        if printing_id == card.printing_id {
            return Ok(card.clone());
        }
        if let Some(known) = self.known.get(&printing_id) {
            return Ok(known.clone());
        }
        if let Some(found) = catalog.find_by_printing_id(&printing_id) {
            self.known.insert(found.printing_id.clone(), found.clone());
            return Ok(found.clone());
        }

        debug!(
            "preferred printing {} of {} is unknown locally; using {}",
            printing_id, card.name, card.printing_id
        );
        Ok(card.clone())
    }

    /// Overwrite the preference for `card`'s oracle id.
    pub fn update_preferred(&mut self, card: &CardRecord) {
        self.preferred
            .insert(card.oracle_id.clone(), card.printing_id.clone());
        self.known.insert(card.printing_id.clone(), card.clone());
    }

    /// Make printings fetched from elsewhere resolvable by `get_preferred`.
    pub fn remember<'a, I>(&mut self, printings: I)
    where
        I: IntoIterator<Item = &'a CardRecord>,
    {
        for printing in printings {
            self.known
                .insert(printing.printing_id.clone(), printing.clone());
        }
    }

    /// True when the preferred printing for `oracle_id` can be returned as a record.
    pub fn is_resolvable(&self, oracle_id: &str, catalog: &CardCatalog) -> bool {
        match self.preferred.get(oracle_id) {
            None => true,
            Some(id) => self.known.contains_key(id) || catalog.find_by_printing_id(id).is_some(),
        }
    }

    pub fn preferred_printing_id(&self, oracle_id: &str) -> Option<&str> {
        self.preferred.get(oracle_id).map(String::as_str)
    }

    /// Forget the preference for `oracle_id`. Returns the removed printing id.
    pub fn clear(&mut self, oracle_id: &str) -> Option<String> {
        self.preferred.remove(oracle_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.preferred
            .iter()
            .map(|(oracle, printing)| (oracle.as_str(), printing.as_str()))
    }

    pub fn len(&self) -> usize {
        self.preferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preferred.is_empty()
    }

    /// Load the persisted mapping, starting empty on any failure.
    pub fn load_from_storage(path: &Path) -> Self {
        let loaded = fs::read_to_string(path)
            .with_context(|| format!("failed to read preferences {}", path.display()))
            .and_then(|text| {
                serde_json::from_str::<BTreeMap<String, String>>(&text)
                    .with_context(|| format!("failed to parse preferences {}", path.display()))
            });
        match loaded {
            Ok(preferred) => Self {
                preferred,
                known: HashMap::new(),
            },
            Err(err) => {
                if path.exists() {
                    warn!("starting with no artwork preferences: {err:#}");
                }
                Self::new()
            }
        }
    }

    pub fn save_to_storage(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, &self.preferred)
            .with_context(|| format!("failed to save preferences to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::FaceImages;
    use crate::catalog::CatalogMetadata;
    use pretty_assertions::assert_eq;

    fn printing(id: &str) -> CardRecord {
        CardRecord::new(id, "o-bolt", "Lightning Bolt", FaceImages::single(id))
    }

    #[test]
    fn first_seen_printing_stays_preferred() {
        let catalog = CardCatalog::empty();
        let mut prefs = ArtworkPreferences::new();
        let first = printing("lea");
        let second = printing("m10");

        assert_eq!(prefs.get_preferred(Some(&first), &catalog).unwrap(), first);
        assert_eq!(prefs.get_preferred(Some(&second), &catalog).unwrap(), first);
        assert_eq!(prefs.preferred_printing_id("o-bolt"), Some("lea"));
    }

    #[test]
    fn update_overrides_for_every_printing() {
        let catalog = CardCatalog::empty();
        let mut prefs = ArtworkPreferences::new();
        let first = printing("lea");
        let second = printing("m10");
        let third = printing("2xm");

        prefs.get_preferred(Some(&first), &catalog).unwrap();
        prefs.update_preferred(&second);
        for record in [&first, &second, &third] {
            assert_eq!(prefs.get_preferred(Some(record), &catalog).unwrap(), second);
        }
    }

    #[test]
    fn missing_card_is_rejected() {
        let mut prefs = ArtworkPreferences::new();
        assert_eq!(
            prefs.get_preferred(None, &CardCatalog::empty()),
            Err(PreferenceError::MissingCard)
        );
        assert!(prefs.is_empty());
    }

    #[test]
    fn loaded_preference_resolves_through_catalog() {
        let catalog = CardCatalog::refresh(
            CatalogMetadata::default(),
            vec![printing("lea"), printing("m10")],
        );
        let mut prefs = ArtworkPreferences::new();
        prefs.update_preferred(&printing("m10"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        prefs.save_to_storage(&path).unwrap();

        let mut reloaded = ArtworkPreferences::load_from_storage(&path);
        assert!(reloaded.is_resolvable("o-bolt", &catalog));
        let resolved = reloaded.get_preferred(Some(&printing("lea")), &catalog).unwrap();
        assert_eq!(resolved.printing_id, "m10");
    }

    #[test]
    fn unresolvable_preference_falls_back_without_overwriting() {
        let mut prefs = ArtworkPreferences::new();
        prefs.update_preferred(&printing("gone"));
        let mut reloaded = ArtworkPreferences {
            preferred: prefs.preferred.clone(),
            known: HashMap::new(),
        };
        let catalog = CardCatalog::empty();
        assert!(!reloaded.is_resolvable("o-bolt", &catalog));
        let resolved = reloaded.get_preferred(Some(&printing("lea")), &catalog).unwrap();
        assert_eq!(resolved.printing_id, "lea");
        assert_eq!(reloaded.preferred_printing_id("o-bolt"), Some("gone"));
    }

    #[test]
    fn save_then_load_round_trips_the_mapping() {
        let mut prefs = ArtworkPreferences::new();
        prefs.update_preferred(&printing("m10"));
        prefs.update_preferred(&CardRecord::new("xln-65", "o-opt", "Opt", FaceImages::single("x")));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs/preferences.json");
        prefs.save_to_storage(&path).unwrap();

        let loaded = ArtworkPreferences::load_from_storage(&path);
        let original: Vec<_> = prefs.iter().collect();
        let restored: Vec<_> = loaded.iter().collect();
        assert_eq!(restored, original);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(ArtworkPreferences::load_from_storage(&path).is_empty());
    }

    #[test]
    fn clear_forgets_a_preference() {
        let mut prefs = ArtworkPreferences::new();
        prefs.update_preferred(&printing("m10"));
        assert_eq!(prefs.clear("o-bolt"), Some("m10".to_string()));
        assert_eq!(prefs.preferred_printing_id("o-bolt"), None);
    }
}
