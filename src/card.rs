use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Market prices as reported by the card database. Any field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd_foil: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tix: Option<String>,
}

/// Image locators for one printing. Double-faced cards carry a back face.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaceImages {
    pub front: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
}

impl FaceImages {
    pub fn single<S: Into<String>>(front: S) -> Self {
        Self {
            front: front.into(),
            back: None,
        }
    }

    pub fn double<S: Into<String>, T: Into<String>>(front: S, back: T) -> Self {
        Self {
            front: front.into(),
            back: Some(back.into()),
        }
    }
}

/// One specific printing of a card.
///
/// Records are immutable once built; a catalog refresh replaces them wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardRecord {
    pub printing_id: String,
    pub oracle_id: String,
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
    pub legalities: BTreeMap<String, String>,
    #[serde(default)]
    pub prices: Prices,
    pub images: FaceImages,
    #[serde(default)]
    pub is_token: bool,
}

impl CardRecord {
    /// Minimal record with a single face; remaining fields take their defaults.
    pub fn new<I, O, N>(printing_id: I, oracle_id: O, name: N, images: FaceImages) -> Self
    where
        I: Into<String>,
        O: Into<String>,
        N: Into<String>,
    {
        Self {
            printing_id: printing_id.into(),
            oracle_id: oracle_id.into(),
            name: name.into(),
            set: String::new(),
            set_name: String::new(),
            collector_number: String::new(),
            lang: String::new(),
            legalities: BTreeMap::new(),
            prices: Prices::default(),
            images,
            is_token: false,
        }
    }

    pub fn is_double_faced(&self) -> bool {
        self.images.back.is_some()
    }

    /// Legality in a given format (`"legal"`, `"not_legal"`, `"banned"`, ...).
    pub fn legality(&self, format: &str) -> Option<&str> {
        self.legalities.get(format).map(String::as_str)
    }
}

impl fmt::Display for CardRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.set.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(
                f,
                "{} ({} #{})",
                self.name,
                self.set.to_uppercase(),
                self.collector_number
            )
        }
    }
}

/// Lowercased and trimmed form used for exact-name comparisons.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
