//! Core library for turning decklists into printable proxy sheets.
//!
//! A decklist is parsed into search lines, each line is resolved against the
//! local card catalog (falling back to a remote fuzzy search), the user's
//! preferred printing is picked, and the artwork is fetched through a bounded
//! cache and laid out onto fixed-size pages.

pub mod card;
pub mod catalog;
pub mod config;
pub mod image_cache;
pub mod layout;
pub mod preferences;
pub mod print_job;
pub mod proxy;
pub mod remote;
pub mod search_line;
pub mod storage;

pub use card::{CardRecord, FaceImages, Prices, normalize_name};
pub use catalog::{CardCatalog, CatalogMetadata, Freshness};
pub use config::{ConfigError, Settings};
pub use image_cache::{CacheError, ImageCache};
pub use layout::{
    CancelFlag, Document, Grid, LayoutConfig, LayoutEngine, LayoutError, PageSize, Placement,
};
pub use preferences::{ArtworkPreferences, PreferenceError};
pub use print_job::{Face, PrintItem, ResolvedEntry, expand_print_items};
pub use proxy::{LogReporter, PreferenceEntry, ProxyContext, Reporter};
pub use remote::{CardService, ScryfallClient};
pub use search_line::{MAX_QUANTITY, SearchLine, parse_decklist, parse_search_line};
pub use storage::StoragePaths;
