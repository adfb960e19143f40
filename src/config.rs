//! User settings persisted as JSON next to the other application files.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::DEFAULT_STALE_AFTER_DAYS;
use crate::image_cache::DEFAULT_CACHE_BOUND;
use crate::layout::{LayoutConfig, MAX_DPI, MIN_DPI, PageSize};
use crate::storage::write_json_atomic;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be between 0 and 1000 millimetres (got {value})")]
    InvalidLength { field: &'static str, value: f32 },
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Largest margin or gutter accepted; larger than any supported page.
pub const MAX_LENGTH_MM: f32 = 1000.0;

/// Everything the user can tune. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub page_size: PageSize,
    pub dpi: u32,
    pub scale_percent: u32,
    pub margin_mm: f32,
    pub cut_lines: bool,
    pub gutter_mm: f32,
    pub two_sided: bool,
    pub watermark: Option<String>,
    pub fetch_concurrency: usize,
    pub image_cache_bound: usize,
    pub stale_after_days: i64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let layout = LayoutConfig::default();
        Self {
            page_size: layout.page_size,
            dpi: layout.dpi,
            scale_percent: layout.scale_percent,
            margin_mm: layout.margin_mm,
            cut_lines: layout.cut_lines,
            gutter_mm: layout.gutter_mm,
            two_sided: false,
            watermark: None,
            fetch_concurrency: 8,
            image_cache_bound: DEFAULT_CACHE_BOUND,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            // Generous: the bulk card file is a single large download.
            request_timeout_secs: 300,
        }
    }
}

impl Settings {
    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let loaded = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))
            .and_then(|text| {
                serde_json::from_str::<Settings>(&text)
                    .with_context(|| format!("failed to parse settings {}", path.display()))
            });
        loaded.unwrap_or_else(|err| {
            warn!("using default settings: {err:#}");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
            .with_context(|| format!("failed to save settings to {}", path.display()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Check the values the layout and fetch pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("margin_mm", self.margin_mm), ("gutter_mm", self.gutter_mm)] {
            if !(0.0..=MAX_LENGTH_MM).contains(&value) {
                return Err(ConfigError::InvalidLength { field, value });
            }
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Zero {
                field: "fetch_concurrency",
            });
        }
        if self.image_cache_bound == 0 {
            return Err(ConfigError::Zero {
                field: "image_cache_bound",
            });
        }
        Ok(())
    }

    /// Layout parameters, with DPI pulled into its supported range and an
    /// empty watermark treated as none.
    pub fn layout_config(&self) -> Result<LayoutConfig, ConfigError> {
        self.validate()?;
        Ok(LayoutConfig {
            page_size: self.page_size,
            dpi: self.dpi.clamp(MIN_DPI, MAX_DPI),
            scale_percent: self.scale_percent,
            margin_mm: self.margin_mm,
            cut_lines: self.cut_lines,
            gutter_mm: self.gutter_mm,
            watermark: self
                .watermark
                .as_deref()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string),
        })
    }
}
