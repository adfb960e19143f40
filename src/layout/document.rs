use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;
use log::info;

use super::LayoutError;
use super::grid::{Grid, SlotRect};

/// Where one image landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub page: usize,
    pub row: u32,
    pub column: u32,
    pub rect: SlotRect,
}

/// A drawn page and the slots it holds.
#[derive(Debug, Clone)]
pub struct Page {
    pub image: RgbaImage,
    pub placements: Vec<Placement>,
}

/// Finished, structurally valid multi-page output.
#[derive(Debug, Clone)]
pub struct Document {
    grid: Grid,
    pages: Vec<Page>,
}

impl Document {
    /// Validate pages before handing them out: at least one page, every page
    /// the grid's size, none over capacity.
    pub(crate) fn from_pages(grid: Grid, pages: Vec<Page>) -> Result<Self, LayoutError> {
        if pages.is_empty() {
            return Err(LayoutError::EmptyDocument);
        }
        let expected = (grid.page_width, grid.page_height);
        for (idx, page) in pages.iter().enumerate() {
            let found = page.image.dimensions();
            if found != expected {
                return Err(LayoutError::InconsistentPages {
                    page: idx + 1,
                    expected,
                    found,
                });
            }
            if page.placements.len() > grid.capacity() {
                return Err(LayoutError::PageOverflow {
                    page: idx + 1,
                    capacity: grid.capacity(),
                });
            }
        }
        Ok(Self { grid, pages })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All placements in submission order.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.pages.iter().flat_map(|p| p.placements.iter())
    }

    /// Write every page as `<stem>_<NNN>.png` into `dir`.
    pub fn save_pages(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        let mut written = Vec::with_capacity(self.pages.len());
        for (idx, page) in self.pages.iter().enumerate() {
            let target = dir.join(format!("{}_{:03}.png", stem, idx + 1));
            page.image
                .save(&target)
                .with_context(|| format!("failed to write {}", target.display()))?;
            written.push(target);
        }
        info!("wrote {} page(s) to {}", written.len(), dir.display());
        Ok(written)
    }
}
