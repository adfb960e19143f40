//! Page layout: packs card images into a fixed grid across as many pages as needed.
//!
//! Geometry ([`Grid`], [`Cursor`], [`plan`]) is pure and can be tested without
//! drawing anything. [`LayoutEngine`] walks the cursor and paints each image
//! onto page bitmaps, then hands back a validated [`Document`].

mod document;
mod grid;
mod paint;

pub use document::{Document, Page, Placement};
pub use grid::{
    CARD_HEIGHT_MM, CARD_WIDTH_MM, Cursor, Grid, LayoutConfig, MAX_DPI, MAX_SCALE_PERCENT,
    MIN_DPI, MIN_SCALE_PERCENT, PageSize, SlotRect, mm_to_px, plan,
};
pub use paint::Palette;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::DynamicImage;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(
        "a {card_width}x{card_height} px card does not fit in the {usable_width}x{usable_height} px \
         printable area; choose a larger page, a smaller scale or a narrower margin"
    )]
    CardTooLarge {
        card_width: u32,
        card_height: u32,
        usable_width: u32,
        usable_height: u32,
    },
    #[error("document has no pages")]
    EmptyDocument,
    #[error("page {page} is {found:?} px, expected {expected:?} px")]
    InconsistentPages {
        page: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("page {page} holds more than {capacity} cards")]
    PageOverflow { page: usize, capacity: usize },
    #[error("layout was cancelled")]
    Cancelled,
}

/// Shared flag for cooperative cancellation of a document build.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stateful placement of images, one at a time, in submission order.
pub struct LayoutEngine {
    grid: Grid,
    palette: Palette,
    cut_lines: bool,
    watermark: Option<String>,
    pages: Vec<Page>,
    cursor: Cursor,
    cancel: CancelFlag,
}

impl LayoutEngine {
    /// Size the grid for `config`. Fails if not a single card fits on a page.
    pub fn new(config: &LayoutConfig) -> Result<Self, LayoutError> {
        let grid = Grid::new(config)?;
        debug!(
            "layout grid {}x{} ({} per page), card {}x{} px, gutter {} px",
            grid.columns,
            grid.rows,
            grid.capacity(),
            grid.card_width,
            grid.card_height,
            grid.gutter
        );
        Ok(Self::with_grid(grid, config.cut_lines, config.watermark.clone()))
    }

    pub fn with_grid(grid: Grid, cut_lines: bool, watermark: Option<String>) -> Self {
        Self {
            grid,
            palette: Palette::default(),
            cut_lines,
            watermark,
            pages: Vec::new(),
            cursor: Cursor::START,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Slot the next image will occupy.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Draw `image` into the next free slot, opening a new page when the
    /// current one is full.
    pub fn place(&mut self, image: &DynamicImage) -> Result<Placement, LayoutError> {
        if self.cancel.is_cancelled() {
            return Err(LayoutError::Cancelled);
        }

        let cursor = self.cursor;
        if cursor.page == self.pages.len() {
            debug!("opening page {}", cursor.page + 1);
            self.pages.push(Page {
                image: paint::blank_page(
                    &self.grid,
                    &self.palette,
                    self.cut_lines,
                    self.watermark.as_deref(),
                ),
                placements: Vec::with_capacity(self.grid.capacity()),
            });
        }

        let rect = self.grid.slot_rect(cursor.row, cursor.column);
        let page = &mut self.pages[cursor.page];
        debug_assert!(page.placements.len() < self.grid.capacity());
        paint::draw_card(&mut page.image, rect, image);

        let placement = Placement {
            page: cursor.page,
            row: cursor.row,
            column: cursor.column,
            rect,
        };
        page.placements.push(placement);
        self.cursor = cursor.advance(&self.grid);
        Ok(placement)
    }

    pub fn place_all<'a, I>(&mut self, images: I) -> Result<Vec<Placement>, LayoutError>
    where
        I: IntoIterator<Item = &'a DynamicImage>,
    {
        images.into_iter().map(|image| self.place(image)).collect()
    }

    /// Close the build and return the document.
    pub fn finish(self) -> Result<Document, LayoutError> {
        if self.cancel.is_cancelled() {
            return Err(LayoutError::Cancelled);
        }
        Document::from_pages(self.grid, self.pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn grid() -> Grid {
        // 2 columns x 2 rows.
        Grid::from_pixels((220, 320), 10, (100, 150), 0).unwrap()
    }

    fn solid(shade: u8) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 6, Rgba([shade, shade, shade, 255])))
    }

    #[test]
    fn overflow_spills_one_image_onto_a_second_page() {
        let grid = grid();
        let mut engine = LayoutEngine::with_grid(grid, false, None);
        let images: Vec<_> = (0..grid.capacity() + 1).map(|i| solid(i as u8 * 10)).collect();
        let placements = engine.place_all(&images).unwrap();
        let doc = engine.finish().unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages()[0].placements.len(), grid.capacity());
        assert_eq!(doc.pages()[1].placements.len(), 1);
        let last = placements.last().unwrap();
        assert_eq!((last.page, last.row, last.column), (1, 0, 0));
        assert_eq!(last.rect, grid.slot_rect(0, 0));
    }

    #[test]
    fn placement_order_matches_submission_order() {
        let grid = grid();
        let mut engine = LayoutEngine::with_grid(grid, false, None);
        let images: Vec<_> = (0..7).map(|i| solid(i * 30)).collect();
        let placements = engine.place_all(&images).unwrap();
        let expected: Vec<_> = plan(&grid, 7)
            .into_iter()
            .map(|c| (c.page, c.row, c.column))
            .collect();
        let actual: Vec<_> = placements.iter().map(|p| (p.page, p.row, p.column)).collect();
        assert_eq!(actual, expected);

        let doc = engine.finish().unwrap();
        let placed: Vec<_> = doc.placements().copied().collect();
        assert_eq!(placed, placements);

        // Third image (shade 60) sits in page 1, row 1, column 0.
        let rect = grid.slot_rect(1, 0);
        let pixel = doc.pages()[0].image.get_pixel(rect.x + 50, rect.y + 75);
        assert!((i32::from(pixel[0]) - 60).abs() <= 1, "{pixel:?}");
    }

    #[test]
    fn finishing_without_images_is_an_error() {
        let engine = LayoutEngine::with_grid(grid(), false, None);
        assert!(matches!(engine.finish(), Err(LayoutError::EmptyDocument)));
    }

    #[test]
    fn oversize_configuration_fails_at_construction() {
        let config = LayoutConfig {
            page_size: PageSize::A4,
            scale_percent: 110,
            margin_mm: 90.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            LayoutEngine::new(&config),
            Err(LayoutError::CardTooLarge { .. })
        ));
    }

    #[test]
    fn cancelled_build_produces_no_document() {
        let flag = CancelFlag::new();
        let mut engine = LayoutEngine::with_grid(grid(), false, None).with_cancel_flag(flag.clone());
        engine.place(&solid(0)).unwrap();
        flag.cancel();
        assert!(matches!(engine.place(&solid(0)), Err(LayoutError::Cancelled)));
        assert!(matches!(engine.finish(), Err(LayoutError::Cancelled)));
    }
}
