use serde::{Deserialize, Serialize};

use super::LayoutError;

/// Physical card size (63 x 88 mm).
pub const CARD_WIDTH_MM: f32 = 63.0;
pub const CARD_HEIGHT_MM: f32 = 88.0;
pub const MIN_SCALE_PERCENT: u32 = 90;
pub const MAX_SCALE_PERCENT: u32 = 110;
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;
const MM_PER_INCH: f32 = 25.4;

/// Supported paper sizes, portrait orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A4,
    A3,
    Letter,
    Legal,
}

impl PageSize {
    /// Width and height in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::A3 => (297.0, 420.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
        }
    }
}

/// Everything needed to size a page grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_size: PageSize,
    pub dpi: u32,
    /// Card scale in percent; clamped to 90..=110.
    pub scale_percent: u32,
    pub margin_mm: f32,
    /// Reserve gutters between cards and draw cut guides in them.
    pub cut_lines: bool,
    pub gutter_mm: f32,
    /// Printed once in the top margin and once in the bottom margin of every page.
    pub watermark: Option<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            dpi: 300,
            scale_percent: 100,
            margin_mm: 5.0,
            cut_lines: false,
            gutter_mm: 1.0,
            watermark: None,
        }
    }
}

pub fn mm_to_px(mm: f32, dpi: u32) -> u32 {
    (mm.max(0.0) / MM_PER_INCH * dpi as f32).round() as u32
}

/// Pixel rectangle of one grid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Fixed page geometry: how many card footprints fit and where each one goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub page_width: u32,
    pub page_height: u32,
    pub margin: u32,
    pub card_width: u32,
    pub card_height: u32,
    pub gutter: u32,
    pub rows: u32,
    pub columns: u32,
}

impl Grid {
    pub fn new(config: &LayoutConfig) -> Result<Self, LayoutError> {
        let dpi = config.dpi.clamp(MIN_DPI, MAX_DPI);
        let scale = config
            .scale_percent
            .clamp(MIN_SCALE_PERCENT, MAX_SCALE_PERCENT) as f32
            / 100.0;
        let (page_w_mm, page_h_mm) = config.page_size.dimensions_mm();
        let gutter = if config.cut_lines {
            mm_to_px(config.gutter_mm, dpi).max(1)
        } else {
            0
        };
        Self::from_pixels(
            (mm_to_px(page_w_mm, dpi), mm_to_px(page_h_mm, dpi)),
            mm_to_px(config.margin_mm, dpi),
            (
                mm_to_px(CARD_WIDTH_MM * scale, dpi),
                mm_to_px(CARD_HEIGHT_MM * scale, dpi),
            ),
            gutter,
        )
    }

    /// Grid from raw pixel measurements. Fails when not a single card fits.
    pub fn from_pixels(
        page: (u32, u32),
        margin: u32,
        card: (u32, u32),
        gutter: u32,
    ) -> Result<Self, LayoutError> {
        let (page_width, page_height) = page;
        let (card_width, card_height) = card;
        let usable_width = page_width.saturating_sub(margin.saturating_mul(2));
        let usable_height = page_height.saturating_sub(margin.saturating_mul(2));
        // A gutter wider than the printable area already limits both axes to
        // one card, so clamping it does not change the fit.
        let gutter = gutter.min(usable_width.max(usable_height));

        let fit = |usable: u32, footprint: u32| -> u32 {
            if footprint == 0 {
                return 0;
            }
            let slots = (u64::from(usable) + u64::from(gutter))
                / (u64::from(footprint) + u64::from(gutter));
            u32::try_from(slots).unwrap_or(u32::MAX)
        };
        let columns = fit(usable_width, card_width);
        let rows = fit(usable_height, card_height);

        if rows == 0 || columns == 0 {
            return Err(LayoutError::CardTooLarge {
                card_width,
                card_height,
                usable_width,
                usable_height,
            });
        }

        Ok(Self {
            page_width,
            page_height,
            margin,
            card_width,
            card_height,
            gutter,
            rows,
            columns,
        })
    }

    pub fn capacity(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn slot_rect(&self, row: u32, column: u32) -> SlotRect {
        let step_x = self.card_width.saturating_add(self.gutter);
        let step_y = self.card_height.saturating_add(self.gutter);
        SlotRect {
            x: self.margin.saturating_add(column.saturating_mul(step_x)),
            y: self.margin.saturating_add(row.saturating_mul(step_y)),
            width: self.card_width,
            height: self.card_height,
        }
    }

    /// Right and bottom edge of the occupied grid area.
    pub fn grid_extent(&self) -> (u32, u32) {
        (
            self.margin + self.columns * self.card_width + (self.columns - 1) * self.gutter,
            self.margin + self.rows * self.card_height + (self.rows - 1) * self.gutter,
        )
    }
}

/// Next free slot of a document being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub page: usize,
    pub row: u32,
    pub column: u32,
}

impl Cursor {
    pub const START: Cursor = Cursor {
        page: 0,
        row: 0,
        column: 0,
    };

    /// Row-major step: left to right, then top to bottom, then onto a new page.
    pub fn advance(self, grid: &Grid) -> Cursor {
        let mut next = self;
        next.column += 1;
        if next.column >= grid.columns {
            next.column = 0;
            next.row += 1;
            if next.row >= grid.rows {
                next.row = 0;
                next.page += 1;
            }
        }
        next
    }

    pub fn is_page_start(&self) -> bool {
        self.row == 0 && self.column == 0
    }
}

/// Slots for `count` images in submission order, without drawing anything.
pub fn plan(grid: &Grid, count: usize) -> Vec<Cursor> {
    let mut cursor = Cursor::START;
    let mut slots = Vec::with_capacity(count);
    for _ in 0..count {
        slots.push(cursor);
        cursor = cursor.advance(grid);
    }
    slots
}
