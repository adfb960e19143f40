//! Raster drawing for proxy pages: card art, cut guides and the watermark.

use image::imageops::{FilterType, overlay};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::grid::{Grid, SlotRect};

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;
/// Blank columns between glyphs, in glyph pixels.
const GLYPH_SPACING: usize = 1;

/// Colours used when painting a page.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub page_bg: Rgba<u8>,
    pub cut_line: Rgba<u8>,
    pub watermark: Rgba<u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            page_bg: rgba(0xff, 0xff, 0xff, 0xff),
            cut_line: rgba(0xb4, 0xb4, 0xb4, 0xff),
            watermark: rgba(0x8c, 0x8c, 0x8c, 0xff),
        }
    }
}

fn rgba(r: u8, g: u8, b: u8, a: u8) -> Rgba<u8> {
    Rgba([r, g, b, a])
}

/// Blank page with cut guides and watermark already drawn.
pub fn blank_page(grid: &Grid, palette: &Palette, cut_lines: bool, watermark: Option<&str>) -> RgbaImage {
    let mut page = RgbaImage::from_pixel(grid.page_width, grid.page_height, palette.page_bg);
    if cut_lines {
        draw_cut_lines(&mut page, grid, palette.cut_line);
    }
    if let Some(text) = watermark.filter(|t| !t.trim().is_empty()) {
        draw_watermark(&mut page, grid, text, palette.watermark);
    }
    page
}

/// Scale `art` to the slot footprint and paste it in place.
pub fn draw_card(page: &mut RgbaImage, slot: SlotRect, art: &DynamicImage) {
    let resized = if art.width() == slot.width && art.height() == slot.height {
        art.to_rgba8()
    } else {
        art.resize_exact(slot.width, slot.height, FilterType::Lanczos3)
            .to_rgba8()
    };
    overlay(page, &resized, slot.x as i64, slot.y as i64);
}

/// Full-length guides along every card edge, centred in the gutters.
fn draw_cut_lines(page: &mut RgbaImage, grid: &Grid, color: Rgba<u8>) {
    let (right, bottom) = grid.grid_extent();
    let half_gutter = grid.gutter as f32 / 2.0;
    let page_w = grid.page_width as f32;
    let page_h = grid.page_height as f32;

    let mut xs = vec![grid.margin as f32 - half_gutter];
    for col in 1..grid.columns {
        xs.push(grid.slot_rect(0, col).x as f32 - half_gutter);
    }
    xs.push(right as f32 + half_gutter);

    let mut ys = vec![grid.margin as f32 - half_gutter];
    for row in 1..grid.rows {
        ys.push(grid.slot_rect(row, 0).y as f32 - half_gutter);
    }
    ys.push(bottom as f32 + half_gutter);

    for x in xs {
        draw_line_segment_mut(page, (x, 0.0), (x, page_h), color);
    }
    for y in ys {
        draw_line_segment_mut(page, (0.0, y), (page_w, y), color);
    }
}

/// Pixel width of `text` at glyph scale `scale`.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let chars = text.chars().count();
    if chars == 0 {
        return 0;
    }
    ((chars * (GLYPH_WIDTH + GLYPH_SPACING) - GLYPH_SPACING) as u32) * scale
}

/// One centred line in the top margin and one in the bottom margin.
fn draw_watermark(page: &mut RgbaImage, grid: &Grid, text: &str, color: Rgba<u8>) {
    let (_, bottom) = grid.grid_extent();
    let band = grid.margin.min(grid.page_height.saturating_sub(bottom));
    let mut scale = (band / (2 * GLYPH_HEIGHT as u32)).max(1);
    while scale > 1 && text_width(text, scale) > grid.page_width {
        scale -= 1;
    }

    let text_h = GLYPH_HEIGHT as u32 * scale;
    let x = (grid.page_width.saturating_sub(text_width(text, scale)) / 2) as i32;
    let top_y = (grid.margin.saturating_sub(text_h) / 2) as i32;
    let bottom_y = (bottom + band.saturating_sub(text_h) / 2) as i32;

    draw_text(page, x, top_y, text, color, scale);
    draw_text(page, x, bottom_y, text, color, scale);
}

pub fn draw_text(page: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32) {
    let advance = ((GLYPH_WIDTH + GLYPH_SPACING) as u32 * scale) as i32;
    for (idx, ch) in text.chars().enumerate() {
        draw_glyph(page, x + idx as i32 * advance, y, ch, color, scale);
    }
}

fn draw_glyph(image: &mut RgbaImage, x: i32, y: i32, ch: char, color: Rgba<u8>, scale: u32) {
    let pattern = glyph_pattern(ch);
    for (row, bits) in pattern.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                let px = x + (col as i32 * scale as i32);
                let py = y + (row as i32 * scale as i32);
                draw_filled_rect_mut(image, Rect::at(px, py).of_size(scale, scale), color);
            }
        }
    }
}

#[rustfmt::skip]
fn glyph_pattern(ch: char) -> [u8; GLYPH_HEIGHT] {
    match ch.to_ascii_uppercase() {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b10010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b01010, 0b01010, 0b00100, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '&' => [0b01100, 0b10010, 0b10100, 0b01000, 0b10101, 0b10010, 0b01101],
        '/' => [0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000, 0b00000],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000],
        '#' => [0b01010, 0b11111, 0b01010, 0b01010, 0b11111, 0b01010, 0b01010],
        '@' => [0b01110, 0b10001, 0b10111, 0b10101, 0b10111, 0b10000, 0b01110],
        '\'' => [0b00100, 0b00100, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '=' => [0b00000, 0b11111, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000],
        '"' => [0b01010, 0b01010, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00100, 0b01000],
        '<' => [0b00010, 0b00100, 0b01000, 0b10000, 0b01000, 0b00100, 0b00010],
        '>' => [0b01000, 0b00100, 0b00010, 0b00001, 0b00010, 0b00100, 0b01000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '+' => [0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '$' => [0b00100, 0b01111, 0b10100, 0b01110, 0b00101, 0b11110, 0b00100],
        '%' => [0b11001, 0b11010, 0b00100, 0b01000, 0b10110, 0b00110, 0b00000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111, 0b00000],
        '|' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        ';' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00110, 0b00100, 0b01000],
        '*' => [0b00100, 0b10101, 0b01110, 0b10101, 0b00100, 0b00000, 0b00000],
        '?' => [0b01110, 0b10001, 0b00010, 0b00100, 0b00100, 0b00000, 0b00100],
        ' ' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        _ => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
    }
}
