//! Tile cache that renders a grid of 8x8 tiles into an indexed pixmap and composes it onto a
//! destination bitmap with scrolling, screen flip, transparency and priority.
//!
//! Tile contents are pulled through a [`TileSource`] that is passed in at update time; the
//! tilemap never holds a reference back into the chip that owns it.

use crate::bitmap::{Bitmap16, PriorityBitmap, Rect};
use crate::gfx::{COLOR_GRANULARITY, TILE_HEIGHT, TILE_WIDTH, TileGfx, TileInfo};

pub trait TileSource {
    fn tile_info(&self, tile_index: usize) -> TileInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TilemapFlip {
    pub x: bool,
    pub y: bool,
}

impl TilemapFlip {
    pub const NONE: Self = Self { x: false, y: false };
    pub const BOTH: Self = Self { x: true, y: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Transparent,
    Opaque,
}

/// Priority code merged into the priority bitmap for every pixel drawn: `pri = (pri & mask) | value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerPriority {
    pub value: u8,
    pub mask: u8,
}

impl LayerPriority {
    #[must_use]
    pub const fn new(value: u8, mask: u8) -> Self {
        Self { value, mask }
    }

    #[inline]
    #[must_use]
    pub fn merge(self, existing: u8) -> u8 {
        (existing & self.mask) | self.value
    }
}

impl Default for LayerPriority {
    fn default() -> Self {
        Self { value: 0, mask: 0xFF }
    }
}

pub struct DrawTarget<'a> {
    pub bitmap: &'a mut Bitmap16,
    pub priority: &'a mut PriorityBitmap,
    pub clip: Rect,
}

impl DrawTarget<'_> {
    /// Clip rectangle restricted to the destination bitmap
    #[must_use]
    pub fn effective_clip(&self) -> Rect {
        self.clip.intersection(self.bitmap.bounds())
    }
}

#[derive(Debug, Clone)]
pub struct Tilemap {
    cols: usize,
    rows: usize,
    width: i32,
    height: i32,
    pixmap: Bitmap16,
    flagsmap: PriorityBitmap,
    dirty: Vec<bool>,
    all_dirty: bool,
    row_scroll: Vec<i32>,
    scroll_y: i32,
    dx: i32,
    dx_flipped: i32,
    dy: i32,
    dy_flipped: i32,
    flip: TilemapFlip,
    transparent_pen: u8,
}

impl Tilemap {
    #[must_use]
    pub fn new(cols: usize, rows: usize) -> Self {
        let width = cols * TILE_WIDTH;
        let height = rows * TILE_HEIGHT;

        Self {
            cols,
            rows,
            width: width as i32,
            height: height as i32,
            pixmap: Bitmap16::new(width, height),
            flagsmap: PriorityBitmap::new(width, height),
            dirty: vec![false; cols * rows],
            all_dirty: true,
            row_scroll: vec![0],
            scroll_y: 0,
            dx: 0,
            dx_flipped: 0,
            dy: 0,
            dy_flipped: 0,
            flip: TilemapFlip::NONE,
            transparent_pen: 0,
        }
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.cols * self.rows
    }

    #[must_use]
    pub fn pixel_width(&self) -> usize {
        self.width as usize
    }

    #[must_use]
    pub fn pixel_height(&self) -> usize {
        self.height as usize
    }

    pub fn mark_tile_dirty(&mut self, tile_index: usize) {
        debug_assert!(tile_index < self.dirty.len(), "tile index {tile_index} out of range");
        self.dirty[tile_index] = true;
    }

    pub fn mark_all_dirty(&mut self) {
        self.all_dirty = true;
    }

    #[must_use]
    pub fn is_tile_dirty(&self, tile_index: usize) -> bool {
        self.all_dirty || self.dirty[tile_index]
    }

    #[must_use]
    pub fn dirty_tile_count(&self) -> usize {
        if self.all_dirty {
            self.tile_count()
        } else {
            self.dirty.iter().filter(|&&dirty| dirty).count()
        }
    }

    /// Split the pixmap into `count` independently horizontally scrollable bands. All scroll
    /// values reset to 0.
    pub fn set_scroll_rows(&mut self, count: usize) {
        assert!(count != 0 && count <= self.pixel_height(), "invalid scroll row count {count}");
        self.row_scroll = vec![0; count];
    }

    #[must_use]
    pub fn scroll_rows(&self) -> usize {
        self.row_scroll.len()
    }

    pub fn set_scroll_x(&mut self, row: usize, value: i32) {
        self.row_scroll[row] = value;
    }

    #[must_use]
    pub fn scroll_x(&self, row: usize) -> i32 {
        self.row_scroll[row]
    }

    pub fn set_scroll_y(&mut self, value: i32) {
        self.scroll_y = value;
    }

    #[must_use]
    pub fn scroll_y(&self) -> i32 {
        self.scroll_y
    }

    /// Constant horizontal displacement, separately for the unflipped and flipped screen
    pub fn set_scroll_dx(&mut self, dx: i32, dx_flipped: i32) {
        self.dx = dx;
        self.dx_flipped = dx_flipped;
    }

    #[must_use]
    pub fn scroll_dx(&self) -> (i32, i32) {
        (self.dx, self.dx_flipped)
    }

    pub fn set_scroll_dy(&mut self, dy: i32, dy_flipped: i32) {
        self.dy = dy;
        self.dy_flipped = dy_flipped;
    }

    #[must_use]
    pub fn scroll_dy(&self) -> (i32, i32) {
        (self.dy, self.dy_flipped)
    }

    pub fn set_flip(&mut self, flip: TilemapFlip) {
        self.flip = flip;
    }

    #[must_use]
    pub fn flip(&self) -> TilemapFlip {
        self.flip
    }

    pub fn set_transparent_pen(&mut self, pen: u8) {
        if pen != self.transparent_pen {
            self.transparent_pen = pen;
            self.all_dirty = true;
        }
    }

    #[must_use]
    pub fn transparent_pen(&self) -> u8 {
        self.transparent_pen
    }

    /// Re-render every dirty tile into the pixmap and flags map.
    pub fn update<S: TileSource + ?Sized>(&mut self, source: &S, gfx: &TileGfx) {
        if self.all_dirty {
            for tile_index in 0..self.tile_count() {
                self.render_tile(source, gfx, tile_index);
            }
            self.all_dirty = false;
            self.dirty.fill(false);
            return;
        }

        for tile_index in 0..self.dirty.len() {
            if self.dirty[tile_index] {
                self.render_tile(source, gfx, tile_index);
                self.dirty[tile_index] = false;
            }
        }
    }

    fn render_tile<S: TileSource + ?Sized>(&mut self, source: &S, gfx: &TileGfx, tile_index: usize) {
        let TileInfo { code, color, flip } = source.tile_info(tile_index);
        let pixels = gfx.tile(code);
        let palette_base = color * COLOR_GRANULARITY;

        let base_x = (tile_index % self.cols) * TILE_WIDTH;
        let base_y = (tile_index / self.cols) * TILE_HEIGHT;

        for tile_row in 0..TILE_HEIGHT {
            let src_row = if flip.y { TILE_HEIGHT - 1 - tile_row } else { tile_row };
            let y = base_y + tile_row;

            for tile_col in 0..TILE_WIDTH {
                let src_col = if flip.x { TILE_WIDTH - 1 - tile_col } else { tile_col };
                let pen = pixels[src_row * TILE_WIDTH + src_col];
                let x = base_x + tile_col;

                self.pixmap.set(x, y, (palette_base + u32::from(pen)) as u16);
                self.flagsmap.set(x, y, u8::from(pen != self.transparent_pen));
            }
        }
    }

    /// Rendered tile pixels, unflipped, as of the last [`Self::update`]
    #[must_use]
    pub fn pixmap(&self) -> &Bitmap16 {
        &self.pixmap
    }

    /// Nonzero wherever the pixmap holds a non-transparent pen
    #[must_use]
    pub fn flagsmap(&self) -> &PriorityBitmap {
        &self.flagsmap
    }

    fn scroll_x_for_pixmap_row(&self, pixmap_y: i32) -> i32 {
        let band = pixmap_y as usize * self.row_scroll.len() / self.pixel_height();
        self.row_scroll[band]
    }

    /// Compose the pixmap onto the target. Destination pixel `d` maps to pixmap pixel
    /// `d + scroll - dx` (wrapping), mirrored when the screen is flipped.
    pub fn draw(&self, target: &mut DrawTarget<'_>, mode: DrawMode, priority: LayerPriority) {
        let clip = target.effective_clip();
        if clip.is_empty() {
            return;
        }

        let dest_width = target.bitmap.width() as i32;
        let dest_height = target.bitmap.height() as i32;

        let y_origin = if self.flip.y {
            dest_height - self.height - (self.dy_flipped - self.scroll_y)
        } else {
            self.dy - self.scroll_y
        };

        for y in clip.min_y..=clip.max_y {
            let flipped_y = (y - y_origin).rem_euclid(self.height);
            let pixmap_y = if self.flip.y { self.height - 1 - flipped_y } else { flipped_y };

            let scroll_x = self.scroll_x_for_pixmap_row(pixmap_y);
            let x_origin = if self.flip.x {
                dest_width - self.width - (self.dx_flipped - scroll_x)
            } else {
                self.dx - scroll_x
            };

            let src = self.pixmap.row(pixmap_y as usize);
            let flags = self.flagsmap.row(pixmap_y as usize);
            let dest = target.bitmap.row_mut(y as usize);
            let pri = target.priority.row_mut(y as usize);

            for x in clip.min_x..=clip.max_x {
                let flipped_x = (x - x_origin).rem_euclid(self.width);
                let pixmap_x =
                    (if self.flip.x { self.width - 1 - flipped_x } else { flipped_x }) as usize;

                if mode == DrawMode::Transparent && flags[pixmap_x] == 0 {
                    continue;
                }

                dest[x as usize] = src[pixmap_x];
                pri[x as usize] = priority.merge(pri[x as usize]);
            }
        }
    }
}
