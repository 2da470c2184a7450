use crate::scroll::ROW_MASK;
use crate::{Bank, HARDWARE_X_ORIGIN, Pc080sn};
use tilemap_common::scanline::{self, TRANSPARENT_PIXEL};
use tilemap_common::{DrawMode, DrawTarget, LayerPriority};

/// Entries in the per-scanline color control table used by the road draw
pub const COLOR_CONTROL_LEN: usize = 0x100;

// The road draw only ever reads the leftmost 512 pixels of the tilemap
const ROAD_WIDTH_MASK: i32 = 0x1FF;

// The color control table is latched 2 lines ahead of the tilemap row it applies to
const LINE_COLOR_LATENCY: i32 = 2;

/// Recolor one road tilemap pixel. The low nibble of the pixel says which part of the road it
/// belongs to; the line color picks alternate shades for stripes, and all bits in 0xFFE0 set
/// means the line is inside a tunnel.
#[must_use]
pub fn road_pixel_color(pixel: u16, line_color: u16) -> u16 {
    let mut pixel = pixel;
    let pixel_type = pixel % 0x10;
    let mut road_body = (pixel & 0x7FF0) + 4;
    let mut off_road = road_body + 1;

    if line_color & 0xFFE0 == 0xFFE0 {
        pixel = pixel.wrapping_add(10);
        road_body += 10;
        off_road += 10;
    } else {
        if line_color & 0x10 != 0 {
            road_body += 5;
        }
        if line_color & 0x02 != 0 {
            off_road += 5;
        }
    }

    match pixel_type {
        // Center lines and inner road edge
        0x01 | 0x02 if line_color & 0x08 != 0 => road_body,
        // Outer road edge
        0x03 if line_color & 0x04 != 0 => road_body,
        0x04 => road_body,
        0x05 => off_road,
        _ => pixel,
    }
}

impl Pc080sn {
    pub fn draw(
        &mut self,
        bank: Bank,
        target: &mut DrawTarget<'_>,
        mode: DrawMode,
        priority: LayerPriority,
    ) {
        self.update_bank_tiles(bank);
        self.tilemaps[bank.index()].draw(target, mode, priority);
    }

    /// Draw with the tilemap displaced by an extra `(x_offset, y_offset)` for this draw only.
    pub fn draw_with_offset(
        &mut self,
        bank: Bank,
        target: &mut DrawTarget<'_>,
        mode: DrawMode,
        priority: LayerPriority,
        x_offset: i32,
        y_offset: i32,
    ) {
        self.update_bank_tiles(bank);

        let tilemap = &mut self.tilemaps[bank.index()];
        let (dx, dx_flipped) = tilemap.scroll_dx();
        let (dy, dy_flipped) = tilemap.scroll_dy();

        tilemap.set_scroll_dx(dx + x_offset, dx_flipped + x_offset);
        tilemap.set_scroll_dy(dy + y_offset, dy_flipped + y_offset);
        tilemap.draw(target, mode, priority);
        tilemap.set_scroll_dx(dx, dx_flipped);
        tilemap.set_scroll_dy(dy, dy_flipped);
    }

    /// Top Speed road draw: renders the tilemap one scanline at a time using the row scroll
    /// table directly, recoloring road pixels from `color_control` as it goes.
    ///
    /// Screen flip is not applied.
    pub fn draw_special(
        &mut self,
        bank: Bank,
        target: &mut DrawTarget<'_>,
        mode: DrawMode,
        priority: LayerPriority,
        color_control: &[u16; COLOR_CONTROL_LEN],
    ) {
        self.update_bank_tiles(bank);

        let clip = target.effective_clip();
        if clip.is_empty() {
            return;
        }

        let tilemap = &self.tilemaps[bank.index()];
        let pixmap = tilemap.pixmap();
        let flagsmap = tilemap.flagsmap();

        let scroll_y = self.scroll.y(bank);
        let x_start = self.scroll.x(bank) + HARDWARE_X_ORIGIN - self.config.x_offset + clip.min_x;
        let mut y_index = scroll_y + clip.min_y - self.config.y_offset;

        let mut line = vec![0_u16; clip.width() as usize];

        for y in clip.min_y..=clip.max_y {
            let src_y = y_index & ROW_MASK;
            // Table line that tilemap_update() would have assigned to this tilemap row
            let row_index = (src_y - scroll_y) & ROW_MASK;
            let color_idx = (row_index + self.config.y_offset - LINE_COLOR_LATENCY) & 0xFF;
            let line_color = color_control[color_idx as usize];

            let mut x_index = x_start - i32::from(self.vram.row_scroll(bank, row_index as usize));

            let src = pixmap.row(src_y as usize);
            let flags = flagsmap.row(src_y as usize);
            for out in &mut line {
                let x = (x_index & ROAD_WIDTH_MASK) as usize;
                *out = if mode == DrawMode::Opaque || flags[x] != 0 {
                    if self.road_colors { road_pixel_color(src[x], line_color) } else { src[x] }
                } else {
                    TRANSPARENT_PIXEL
                };
                x_index += 1;
            }

            scanline::draw_scanline(target, y, &line, mode == DrawMode::Transparent, priority);
            y_index += 1;
        }
    }
}
