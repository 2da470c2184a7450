//! Taito PC080SN tilemap generator
//!
//! Two 8x8-tile tilemaps (BG and FG) fetched from a shared 64KB VRAM, each with its own X/Y
//! scroll, plus a screen flip control bit. In the standard layout each tilemap also has a
//! 256-entry row scroll table; Top Speed combines that with a per-scanline color table to draw
//! its road. Darius runs three of these chips with double width tilemaps.
//!
//! The CPU sees four windows: VRAM, X scroll (one word per tilemap), Y scroll (one word per
//! tilemap), and the control word.

mod debug;
mod decode;
mod registers;
mod render;
mod scroll;
mod state;
mod vram;

#[cfg(test)]
mod tests;

pub use decode::{BankTiles, decode_tile};
pub use pc080sn_config::{Pc080snConfig, TilemapLayout, VRAM_LEN_WORDS};
pub use registers::{CONTROL_REGISTER_COUNT, Registers, ScrollState};
pub use render::{COLOR_CONTROL_LEN, road_pixel_color};
pub use state::SaveStateError;
pub use vram::{Vram, VramRegion};

use registers::{x_scroll_pixels, y_scroll_pixels};
use std::fmt::{Display, Formatter};
use tilemap_common::{TileGfx, Tilemap, TilemapFlip};

/// Nibble order of the PC080SN's packed 4bpp tile ROMs
pub const GFX_NIBBLE_ORDER: [u8; 8] = [2, 3, 0, 1, 6, 7, 4, 5];

// Hardware scroll 0 puts tilemap pixel 16 at the left edge of the screen
const HARDWARE_X_ORIGIN: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    Bg,
    Fg,
}

impl Bank {
    pub const ALL: [Self; 2] = [Self::Bg, Self::Fg];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Bg => 0,
            Self::Fg => 1,
        }
    }

    /// Word offset within the X or Y scroll window
    #[must_use]
    pub const fn from_offset(offset: u32) -> Option<Self> {
        match offset {
            0 => Some(Self::Bg),
            1 => Some(Self::Fg),
            _ => None,
        }
    }
}

impl Display for Bank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bg => write!(f, "BG"),
            Self::Fg => write!(f, "FG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWindow {
    XScroll,
    YScroll,
    Control,
}

#[derive(Debug, Clone)]
pub struct Pc080sn {
    config: Pc080snConfig,
    road_colors: bool,
    vram: Vram,
    registers: Registers,
    scroll: ScrollState,
    tilemaps: [Tilemap; 2],
    gfx: TileGfx,
}

impl Pc080sn {
    #[must_use]
    pub fn new(config: Pc080snConfig, gfx: TileGfx) -> Self {
        let layout = config.layout;
        let tilemaps = std::array::from_fn(|_| {
            let mut tilemap = Tilemap::new(layout.tilemap_cols(), layout.tilemap_rows());
            tilemap.set_transparent_pen(0);
            tilemap.set_scroll_dx(
                -HARDWARE_X_ORIGIN + config.x_offset,
                -HARDWARE_X_ORIGIN - config.x_offset,
            );
            tilemap.set_scroll_dy(config.y_offset, -config.y_offset);
            tilemap.set_scroll_rows(layout.scroll_rows());
            tilemap
        });

        log::debug!(
            "Created PC080SN: layout={layout}, x_offset={}, y_offset={}, y_invert={}, {} tiles",
            config.x_offset,
            config.y_offset,
            config.y_invert,
            gfx.len()
        );

        Self {
            config,
            road_colors: config.road_colors,
            vram: Vram::new(),
            registers: Registers::new(),
            scroll: ScrollState::default(),
            tilemaps,
            gfx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Pc080snConfig {
        &self.config
    }

    #[must_use]
    pub fn read_vram(&self, offset: u32) -> u16 {
        self.vram.read(offset as usize)
    }

    pub fn write_vram(&mut self, offset: u32, data: u16, mask: u16) {
        let offset = offset as usize;
        self.vram.write(offset, data, mask);

        // Row scroll writes need no invalidation; the tables are read fresh every frame
        if let VramRegion::Tile { bank, tile_index } =
            VramRegion::classify(self.config.layout, offset)
        {
            self.tilemaps[bank.index()].mark_tile_dirty(tile_index);
        }
    }

    pub fn write_x_scroll(&mut self, bank: Bank, data: u16, mask: u16) {
        let value = self.registers.write_x_scroll(bank, data, mask);
        self.scroll.x[bank.index()] = x_scroll_pixels(value);
    }

    pub fn write_y_scroll(&mut self, bank: Bank, data: u16, mask: u16) {
        let value = self.registers.write_y_scroll(bank, data, mask);
        self.scroll.y[bank.index()] = y_scroll_pixels(value, self.config.y_invert);
    }

    pub fn write_control(&mut self, data: u16, mask: u16) {
        let value = self.registers.write_control(data, mask);
        log::trace!("PC080SN control = {value:04X}");

        self.scroll.flip_screen = self.registers.flip_screen();
        self.apply_flip();
    }

    /// Write through one of the register windows, addressed by word offset
    pub fn write_register(&mut self, window: RegisterWindow, offset: u32, data: u16, mask: u16) {
        match window {
            RegisterWindow::XScroll | RegisterWindow::YScroll => {
                let Some(bank) = Bank::from_offset(offset) else {
                    log::warn!("Ignoring {window:?} write to offset {offset}: {data:04X}");
                    return;
                };

                if window == RegisterWindow::XScroll {
                    self.write_x_scroll(bank, data, mask);
                } else {
                    self.write_y_scroll(bank, data, mask);
                }
            }
            RegisterWindow::Control => {
                if offset != 0 {
                    log::warn!("Ignoring control write to offset {offset}: {data:04X}");
                    return;
                }

                self.write_control(data, mask);
            }
        }
    }

    /// Rebuild scroll and flip state from the register words alone. Must run after registers are
    /// restored and before the next draw.
    pub fn restore_scroll(&mut self) {
        self.scroll = ScrollState::from_registers(&self.registers, self.config.y_invert);
        self.apply_flip();
    }

    fn apply_flip(&mut self) {
        let flip = if self.scroll.flip_screen { TilemapFlip::BOTH } else { TilemapFlip::NONE };
        for tilemap in &mut self.tilemaps {
            tilemap.set_flip(flip);
        }
    }

    #[must_use]
    pub fn scroll_state(&self) -> ScrollState {
        self.scroll
    }

    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Override the tilemap scroll directly, for games that never program the FG scroll
    /// registers properly (Jumping). Takes effect until the next [`Self::tilemap_update`].
    pub fn set_scroll(&mut self, bank: Bank, x: i32, y: i32) {
        let tilemap = &mut self.tilemaps[bank.index()];
        tilemap.set_scroll_x(0, x);
        tilemap.set_scroll_y(y);
    }

    pub fn set_transparent_pen(&mut self, bank: Bank, pen: u8) {
        self.tilemaps[bank.index()].set_transparent_pen(pen);
    }

    pub fn set_road_colors_enabled(&mut self, enabled: bool) {
        self.road_colors = enabled;
    }

    #[must_use]
    pub fn road_colors_enabled(&self) -> bool {
        self.road_colors
    }

    #[must_use]
    pub fn tilemap(&self, bank: Bank) -> &Tilemap {
        &self.tilemaps[bank.index()]
    }

    /// Re-decode every tile invalidated since the last update, in both tilemaps
    pub fn update_tile_cache(&mut self) {
        for bank in Bank::ALL {
            self.update_bank_tiles(bank);
        }
    }

    fn update_bank_tiles(&mut self, bank: Bank) {
        let source = BankTiles { vram: &self.vram, layout: self.config.layout, bank };
        self.tilemaps[bank.index()].update(&source, &self.gfx);
    }

    fn mark_all_tiles_dirty(&mut self) {
        for tilemap in &mut self.tilemaps {
            tilemap.mark_all_dirty();
        }
    }
}
