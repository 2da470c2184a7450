use crate::Bank;
use crate::vram::{UPPER_PLANE_OFFSET, Vram};
use pc080sn_config::TilemapLayout;
use tilemap_common::{TileFlip, TileInfo, TileSource};

const CODE_MASK: u16 = 0x3FFF;
const COLOR_MASK: u16 = 0x01FF;

/// Attribute word: bit 15 = Y flip, bit 14 = X flip, bits 8-0 = color
#[must_use]
pub fn decode_tile(vram: &Vram, layout: TilemapLayout, bank: Bank, tile_index: usize) -> TileInfo {
    let base = bank.vram_base();
    let (attr, code) = match layout {
        TilemapLayout::Standard => {
            (vram.read(base + 2 * tile_index), vram.read(base + 2 * tile_index + 1))
        }
        TilemapLayout::DoubleWidth => {
            (vram.read(base + tile_index), vram.read(base + UPPER_PLANE_OFFSET + tile_index))
        }
    };

    TileInfo {
        code: (code & CODE_MASK).into(),
        color: (attr & COLOR_MASK).into(),
        flip: TileFlip::from_bits(attr >> 14),
    }
}

/// One bank's view of VRAM, handed to the tile cache when it needs to re-render tiles
#[derive(Debug, Clone, Copy)]
pub struct BankTiles<'a> {
    pub vram: &'a Vram,
    pub layout: TilemapLayout,
    pub bank: Bank,
}

impl TileSource for BankTiles<'_> {
    fn tile_info(&self, tile_index: usize) -> TileInfo {
        decode_tile(self.vram, self.layout, self.bank, tile_index)
    }
}
