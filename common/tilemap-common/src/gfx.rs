//! Decoded 8x8 tile graphics

use thiserror::Error;

pub const TILE_WIDTH: usize = 8;
pub const TILE_HEIGHT: usize = 8;
pub const TILE_PIXELS: usize = TILE_WIDTH * TILE_HEIGHT;

// 8 rows of 8 nibbles
pub const PACKED_4BPP_TILE_LEN: usize = 32;

// Palette entries per color code
pub const COLOR_GRANULARITY: u32 = 16;

pub type TilePixels = [u8; TILE_PIXELS];

#[derive(Debug, Error)]
pub enum GfxDecodeError {
    #[error("gfx ROM length {len} is not a multiple of the {tile_len}-byte tile size")]
    InvalidLength { len: usize, tile_len: usize },
    #[error("gfx ROM contains no tiles")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileFlip {
    pub x: bool,
    pub y: bool,
}

impl TileFlip {
    /// Bit 0 is horizontal flip, bit 1 is vertical flip
    #[must_use]
    pub fn from_bits(bits: u16) -> Self {
        Self { x: bits & 0x01 != 0, y: bits & 0x02 != 0 }
    }
}

/// What a tile cache needs to know to render one tilemap cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileInfo {
    pub code: u32,
    pub color: u32,
    pub flip: TileFlip,
}

#[derive(Debug, Clone)]
pub struct TileGfx {
    tiles: Vec<TilePixels>,
}

impl TileGfx {
    /// Decode 4bpp tiles where each row is 4 bytes of packed nibbles. `nibble_order[x]` is the
    /// index of the nibble (high nibble of byte 0 first) holding the pen for pixel column `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM is empty or its length is not a whole number of tiles.
    pub fn decode_packed_4bpp(rom: &[u8], nibble_order: [u8; 8]) -> Result<Self, GfxDecodeError> {
        if rom.len() % PACKED_4BPP_TILE_LEN != 0 {
            return Err(GfxDecodeError::InvalidLength {
                len: rom.len(),
                tile_len: PACKED_4BPP_TILE_LEN,
            });
        }

        let tiles: Vec<_> = rom
            .chunks_exact(PACKED_4BPP_TILE_LEN)
            .map(|tile_bytes| {
                let mut pixels = [0; TILE_PIXELS];
                for (row, row_bytes) in tile_bytes.chunks_exact(4).enumerate() {
                    for (col, &nibble) in nibble_order.iter().enumerate() {
                        let byte = row_bytes[usize::from(nibble >> 1)];
                        let pen = if nibble & 1 == 0 { byte >> 4 } else { byte & 0x0F };
                        pixels[row * TILE_WIDTH + col] = pen;
                    }
                }
                pixels
            })
            .collect();

        log::debug!("Decoded {} 4bpp tiles from {} bytes of gfx ROM", tiles.len(), rom.len());

        Self::from_tiles(tiles)
    }

    /// # Errors
    ///
    /// Returns an error if `tiles` is empty.
    pub fn from_tiles(tiles: Vec<TilePixels>) -> Result<Self, GfxDecodeError> {
        if tiles.is_empty() {
            return Err(GfxDecodeError::Empty);
        }

        Ok(Self { tiles })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Codes past the end of the ROM wrap around.
    #[inline]
    #[must_use]
    pub fn tile(&self, code: u32) -> &TilePixels {
        &self.tiles[code as usize % self.tiles.len()]
    }
}
