//! PC080SN VRAM: 32K words shared by both tilemaps.
//!
//! Standard layout (word offsets):
//! * `0000-1FFF`: BG tiles, attribute word then code word per tile
//! * `2000-20FF`: BG row scroll
//! * `4000-5FFF`: FG tiles
//! * `6000-60FF`: FG row scroll
//!
//! Double width layout:
//! * `0000-1FFF`: BG attribute words, `2000-3FFF`: BG code words
//! * `4000-5FFF`: FG attribute words, `6000-7FFF`: FG code words

use crate::Bank;
use bincode::de::{BorrowDecoder, Decoder};
use bincode::error::DecodeError;
use bincode::{BorrowDecode, Decode, Encode};
use pc080sn_config::{TilemapLayout, VRAM_LEN_WORDS};

// Both layouts start the FG tilemap halfway through VRAM
const FG_BASE: usize = 0x4000;

// Row scroll table / code word plane, relative to the start of a bank
pub(crate) const UPPER_PLANE_OFFSET: usize = 0x2000;

pub(crate) const ROW_SCROLL_TABLE_LEN: usize = 0x100;

/// Only the bits set in `mask` are taken from `data`.
#[inline]
#[must_use]
pub(crate) fn combine_data(old: u16, data: u16, mask: u16) -> u16 {
    (old & !mask) | (data & mask)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VramRegion {
    Tile { bank: Bank, tile_index: usize },
    RowScroll { bank: Bank, line: usize },
    Unused,
}

impl VramRegion {
    /// Which tilemap cell (if any) a word offset belongs to
    #[must_use]
    pub fn classify(layout: TilemapLayout, offset: usize) -> Self {
        match layout {
            TilemapLayout::Standard => match offset {
                0x0000..=0x1FFF => Self::Tile { bank: Bank::Bg, tile_index: offset / 2 },
                0x2000..=0x20FF => Self::RowScroll { bank: Bank::Bg, line: offset & 0xFF },
                0x4000..=0x5FFF => {
                    Self::Tile { bank: Bank::Fg, tile_index: (offset & 0x1FFF) / 2 }
                }
                0x6000..=0x60FF => Self::RowScroll { bank: Bank::Fg, line: offset & 0xFF },
                _ => Self::Unused,
            },
            TilemapLayout::DoubleWidth => match offset {
                0x0000..=0x3FFF => Self::Tile { bank: Bank::Bg, tile_index: offset & 0x1FFF },
                0x4000..=0x7FFF => Self::Tile { bank: Bank::Fg, tile_index: offset & 0x1FFF },
                _ => Self::Unused,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode)]
pub struct Vram(Box<[u16; VRAM_LEN_WORDS]>);

impl Vram {
    #[must_use]
    pub fn new() -> Self {
        Self(Box::new([0; VRAM_LEN_WORDS]))
    }

    #[inline]
    #[must_use]
    pub fn read(&self, offset: usize) -> u16 {
        self.0[offset]
    }

    #[inline]
    pub fn write(&mut self, offset: usize, data: u16, mask: u16) {
        self.0[offset] = combine_data(self.0[offset], data, mask);
    }

    /// Row scroll value for the given line of the bank's table. Lines past the 256-entry table
    /// read whatever follows it in VRAM.
    #[inline]
    #[must_use]
    pub fn row_scroll(&self, bank: Bank, line: usize) -> u16 {
        self.0[bank.vram_base() + UPPER_PLANE_OFFSET + line]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        self.0.as_slice()
    }

    pub(crate) fn copy_from_slice(&mut self, words: &[u16]) {
        self.0.copy_from_slice(words);
    }
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

// Decode straight into the heap allocation instead of going through a 64KB stack array
impl<Context> Decode<Context> for Vram {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let mut vram = Self::new();
        for word in vram.0.iter_mut() {
            *word = u16::decode(decoder)?;
        }
        Ok(vram)
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for Vram {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        let mut vram = Self::new();
        for word in vram.0.iter_mut() {
            *word = u16::decode(decoder)?;
        }
        Ok(vram)
    }
}

impl Bank {
    #[must_use]
    pub const fn vram_base(self) -> usize {
        match self {
            Self::Bg => 0,
            Self::Fg => FG_BASE,
        }
    }
}
