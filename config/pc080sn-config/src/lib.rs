use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};

/// VRAM size in 16-bit words (64KB)
pub const VRAM_LEN_WORDS: usize = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TilemapLayout {
    /// Two 64x64 tilemaps with interleaved attribute/code words and row scroll tables
    #[default]
    Standard,
    /// Two 128x64 tilemaps with separate attribute and code word planes (Darius)
    DoubleWidth,
}

impl Display for TilemapLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard (64x64)"),
            Self::DoubleWidth => write!(f, "Double width (128x64)"),
        }
    }
}

impl TilemapLayout {
    #[must_use]
    pub const fn tilemap_cols(self) -> usize {
        match self {
            Self::Standard => 64,
            Self::DoubleWidth => 128,
        }
    }

    #[must_use]
    pub const fn tilemap_rows(self) -> usize {
        64
    }

    /// Number of independently horizontally scrollable pixel rows in each tilemap
    #[must_use]
    pub const fn scroll_rows(self) -> usize {
        match self {
            Self::Standard => 512,
            Self::DoubleWidth => 1,
        }
    }

    #[must_use]
    pub const fn has_row_scroll(self) -> bool {
        matches!(self, Self::Standard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Pc080snConfig {
    pub layout: TilemapLayout,
    /// Horizontal pixel alignment applied on top of the hardware's 16px origin
    pub x_offset: i32,
    /// Vertical pixel alignment
    pub y_offset: i32,
    /// Some boards wire the Y scroll registers inverted
    pub y_invert: bool,
    /// Recolor road pixels in the per-scanline road draw
    pub road_colors: bool,
}

impl Default for Pc080snConfig {
    fn default() -> Self {
        Self {
            layout: TilemapLayout::default(),
            x_offset: 0,
            y_offset: 0,
            y_invert: false,
            road_colors: true,
        }
    }
}
