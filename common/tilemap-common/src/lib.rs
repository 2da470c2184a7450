//! Generic tile rendering pieces shared by tilemap chip cores: indexed bitmaps, decoded tile
//! graphics, a dirty-tracking tilemap cache, and a scanline blitter.

pub mod bitmap;
pub mod gfx;
pub mod scanline;
pub mod tilemap;

pub use bitmap::{Bitmap, Bitmap16, Color, PriorityBitmap, Rect};
pub use gfx::{TileFlip, TileGfx, TileInfo};
pub use tilemap::{DrawMode, DrawTarget, LayerPriority, TileSource, Tilemap, TilemapFlip};
