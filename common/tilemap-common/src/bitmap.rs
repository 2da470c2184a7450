use std::cmp;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    #[must_use]
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Self::BLACK
    }
}

/// Inclusive pixel rectangle. A rectangle with `max < min` on either axis is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Rect {
    #[must_use]
    pub const fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self { min_x, max_x, min_y, max_y }
    }

    #[must_use]
    pub const fn width(self) -> i32 {
        self.max_x - self.min_x + 1
    }

    #[must_use]
    pub const fn height(self) -> i32 {
        self.max_y - self.min_y + 1
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        Self {
            min_x: cmp::max(self.min_x, other.min_x),
            max_x: cmp::min(self.max_x, other.max_x),
            min_y: cmp::max(self.min_y, other.min_y),
            max_y: cmp::min(self.max_y, other.max_y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap<T> {
    width: usize,
    height: usize,
    pixels: Vec<T>,
}

/// Palette-indexed bitmap
pub type Bitmap16 = Bitmap<u16>;

/// Per-pixel priority bits written alongside a [`Bitmap16`]
pub type PriorityBitmap = Bitmap<u8>;

impl<T: Copy + Default> Bitmap<T> {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![T::default(); width * height] }
    }

    pub fn fill(&mut self, value: T) {
        self.pixels.fill(value);
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0, self.width as i32 - 1, 0, self.height as i32 - 1)
    }

    #[inline]
    #[must_use]
    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.pixels[y * self.width + x] = value;
    }

    #[must_use]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }
}
