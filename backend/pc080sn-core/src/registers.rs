use crate::Bank;
use crate::vram::combine_data;
use bincode::{Decode, Encode};

pub const CONTROL_REGISTER_COUNT: usize = 5;

const X_SCROLL_BASE: usize = 0;
const Y_SCROLL_BASE: usize = 2;
const CONTROL: usize = 4;

/// Raw scroll and control words as last written by the CPU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Registers {
    words: [u16; CONTROL_REGISTER_COUNT],
}

impl Registers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_words(words: [u16; CONTROL_REGISTER_COUNT]) -> Self {
        Self { words }
    }

    #[must_use]
    pub fn words(&self) -> &[u16; CONTROL_REGISTER_COUNT] {
        &self.words
    }

    fn write(&mut self, idx: usize, data: u16, mask: u16) -> u16 {
        self.words[idx] = combine_data(self.words[idx], data, mask);
        self.words[idx]
    }

    /// Returns the merged register value
    pub fn write_x_scroll(&mut self, bank: Bank, data: u16, mask: u16) -> u16 {
        self.write(X_SCROLL_BASE + bank.index(), data, mask)
    }

    pub fn write_y_scroll(&mut self, bank: Bank, data: u16, mask: u16) -> u16 {
        self.write(Y_SCROLL_BASE + bank.index(), data, mask)
    }

    pub fn write_control(&mut self, data: u16, mask: u16) -> u16 {
        self.write(CONTROL, data, mask)
    }

    #[must_use]
    pub fn x_scroll(&self, bank: Bank) -> u16 {
        self.words[X_SCROLL_BASE + bank.index()]
    }

    #[must_use]
    pub fn y_scroll(&self, bank: Bank) -> u16 {
        self.words[Y_SCROLL_BASE + bank.index()]
    }

    #[must_use]
    pub fn control(&self) -> u16 {
        self.words[CONTROL]
    }

    // Only bit 0 of the control word does anything; games also poke 0x20 during init
    #[must_use]
    pub fn flip_screen(&self) -> bool {
        self.control() & 0x0001 != 0
    }
}

#[inline]
#[must_use]
pub(crate) fn x_scroll_pixels(raw: u16) -> i32 {
    -i32::from(raw)
}

#[inline]
#[must_use]
pub(crate) fn y_scroll_pixels(raw: u16, y_invert: bool) -> i32 {
    let raw = if y_invert { raw.wrapping_neg() } else { raw };
    -i32::from(raw)
}

/// Scroll values and screen flip derived from [`Registers`], in tilemap pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollState {
    pub x: [i32; 2],
    pub y: [i32; 2],
    pub flip_screen: bool,
}

impl ScrollState {
    /// Depends only on the register words and the y-invert wiring.
    #[must_use]
    pub fn from_registers(registers: &Registers, y_invert: bool) -> Self {
        Self {
            x: Bank::ALL.map(|bank| x_scroll_pixels(registers.x_scroll(bank))),
            y: Bank::ALL.map(|bank| y_scroll_pixels(registers.y_scroll(bank), y_invert)),
            flip_screen: registers.flip_screen(),
        }
    }

    #[inline]
    #[must_use]
    pub fn x(&self, bank: Bank) -> i32 {
        self.x[bank.index()]
    }

    #[inline]
    #[must_use]
    pub fn y(&self, bank: Bank) -> i32 {
        self.y[bank.index()]
    }
}
