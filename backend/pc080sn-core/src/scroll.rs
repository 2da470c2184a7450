use crate::vram::ROW_SCROLL_TABLE_LEN;
use crate::{Bank, Pc080sn};

// Tilemaps are 512 pixels tall in both layouts
pub(crate) const ROW_MASK: i32 = 0x1FF;

impl Pc080sn {
    /// Push the current scroll values into both tilemaps. Call once per frame after all register
    /// and VRAM writes for the frame and before drawing.
    ///
    /// Row scroll table entry N is the offset for the Nth line of the visible tilemap, so it is
    /// applied to tilemap row `N + scroll_y`; this keeps line effects attached to the screen
    /// while the layer scrolls vertically.
    pub fn tilemap_update(&mut self) {
        for bank in Bank::ALL {
            let scroll_x = self.scroll.x(bank);
            let scroll_y = self.scroll.y(bank);
            let tilemap = &mut self.tilemaps[bank.index()];

            tilemap.set_scroll_y(scroll_y);

            if self.config.layout.has_row_scroll() {
                for line in 0..ROW_SCROLL_TABLE_LEN {
                    let row = (line as i32 + scroll_y) & ROW_MASK;
                    let row_scroll = i32::from(self.vram.row_scroll(bank, line));
                    tilemap.set_scroll_x(row as usize, scroll_x - row_scroll);
                }
            } else {
                tilemap.set_scroll_x(0, scroll_x);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::{new_chip, new_chip_with_config};
    use crate::{Bank, Pc080snConfig, TilemapLayout};
    use test_log::test;

    #[test]
    fn row_scroll_follows_vertical_scroll() {
        let mut chip = new_chip(TilemapLayout::Standard);

        // -0xFFFB is 5 modulo the tilemap height
        chip.write_y_scroll(Bank::Bg, 0xFFFB, 0xFFFF);
        chip.write_x_scroll(Bank::Bg, 0x0010, 0xFFFF);
        chip.tilemap_update();

        let tilemap = chip.tilemap(Bank::Bg);
        assert_eq!(tilemap.scroll_y(), -0xFFFB);
        assert_eq!(tilemap.scroll_x(5), -0x10);
        assert_eq!(tilemap.scroll_x(5 + 255), -0x10);
        // Rows outside the 256 visible lines keep their old value
        assert_eq!(tilemap.scroll_x(4), 0);
    }

    #[test]
    fn row_scroll_table_subtracts() {
        let mut chip = new_chip(TilemapLayout::Standard);

        chip.write_vram(0x2000, 0x0003, 0xFFFF);
        chip.write_vram(0x2000 + 10, 0x0100, 0xFFFF);
        chip.write_vram(0x6000 + 1, 0x0007, 0xFFFF);
        chip.write_x_scroll(Bank::Fg, 0x0020, 0xFFFF);
        chip.write_y_scroll(Bank::Fg, 0x01FF, 0xFFFF);
        chip.tilemap_update();

        let bg = chip.tilemap(Bank::Bg);
        assert_eq!(bg.scroll_x(0), -3);
        assert_eq!(bg.scroll_x(10), -0x100);
        assert_eq!(bg.scroll_x(11), 0);

        // FG scroll Y is -0x1FF, which is row 1 modulo 512; table entry 1 lands on row 2
        let fg = chip.tilemap(Bank::Fg);
        assert_eq!(fg.scroll_x(1), -0x20);
        assert_eq!(fg.scroll_x(2), -0x20 - 7);
    }

    #[test]
    fn double_width_uses_single_scroll() {
        let mut chip = new_chip(TilemapLayout::DoubleWidth);

        // In this layout 0x2000 is a tile code word, not row scroll
        chip.write_vram(0x2000, 0x0003, 0xFFFF);
        chip.write_x_scroll(Bank::Bg, 0x0040, 0xFFFF);
        chip.write_y_scroll(Bank::Bg, 0x0008, 0xFFFF);
        chip.tilemap_update();

        let tilemap = chip.tilemap(Bank::Bg);
        assert_eq!(tilemap.scroll_rows(), 1);
        assert_eq!(tilemap.scroll_x(0), -0x40);
        assert_eq!(tilemap.scroll_y(), -0x08);
    }

    #[test]
    fn y_invert_applies_to_tilemap_scroll() {
        let config = Pc080snConfig { y_invert: true, ..Pc080snConfig::default() };
        let mut chip = new_chip_with_config(config);

        chip.write_y_scroll(Bank::Bg, 0x0005, 0xFFFF);
        chip.tilemap_update();

        let tilemap = chip.tilemap(Bank::Bg);
        assert_eq!(tilemap.scroll_y(), -0xFFFB);
        assert_eq!(tilemap.scroll_x(5), 0);
    }

    #[test]
    fn manual_scroll_override() {
        let mut chip = new_chip(TilemapLayout::DoubleWidth);
        chip.tilemap_update();
        chip.set_scroll(Bank::Fg, 12, -34);

        let tilemap = chip.tilemap(Bank::Fg);
        assert_eq!(tilemap.scroll_x(0), 12);
        assert_eq!(tilemap.scroll_y(), -34);

        chip.tilemap_update();
        assert_eq!(chip.tilemap(Bank::Fg).scroll_x(0), 0);
    }
}
