use crate::{
    Bank, Pc080sn, Pc080snConfig, RegisterWindow, SaveStateError, ScrollState, TilemapLayout,
    VRAM_LEN_WORDS,
};
use std::io;
use test_log::test;
use tilemap_common::gfx::TILE_PIXELS;
use tilemap_common::{
    Bitmap16, DrawMode, DrawTarget, LayerPriority, PriorityBitmap, TileGfx, TilemapFlip,
};

// Tile N is filled with pen N
pub(crate) fn test_gfx() -> TileGfx {
    let tiles = (0..16).map(|code| [code as u8; TILE_PIXELS]).collect();
    TileGfx::from_tiles(tiles).unwrap()
}

pub(crate) fn new_chip_with_config(config: Pc080snConfig) -> Pc080sn {
    Pc080sn::new(config, test_gfx())
}

pub(crate) fn new_chip(layout: TilemapLayout) -> Pc080sn {
    new_chip_with_config(Pc080snConfig { layout, ..Pc080snConfig::default() })
}

// Bitmap pre-filled with 0xFFFF and priority pre-filled with 0xFF so untouched pixels stand out
pub(crate) fn draw_buffers(width: usize, height: usize) -> (Bitmap16, PriorityBitmap) {
    let mut bitmap = Bitmap16::new(width, height);
    let mut priority = PriorityBitmap::new(width, height);
    bitmap.fill(0xFFFF);
    priority.fill(0xFF);
    (bitmap, priority)
}

fn write_scene(chip: &mut Pc080sn) {
    for (i, offset) in [0x0000_u32, 0x0011, 0x2005, 0x4002, 0x4003, 0x6010].into_iter().enumerate()
    {
        chip.write_vram(offset, 0x0101 * (i as u16 + 1), 0xFFFF);
    }
    chip.write_x_scroll(Bank::Bg, 0x0123, 0xFFFF);
    chip.write_x_scroll(Bank::Fg, 0x0456, 0xFFFF);
    chip.write_y_scroll(Bank::Bg, 0x0078, 0xFFFF);
    chip.write_y_scroll(Bank::Fg, 0xFF00, 0xFFFF);
    chip.write_control(0x0001, 0xFFFF);
}

#[test]
fn masked_vram_write() {
    let mut chip = new_chip(TilemapLayout::Standard);

    chip.write_vram(0x1234, 0xABCD, 0xFFFF);
    chip.write_vram(0x1234, 0x0012, 0x00FF);
    assert_eq!(chip.read_vram(0x1234), 0xAB12);

    chip.write_vram(0x1234, 0x3400, 0xFF00);
    assert_eq!(chip.read_vram(0x1234), 0x3412);

    // Neighbors untouched
    assert_eq!(chip.read_vram(0x1233), 0);
    assert_eq!(chip.read_vram(0x1235), 0);
}

fn assert_invalidation(layout: TilemapLayout, offset: u32, expected: Option<(Bank, usize)>) {
    let mut chip = new_chip(layout);
    chip.update_tile_cache();

    chip.write_vram(offset, 0x1234, 0xFFFF);

    let dirty: Vec<_> = Bank::ALL
        .into_iter()
        .flat_map(|bank| {
            let tilemap = chip.tilemap(bank);
            (0..tilemap.tile_count())
                .filter(|&tile_index| tilemap.is_tile_dirty(tile_index))
                .map(move |tile_index| (bank, tile_index))
        })
        .collect();

    assert_eq!(dirty, expected.into_iter().collect::<Vec<_>>(), "{layout:?} offset {offset:04X}");
}

#[test]
fn standard_layout_invalidation() {
    let cases = [
        (0x0000, Some((Bank::Bg, 0))),
        (0x0001, Some((Bank::Bg, 0))),
        (0x0082, Some((Bank::Bg, 0x41))),
        (0x1FFF, Some((Bank::Bg, 0xFFF))),
        (0x2000, None),
        (0x20FF, None),
        (0x2100, None),
        (0x3FFF, None),
        (0x4000, Some((Bank::Fg, 0))),
        (0x5FFF, Some((Bank::Fg, 0xFFF))),
        (0x6000, None),
        (0x60FF, None),
        (0x6100, None),
        (0x7FFF, None),
    ];

    for (offset, expected) in cases {
        assert_invalidation(TilemapLayout::Standard, offset, expected);
    }
}

#[test]
fn double_width_layout_invalidation() {
    let cases = [
        (0x0000, Some((Bank::Bg, 0))),
        (0x1FFF, Some((Bank::Bg, 0x1FFF))),
        (0x2000, Some((Bank::Bg, 0))),
        (0x3FFF, Some((Bank::Bg, 0x1FFF))),
        (0x4000, Some((Bank::Fg, 0))),
        (0x5FFF, Some((Bank::Fg, 0x1FFF))),
        (0x6000, Some((Bank::Fg, 0))),
        (0x7FFF, Some((Bank::Fg, 0x1FFF))),
    ];

    for (offset, expected) in cases {
        assert_invalidation(TilemapLayout::DoubleWidth, offset, expected);
    }
}

#[test]
fn masked_register_writes() {
    let mut chip = new_chip(TilemapLayout::Standard);

    chip.write_x_scroll(Bank::Fg, 0x1234, 0xFFFF);
    chip.write_x_scroll(Bank::Fg, 0x00AB, 0x00FF);
    assert_eq!(chip.registers().x_scroll(Bank::Fg), 0x12AB);
    assert_eq!(chip.scroll_state().x(Bank::Fg), -0x12AB);
    assert_eq!(chip.scroll_state().x(Bank::Bg), 0);

    chip.write_y_scroll(Bank::Bg, 0x5600, 0xFF00);
    assert_eq!(chip.scroll_state().y(Bank::Bg), -0x5600);
}

#[test]
fn control_sets_screen_flip() {
    let mut chip = new_chip(TilemapLayout::Standard);

    // Games write 0x20 during init, which has no visible effect
    chip.write_control(0x0020, 0xFFFF);
    assert!(!chip.scroll_state().flip_screen);
    assert_eq!(chip.tilemap(Bank::Bg).flip(), TilemapFlip::NONE);

    chip.write_control(0x0001, 0x000F);
    assert!(chip.scroll_state().flip_screen);
    assert_eq!(chip.control_registers()[4], 0x0021);
    for bank in Bank::ALL {
        assert_eq!(chip.tilemap(bank).flip(), TilemapFlip::BOTH);
    }

    chip.write_control(0x0000, 0x00FF);
    assert_eq!(chip.tilemap(Bank::Fg).flip(), TilemapFlip::NONE);
}

#[test]
fn register_window_dispatch() {
    let mut chip = new_chip(TilemapLayout::Standard);

    chip.write_register(RegisterWindow::XScroll, 1, 0x0011, 0xFFFF);
    chip.write_register(RegisterWindow::YScroll, 0, 0x0022, 0xFFFF);
    chip.write_register(RegisterWindow::Control, 0, 0x0001, 0xFFFF);
    assert_eq!(chip.control_registers(), &[0x0000, 0x0011, 0x0022, 0x0000, 0x0001]);

    // Undecoded offsets are ignored
    chip.write_register(RegisterWindow::XScroll, 2, 0xFFFF, 0xFFFF);
    chip.write_register(RegisterWindow::Control, 1, 0x0000, 0xFFFF);
    assert_eq!(chip.control_registers(), &[0x0000, 0x0011, 0x0022, 0x0000, 0x0001]);
    assert!(chip.scroll_state().flip_screen);
}

#[test]
fn restore_scroll_is_idempotent() {
    for y_invert in [false, true] {
        let mut chip = new_chip_with_config(Pc080snConfig { y_invert, ..Pc080snConfig::default() });
        write_scene(&mut chip);
        let live = chip.scroll_state();

        chip.restore_scroll();
        assert_eq!(chip.scroll_state(), live);
        chip.restore_scroll();
        assert_eq!(chip.scroll_state(), live);
    }
}

#[test]
fn save_state_round_trip() {
    let config = Pc080snConfig { y_invert: true, ..Pc080snConfig::default() };
    let mut chip = new_chip_with_config(config);
    write_scene(&mut chip);
    chip.tilemap_update();
    chip.update_tile_cache();

    let mut bytes = Vec::new();
    chip.save_state(&mut bytes).unwrap();

    let mut restored = new_chip_with_config(config);
    restored.load_state(bytes.as_slice()).unwrap();

    assert_eq!(restored.vram(), chip.vram());
    assert_eq!(restored.control_registers(), chip.control_registers());
    assert_eq!(restored.scroll_state(), chip.scroll_state());

    // Every tile is rebuilt from VRAM on the next update
    assert_eq!(restored.tilemap(Bank::Fg).dirty_tile_count(), 64 * 64);
    restored.tilemap_update();
    restored.update_tile_cache();
    for bank in Bank::ALL {
        assert_eq!(restored.tilemap(bank).pixmap(), chip.tilemap(bank).pixmap());
        assert_eq!(restored.tilemap(bank).flip(), chip.tilemap(bank).flip());
        assert_eq!(restored.tilemap(bank).scroll_y(), chip.tilemap(bank).scroll_y());
    }
}

// Accepts `limit` bytes, then fails every write
struct FailingWriter {
    written: usize,
    limit: usize,
}

impl io::Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written >= self.limit {
            return Err(io::Error::other("device full"));
        }

        let len = buf.len().min(self.limit - self.written);
        self.written += len;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn save_state_reports_short_write() {
    let mut chip = new_chip(TilemapLayout::Standard);
    write_scene(&mut chip);

    // Everything but the register words fits
    let mut writer = FailingWriter { written: 0, limit: 2 * VRAM_LEN_WORDS };
    let result = chip.save_state(&mut writer);

    assert!(matches!(result, Err(SaveStateError::Io { .. })), "{result:?}");
    assert_eq!(writer.written, 2 * VRAM_LEN_WORDS);
}

#[test]
fn load_state_leaves_trailing_data() {
    let mut chip = new_chip(TilemapLayout::Standard);
    write_scene(&mut chip);

    let mut bytes = Vec::new();
    chip.save_state(&mut bytes).unwrap();
    bytes.extend_from_slice(b"NEXT-DEVICE-STATE");

    let mut stream = bytes.as_slice();
    let mut restored = new_chip(TilemapLayout::Standard);
    restored.load_state(&mut stream).unwrap();

    assert_eq!(stream, b"NEXT-DEVICE-STATE");
    assert_eq!(restored.control_registers(), chip.control_registers());
}

#[test]
fn several_chips_share_one_stream() {
    let mut chips: Vec<_> = (0..3).map(|_| new_chip(TilemapLayout::DoubleWidth)).collect();
    for (i, chip) in chips.iter_mut().enumerate() {
        chip.write_vram(0x100, 0x1000 + i as u16, 0xFFFF);
        chip.write_x_scroll(Bank::Bg, 0x20 * i as u16, 0xFFFF);
    }

    let mut bytes = Vec::new();
    for chip in &chips {
        chip.save_state(&mut bytes).unwrap();
    }

    let mut stream = bytes.as_slice();
    for chip in &chips {
        let mut restored = new_chip(TilemapLayout::DoubleWidth);
        restored.load_state(&mut stream).unwrap();
        assert_eq!(restored.vram(), chip.vram());
        assert_eq!(restored.scroll_state(), chip.scroll_state());
    }
    assert!(stream.is_empty());
}

#[test]
fn truncated_state_leaves_chip_untouched() {
    let mut chip = new_chip(TilemapLayout::Standard);
    write_scene(&mut chip);
    let mut bytes = Vec::new();
    chip.save_state(&mut bytes).unwrap();

    let mut other = new_chip(TilemapLayout::Standard);
    other.write_vram(0x10, 0x5555, 0xFFFF);

    let result = other.load_state(&bytes[..bytes.len() - 4]);
    assert!(matches!(result, Err(SaveStateError::Deserialization { .. })), "{result:?}");
    assert_eq!(other.read_vram(0x10), 0x5555);
    assert_eq!(other.scroll_state(), ScrollState::default());
}

#[test]
fn raw_state_waits_for_restore_scroll() {
    let mut chip = new_chip(TilemapLayout::Standard);
    write_scene(&mut chip);

    let mut restored = new_chip(TilemapLayout::Standard);
    restored.update_tile_cache();
    restored.load_raw_state(chip.vram(), chip.control_registers()).unwrap();

    assert_eq!(restored.vram(), chip.vram());
    assert_eq!(restored.tilemap(Bank::Bg).dirty_tile_count(), 64 * 64);
    assert_eq!(restored.scroll_state(), ScrollState::default());

    restored.restore_scroll();
    assert_eq!(restored.scroll_state(), chip.scroll_state());
}

#[test]
fn raw_state_rejects_wrong_vram_size() {
    let mut chip = new_chip(TilemapLayout::Standard);
    let result = chip.load_raw_state(&[0; 0x4000], &[0; 5]);

    assert!(
        matches!(
            result,
            Err(SaveStateError::VramLength { expected: VRAM_LEN_WORDS, actual: 0x4000 })
        ),
        "{result:?}"
    );
}

#[test]
fn draw_places_tiles_at_hardware_origin() {
    let mut chip = new_chip(TilemapLayout::Standard);
    // BG tile index 2: code 7, color 3
    chip.write_vram(4, 0x0003, 0xFFFF);
    chip.write_vram(5, 0x0007, 0xFFFF);
    chip.tilemap_update();

    let (mut bitmap, mut priority) = draw_buffers(24, 8);
    let clip = bitmap.bounds();
    chip.draw(
        Bank::Bg,
        &mut DrawTarget { bitmap: &mut bitmap, priority: &mut priority, clip },
        DrawMode::Transparent,
        LayerPriority::new(0x02, 0x00),
    );

    assert_eq!(bitmap.row(0)[..8], [0x37; 8]);
    assert_eq!(bitmap.get(8, 0), 0xFFFF);
    assert_eq!(priority.get(0, 7), 0x02);
    assert_eq!(priority.get(8, 0), 0xFF);

    // The scroll registers are negated, so increasing X scroll moves the layer right
    chip.write_x_scroll(Bank::Bg, 0x0008, 0xFFFF);
    chip.tilemap_update();
    let (mut bitmap, mut priority) = draw_buffers(24, 8);
    chip.draw(
        Bank::Bg,
        &mut DrawTarget { bitmap: &mut bitmap, priority: &mut priority, clip },
        DrawMode::Opaque,
        LayerPriority::default(),
    );
    assert_eq!(bitmap.get(0, 0), 0x0000);
    assert_eq!(bitmap.get(7, 0), 0x0000);
    assert_eq!(bitmap.row(0)[8..16], [0x37; 8]);
}

#[test]
fn draw_picks_up_vram_writes() {
    let mut chip = new_chip(TilemapLayout::DoubleWidth);
    chip.tilemap_update();

    let (mut bitmap, mut priority) = draw_buffers(8, 8);
    let clip = bitmap.bounds();

    // FG tile index 2 in the double width layout: attribute plane 0x4000, code plane 0x6000
    chip.write_vram(0x4002, 0x0001, 0xFFFF);
    chip.write_vram(0x6002, 0x000C, 0xFFFF);
    chip.draw(
        Bank::Fg,
        &mut DrawTarget { bitmap: &mut bitmap, priority: &mut priority, clip },
        DrawMode::Transparent,
        LayerPriority::default(),
    );

    assert_eq!(bitmap.get(0, 0), 0x1C);
    assert_eq!(chip.tilemap(Bank::Fg).dirty_tile_count(), 0);
    assert!(chip.tilemap(Bank::Bg).dirty_tile_count() > 0);
}

#[test]
fn register_dump_lists_both_banks() {
    let mut chip = new_chip(TilemapLayout::Standard);
    chip.write_x_scroll(Bank::Fg, 0x0010, 0xFFFF);
    chip.write_control(0x0001, 0xFFFF);

    let mut groups = Vec::new();
    chip.dump_registers(|name, fields| {
        groups.push((
            name.to_string(),
            fields.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect::<Vec<_>>(),
        ));
    });

    let names: Vec<_> = groups.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["Configuration", "BG scroll", "FG scroll", "Control"]);

    let fg = &groups[2].1;
    assert!(fg.contains(&("X scroll register".into(), "$0010".into())));
    assert!(fg.contains(&("Tilemap X scroll".into(), "-16".into())));
    assert!(groups[3].1.contains(&("Screen flipped".into(), "true".into())));
}

fn offset_config() -> Pc080snConfig {
    Pc080snConfig { x_offset: 3, y_offset: 2, ..Pc080snConfig::default() }
}

// BG tile at column 4, row 1: code 9, color 2
fn offset_chip(flip: bool) -> Pc080sn {
    let mut chip = new_chip_with_config(offset_config());
    chip.write_vram(2 * 68, 0x0002, 0xFFFF);
    chip.write_vram(2 * 68 + 1, 0x0009, 0xFFFF);
    chip.write_control(u16::from(flip), 0xFFFF);
    chip.tilemap_update();
    chip
}

fn draw_offset_chip(chip: &mut Pc080sn, extra: Option<(i32, i32)>) -> Bitmap16 {
    let (mut bitmap, mut priority) = draw_buffers(32, 16);
    let clip = bitmap.bounds();
    let mut target = DrawTarget { bitmap: &mut bitmap, priority: &mut priority, clip };
    match extra {
        Some((dx, dy)) => chip.draw_with_offset(
            Bank::Bg,
            &mut target,
            DrawMode::Transparent,
            LayerPriority::default(),
            dx,
            dy,
        ),
        None => chip.draw(Bank::Bg, &mut target, DrawMode::Transparent, LayerPriority::default()),
    }
    bitmap
}

// Bounding box of every pixel equal to `value`
fn find_pixels(bitmap: &Bitmap16, value: u16) -> (usize, usize, usize, usize) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for y in 0..bitmap.height() {
        for x in 0..bitmap.width() {
            if bitmap.get(x, y) == value {
                xs.push(x);
                ys.push(y);
            }
        }
    }
    (
        *xs.iter().min().unwrap(),
        *xs.iter().max().unwrap(),
        *ys.iter().min().unwrap(),
        *ys.iter().max().unwrap(),
    )
}

#[test]
fn alignment_offsets_unflipped() {
    let mut chip = offset_chip(false);
    assert_eq!(chip.tilemap(Bank::Bg).scroll_dx(), (-13, -19));
    assert_eq!(chip.tilemap(Bank::Bg).scroll_dy(), (2, -2));

    // Destination x maps to pixmap x + 16 - 3, destination y to pixmap y - 2
    let bitmap = draw_offset_chip(&mut chip, None);
    assert_eq!(find_pixels(&bitmap, 0x29), (19, 26, 10, 15));
}

#[test]
fn alignment_offsets_flipped() {
    let mut chip = offset_chip(true);

    // Flipped origin is screen_size - tilemap_size - (flipped_offset - scroll):
    // x: 32 - 512 - (-19 - 0) = -461, so pixmap x = 511 - ((x + 461) % 512) = 50 - x
    // y: 16 - 512 - (-2 - 0) = -494, so pixmap y = 511 - ((y + 494) % 512) = 17 - y
    let bitmap = draw_offset_chip(&mut chip, None);
    assert_eq!(find_pixels(&bitmap, 0x29), (11, 18, 2, 9));
    assert_eq!(bitmap.get(10, 5), 0xFFFF);
    assert_eq!(bitmap.get(19, 5), 0xFFFF);
}

#[test]
fn draw_with_offset_under_flip() {
    let mut chip = offset_chip(true);

    // Flipped offsets become (-15, -1): pixmap x = 46 - x, pixmap y = 16 - y
    let bitmap = draw_offset_chip(&mut chip, Some((4, 1)));
    assert_eq!(find_pixels(&bitmap, 0x29), (7, 14, 1, 8));

    assert_eq!(chip.tilemap(Bank::Bg).scroll_dx(), (-13, -19));
    assert_eq!(chip.tilemap(Bank::Bg).scroll_dy(), (2, -2));
    let bitmap = draw_offset_chip(&mut chip, None);
    assert_eq!(find_pixels(&bitmap, 0x29), (11, 18, 2, 9));
}

#[test]
fn construction_follows_config() {
    for (layout, cols, width) in
        [(TilemapLayout::Standard, 64, 512), (TilemapLayout::DoubleWidth, 128, 1024)]
    {
        let config = Pc080snConfig { layout, road_colors: false, ..offset_config() };
        let mut chip = new_chip_with_config(config);
        assert_eq!(chip.config(), &config);
        assert!(!chip.road_colors_enabled());

        for bank in Bank::ALL {
            let tilemap = chip.tilemap(bank);
            assert_eq!((tilemap.cols(), tilemap.rows()), (cols, 64));
            assert_eq!((tilemap.pixel_width(), tilemap.pixel_height()), (width, 512));
            assert_eq!(tilemap.scroll_rows(), layout.scroll_rows());
            assert_eq!(tilemap.transparent_pen(), 0);
        }

        chip.set_road_colors_enabled(true);
        assert!(chip.road_colors_enabled());

        chip.update_tile_cache();
        chip.set_transparent_pen(Bank::Fg, 15);
        assert_eq!(chip.tilemap(Bank::Fg).transparent_pen(), 15);
        assert_eq!(chip.tilemap(Bank::Fg).dirty_tile_count(), cols * 64);
        assert_eq!(chip.tilemap(Bank::Bg).dirty_tile_count(), 0);
    }
}
