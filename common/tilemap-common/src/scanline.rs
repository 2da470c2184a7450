use crate::tilemap::{DrawTarget, LayerPriority};

/// Line buffer value meaning "nothing here"
pub const TRANSPARENT_PIXEL: u16 = 0x8000;

/// Copy a prepared line buffer into row `y` of the target. `line[0]` lands on the left edge of
/// the clip rectangle. In transparent mode, values at or above 0x7FFF are skipped.
pub fn draw_scanline(
    target: &mut DrawTarget<'_>,
    y: i32,
    line: &[u16],
    transparent: bool,
    priority: LayerPriority,
) {
    let clip = target.effective_clip();
    if clip.is_empty() || y < clip.min_y || y > clip.max_y {
        return;
    }

    let start = clip.min_x as usize;
    let len = clip.width() as usize;
    let dest = &mut target.bitmap.row_mut(y as usize)[start..start + len];
    let pri = &mut target.priority.row_mut(y as usize)[start..start + len];

    for ((dest_pixel, pri_pixel), &pixel) in dest.iter_mut().zip(pri).zip(line) {
        if transparent && pixel >= 0x7FFF {
            continue;
        }

        *dest_pixel = pixel;
        *pri_pixel = priority.merge(*pri_pixel);
    }
}
