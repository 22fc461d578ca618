use image::{RgbaImage, imageops};

use crate::flip::mirror;
use crate::model::{PlacementRecord, Rect};

/// Blit the `src_rect` region of `src` into `canvas` at destination (dx, dy),
/// optionally rotated 90° clockwise. Pixels falling outside `canvas` are dropped.
pub fn blit_rgba(
    src: &RgbaImage,
    src_rect: Rect,
    canvas: &mut RgbaImage,
    dx: u32,
    dy: u32,
    rotated: bool,
) {
    let (cw, ch) = canvas.dimensions();
    let Rect {
        x: sx,
        y: sy,
        w: sw,
        h: sh,
    } = src_rect;
    // destination (rendered) size may differ when rotated
    let (rw, rh) = if rotated { (sh, sw) } else { (sw, sh) };

    for yy in 0..rh {
        for xx in 0..rw {
            let (ix, iy) = if rotated {
                (sx + yy, sy + (sh - 1 - xx))
            } else {
                (sx + xx, sy + yy)
            };
            if dx + xx < cw && dy + yy < ch {
                let px = *src.get_pixel(ix, iy);
                canvas.put_pixel(dx + xx, dy + yy, px);
            }
        }
    }
}

/// Reconstructs the original sprite described by `record` from its page.
///
/// Undoes rotation, then the flip relative to the canonical pixels, then re-inserts the trimmed
/// content at `trim_offset` inside a transparent `source_size` buffer.
pub fn extract_sprite(page: &RgbaImage, record: &PlacementRecord) -> RgbaImage {
    let frame = record.frame();
    let stored = imageops::crop_imm(page, frame.x, frame.y, frame.w, frame.h).to_image();
    let upright = if record.rotated {
        imageops::rotate270(&stored)
    } else {
        stored
    };
    let content = match record.flip_of {
        Some(r) => mirror(&upright, r.flip_h, r.flip_v),
        None => upright,
    };

    let (sw, sh) = record.source_size;
    let mut out = RgbaImage::new(sw, sh);
    let (ox, oy) = record.trim_offset;
    imageops::replace(&mut out, &content, ox as i64, oy as i64);
    out
}
