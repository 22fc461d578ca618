use atlas_toolbox_core::geometry::{compute_trim_rect, transform};
use atlas_toolbox_core::prelude::*;
use image::{Rgba, RgbaImage};

/// `w x h` transparent image with an opaque block at `block`.
fn framed(w: u32, h: u32, block: Rect, alpha: u8) -> RgbaImage {
    let mut img = RgbaImage::new(w, h);
    for y in block.y..block.bottom() {
        for x in block.x..block.right() {
            img.put_pixel(x, y, Rgba([200, 100, 50, alpha]));
        }
    }
    img
}

#[test]
fn trim_rect_is_the_tight_box() {
    let img = framed(20, 16, Rect::new(3, 5, 7, 4), 255);
    assert_eq!(compute_trim_rect(&img, 0), Some(Rect::new(3, 5, 7, 4)));
}

#[test]
fn single_pixel_and_full_images() {
    let mut img = RgbaImage::new(9, 9);
    img.put_pixel(8, 0, Rgba([0, 0, 0, 1]));
    assert_eq!(compute_trim_rect(&img, 0), Some(Rect::new(8, 0, 1, 1)));

    let full = RgbaImage::from_pixel(5, 3, Rgba([1, 2, 3, 255]));
    assert_eq!(compute_trim_rect(&full, 0), Some(Rect::new(0, 0, 5, 3)));
    assert_eq!(compute_trim_rect(&RgbaImage::new(4, 4), 0), None);
}

#[test]
fn threshold_treats_faint_pixels_as_transparent() {
    let mut img = framed(12, 12, Rect::new(4, 4, 2, 2), 255);
    // faint halo around the block
    for x in 2..8 {
        img.put_pixel(x, 2, Rgba([0, 0, 0, 20]));
    }
    assert_eq!(compute_trim_rect(&img, 0), Some(Rect::new(2, 2, 6, 4)));
    assert_eq!(compute_trim_rect(&img, 20), Some(Rect::new(4, 4, 2, 2)));
    assert_eq!(compute_trim_rect(&img, 255), None);
}

#[test]
fn transform_records_trim_metadata_and_padding() {
    let sprites = vec![Sprite::new("a", framed(30, 20, Rect::new(5, 2, 10, 12), 255)).with_group("ui")];
    let cfg = AtlasConfig::builder().padding(3).build();
    let prepared = transform(&sprites, &cfg);
    assert_eq!(prepared.items.len(), 1);
    assert_eq!((prepared.items[0].w, prepared.items[0].h), (16, 18));
    let entry = &prepared.entries[0];
    assert_eq!(entry.source, Rect::new(5, 2, 10, 12));
    assert_eq!(entry.source_size, (30, 20));
    assert_eq!(entry.pixels.dimensions(), (10, 12));
    assert_eq!(entry.group.as_deref(), Some("ui"));
}

#[test]
fn trim_off_keeps_the_full_frame() {
    let sprites = vec![Sprite::new("a", framed(30, 20, Rect::new(5, 2, 10, 12), 255))];
    let cfg = AtlasConfig::builder().trim(false).padding(0).build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("pack");
    let r = out.records().next().expect("record");
    assert_eq!((r.w, r.h), (30, 20));
    assert_eq!(r.trim_offset, (0, 0));
    assert!(!r.trimmed());
}

#[test]
fn transparent_sprite_is_skipped_with_a_warning() {
    let sprites = vec![
        Sprite::new("ghost", RgbaImage::new(16, 16)),
        Sprite::new("box", framed(16, 16, Rect::new(4, 4, 8, 8), 255)),
    ];
    let out = AtlasBuilder::new(AtlasConfig::default())
        .build(&sprites)
        .expect("pack");
    assert_eq!(
        out.warnings,
        vec![Warning::UnplaceableSprite {
            name: "ghost".into(),
            reason: "fully transparent".into()
        }]
    );
    let records: Vec<_> = out.records().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sprite_id, 1);
    assert_eq!(records[0].trim_offset, (4, 4));
    assert_eq!(records[0].trimmed_size, (8, 8));
    assert!(records[0].trimmed());
}

#[test]
fn zero_sized_sprite_is_skipped_even_without_trim() {
    let sprites = vec![
        Sprite::new("flat", RgbaImage::new(0, 7)),
        Sprite::new("dot", RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 255]))),
    ];
    let cfg = AtlasConfig::builder().trim(false).build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("pack");
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].to_string().contains("flat"));
    assert_eq!(out.result.placed_count(), 1);
}

#[test]
fn all_transparent_input_yields_no_pages() {
    let sprites = vec![
        Sprite::new("a", RgbaImage::new(8, 8)),
        Sprite::new("b", RgbaImage::new(3, 9)),
    ];
    let out = AtlasBuilder::new(AtlasConfig::default())
        .build(&sprites)
        .expect("warnings only");
    assert!(out.pages.is_empty());
    assert_eq!(out.warnings.len(), 2);
    assert_eq!(out.summary().sprite_count, 0);
}
