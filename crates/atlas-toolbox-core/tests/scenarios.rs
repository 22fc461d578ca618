use atlas_toolbox_core::prelude::*;
use image::{Rgba, RgbaImage};

fn is_pow2(v: u32) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

fn solid(w: u32, h: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([seed, 255 - seed, seed / 2, 255]))
}

fn gradient(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 30) as u8, (y * 50) as u8, 7, 255]))
}

#[test]
fn fifty_squares_with_shelf_ffdh_pow2() {
    let sprites: Vec<Sprite> = (0..50u8)
        .map(|i| Sprite::new(format!("s{i}"), solid(32, 32, i)))
        .collect();
    let cfg = AtlasConfig::builder()
        .packer(PackerKind::ShelfFfdh)
        .pow2(true)
        .padding(1)
        .build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("pack");

    assert_eq!(out.pages.len(), 1);
    let canvas = &out.result.canvases[0];
    assert!(is_pow2(canvas.width) && is_pow2(canvas.height));
    assert!(canvas.width <= 512 && canvas.height <= 512);
    assert_eq!(canvas.placements.len(), 50);
    for p in &canvas.placements {
        assert_eq!((p.w, p.h), (34, 34));
    }
    assert_eq!(out.result.strategy.packer, PackerKind::ShelfFfdh);

    let records = &out.pages[0].records;
    assert_eq!(records.len(), 50);
    for (i, r) in records.iter().enumerate() {
        assert_eq!(r.sprite_id, i);
        assert_eq!((r.w, r.h), (32, 32));
    }
}

#[test]
fn fifty_squares_with_two_pixel_padding_need_512x256() {
    let sprites: Vec<Sprite> = (0..50u8)
        .map(|i| Sprite::new(format!("s{i}"), solid(32, 32, i)))
        .collect();
    let cfg = AtlasConfig::builder()
        .packer(PackerKind::ShelfFfdh)
        .pow2(true)
        .padding(2)
        .build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("pack");

    // 256x256 holds 7x7 cells of 36px, one short
    assert_eq!(out.result.attempted_sizes, vec![(256, 256), (512, 256)]);
    let canvas = &out.result.canvases[0];
    assert_eq!((canvas.width, canvas.height), (512, 256));
    assert_eq!(canvas.placements.len(), 50);
    assert!(canvas.placements.iter().all(|p| (p.w, p.h) == (36, 36)));
    assert_eq!(out.result.strategy.packer, PackerKind::ShelfFfdh);
    assert!(out.records().all(|r| (r.w, r.h) == (32, 32)));
}

#[test]
fn mirrored_pair_is_stored_once() {
    let left = gradient(8, 4);
    let right = image::imageops::flip_horizontal(&left);
    let sprites = vec![Sprite::new("left", left), Sprite::new("right", right)];
    let cfg = AtlasConfig::builder().detect_flips(true).build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("pack");

    assert_eq!(out.result.placed_count(), 1);
    let records = &out.pages[0].records;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "left");
    assert_eq!(records[0].flip_of, None);
    assert_eq!(
        records[1].flip_of,
        Some(FlipRef {
            canonical: 0,
            flip_h: true,
            flip_v: false
        })
    );
    assert_eq!(records[0].frame(), records[1].frame());
}

#[test]
fn manual_overflow_names_unplaced_sprites() {
    let sprites: Vec<Sprite> = ["a", "b", "c"]
        .iter()
        .enumerate()
        .map(|(i, n)| Sprite::new(*n, solid(40, 40, i as u8 * 60)))
        .collect();
    let cfg = AtlasConfig::builder().manual_size(64, 64).padding(0).build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("partial result");

    assert_eq!(out.pages.len(), 1);
    assert_eq!((out.pages[0].width, out.pages[0].height), (64, 64));
    assert_eq!(out.pages[0].records.len(), 1);
    assert_eq!(out.pages[0].records[0].name, "a");
    assert_eq!(
        out.warnings,
        vec![Warning::CanvasOverflow {
            width: 64,
            height: 64,
            unplaced: vec!["b".into(), "c".into()],
        }]
    );
}
