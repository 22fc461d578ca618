use atlas_toolbox_core::prelude::*;
use atlas_toolbox_core::sizing::{CandidateSizes, next_pow2, prev_pow2};
use image::{Rgba, RgbaImage};

fn solid(w: u32, h: u32, seed: u8) -> Sprite {
    Sprite::new(
        format!("s{seed}"),
        RgbaImage::from_pixel(w, h, Rgba([seed, seed.wrapping_mul(7), 3, 255])),
    )
}

#[test]
fn pow2_helpers() {
    assert_eq!(next_pow2(0), 1);
    assert_eq!(next_pow2(1), 1);
    assert_eq!(next_pow2(129), 256);
    assert_eq!(prev_pow2(0), 0);
    assert_eq!(prev_pow2(300), 256);
    assert_eq!(prev_pow2(512), 512);
}

#[test]
fn candidates_grow_monotonically_up_to_the_ceiling() {
    let items = vec![PackItem::new(0, 100, 30)];
    let cfg = AtlasConfig::builder().max_canvas_size(512).build();
    let sizes: Vec<(u32, u32)> = CandidateSizes::automatic(&items, &cfg).collect();
    assert_eq!(sizes[0], (100, 100));
    for pair in sizes.windows(2) {
        let ((w0, h0), (w1, h1)) = (pair[0], pair[1]);
        assert!(w1 >= w0 && h1 >= h0 && (w1, h1) != (w0, h0), "{pair:?}");
    }
    assert_eq!(sizes.last(), Some(&(512, 512)));
}

#[test]
fn pow2_candidates_double_alternating_axes() {
    let items = vec![PackItem::new(0, 100, 30)];
    let cfg = AtlasConfig::builder().max_canvas_size(512).pow2(true).build();
    let sizes: Vec<(u32, u32)> = CandidateSizes::automatic(&items, &cfg).collect();
    assert_eq!(
        sizes,
        vec![(128, 128), (256, 128), (256, 256), (512, 256), (512, 512)]
    );
}

#[test]
fn square_candidates_stay_square() {
    let items = vec![PackItem::new(0, 70, 10), PackItem::new(1, 10, 10)];
    let cfg = AtlasConfig::builder().max_canvas_size(300).square(true).build();
    for (w, h) in CandidateSizes::automatic(&items, &cfg) {
        assert_eq!(w, h);
    }
}

#[test]
fn automatic_trace_is_recorded_and_monotonic() {
    let sprites: Vec<Sprite> = (0..20u8).map(|i| solid(20 + i as u32, 30, i)).collect();
    let cfg = AtlasConfig::builder().padding(1).build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("pack");
    let trace = &out.result.attempted_sizes;
    assert!(!trace.is_empty());
    for pair in trace.windows(2) {
        assert!(pair[1].0 >= pair[0].0 && pair[1].1 >= pair[0].1);
    }
    let canvas = &out.result.canvases[0];
    assert_eq!(Some(&canvas.candidate), trace.last());
    assert!(canvas.width <= canvas.candidate.0 && canvas.height <= canvas.candidate.1);
}

#[test]
fn automatic_gives_up_at_the_ceiling() {
    let cfg = AtlasConfig::builder().max_canvas_size(512).build();
    let err = pack_layout(vec![("big", 600, 10)], &cfg).unwrap_err();
    match err {
        AtlasError::SizingExhausted { attempted, .. } => assert_eq!(attempted, (512, 512)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn min_max_spills_onto_additional_canvases() {
    let sprites: Vec<Sprite> = (0..6u8).map(|i| solid(60, 60, i * 20)).collect();
    let cfg = AtlasConfig::builder()
        .min_max((32, 32), (128, 128))
        .padding(0)
        .build();
    let out = AtlasBuilder::new(cfg).build(&sprites).expect("pack");

    assert_eq!(out.pages.len(), 2);
    assert_eq!(out.result.canvases[0].placements.len(), 4);
    assert_eq!(out.result.canvases[1].placements.len(), 2);
    for c in &out.result.canvases {
        assert!(c.width <= 128 && c.height <= 128);
        assert!(c.width >= 32 && c.height >= 32);
    }
    let mut ids: Vec<usize> = out.records().map(|r| r.sprite_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..6).collect::<Vec<_>>());
    assert!(out.warnings.is_empty());
}

#[test]
fn min_max_never_shrinks_below_min() {
    let cfg = AtlasConfig::builder().min_max((256, 256), (512, 512)).build();
    let layout = pack_layout(vec![("dot", 10, 10)], &cfg).expect("pack");
    assert_eq!((layout.pages[0].width, layout.pages[0].height), (256, 256));
}

#[test]
fn min_max_rejects_items_larger_than_max() {
    let cfg = AtlasConfig::builder().min_max((16, 16), (64, 64)).build();
    let err = pack_layout(vec![("huge", 100, 100)], &cfg).unwrap_err();
    assert!(matches!(err, AtlasError::SizingExhausted { .. }));
}

#[test]
fn manual_size_is_kept_even_when_everything_fits() {
    let cfg = AtlasConfig::builder().manual_size(200, 100).build();
    let layout = pack_layout(vec![("a", 10, 10), ("b", 20, 5)], &cfg).expect("pack");
    assert_eq!(layout.pages.len(), 1);
    assert_eq!((layout.pages[0].width, layout.pages[0].height), (200, 100));
    assert!(layout.warnings.is_empty());
}

#[test]
fn pow2_tightening_keeps_power_of_two_pages() {
    let cfg = AtlasConfig::builder().pow2(true).padding(0).build();
    let layout = pack_layout(vec![("a", 100, 40), ("b", 30, 30), ("c", 5, 70)], &cfg).expect("pack");
    let p = &layout.pages[0];
    assert!(p.width.is_power_of_two() && p.height.is_power_of_two());
    for r in &p.records {
        assert!(r.x + r.w <= p.width && r.y + r.h <= p.height);
    }
}

#[test]
fn pow2_min_max_pages_respect_min() {
    let cfg = AtlasConfig::builder()
        .min_max((80, 80), (128, 128))
        .pow2(true)
        .build();
    let layout = pack_layout(vec![("dot", 10, 10)], &cfg).expect("pack");
    let p = &layout.pages[0];
    assert_eq!((p.width, p.height), (128, 128));
}

#[test]
fn pow2_min_max_without_a_power_of_two_is_rejected() {
    let cfg = AtlasConfig::builder()
        .min_max((80, 80), (100, 100))
        .pow2(true)
        .build();
    assert!(matches!(
        pack_layout(vec![("dot", 10, 10)], &cfg),
        Err(AtlasError::InvalidConfig(_))
    ));
}

#[test]
fn manual_size_tries_each_size_once_and_prefers_the_first_full_fill() {
    let cfg = AtlasConfig::builder().manual_size(128, 128).padding(0).build();
    let layout = pack_layout(vec![("a", 60, 60), ("b", 60, 60), ("c", 30, 20)], &cfg).expect("pack");
    assert_eq!(layout.result.attempted_sizes, vec![(128, 128)]);
    assert_eq!(
        layout.result.strategy,
        StrategyId {
            packer: PackerKind::MaxRects,
            heuristic: Heuristic::MaxRects(MaxRectsHeuristic::BestAreaFit)
        }
    );
    assert_eq!(layout.pages[0].records.len(), 3);
    assert!(layout.warnings.is_empty());
}
