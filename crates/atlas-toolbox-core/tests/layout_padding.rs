use atlas_toolbox_core::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn random_inputs(n: usize, seed: u64) -> Vec<(String, u32, u32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| (format!("r{i}"), rng.gen_range(1..48), rng.gen_range(1..48)))
        .collect()
}

fn inflate(r: &PlacementRecord, pad: u32) -> Rect {
    Rect::new(r.x - pad, r.y - pad, r.w + 2 * pad, r.h + 2 * pad)
}

#[test]
fn padded_cells_are_disjoint_and_inside_their_page() {
    for packer in [
        PackerKind::Automatic,
        PackerKind::MaxRects,
        PackerKind::Skyline,
        PackerKind::Guillotine,
        PackerKind::Shelf,
        PackerKind::ShelfFfdh,
        PackerKind::SimpleRow,
    ] {
        for pad in [0u32, 1, 3] {
            let cfg = AtlasConfig::builder().packer(packer).padding(pad).build();
            let out = pack_layout(random_inputs(60, 11), &cfg).expect("pack");
            for page in &out.pages {
                let bin = Rect::new(0, 0, page.width, page.height);
                let cells: Vec<Rect> = page.records.iter().map(|r| inflate(r, pad)).collect();
                for (i, a) in cells.iter().enumerate() {
                    assert!(bin.contains(a), "{packer} pad {pad}: {a:?} outside {bin:?}");
                    for b in &cells[i + 1..] {
                        assert!(!a.intersects(b), "{packer} pad {pad}: {a:?} overlaps {b:?}");
                    }
                }
            }
            assert_eq!(out.summary().sprite_count, 60);
        }
    }
}

#[test]
fn rotated_records_swap_their_size() {
    let cfg = AtlasConfig::builder().padding(2).build();
    let inputs = random_inputs(40, 5);
    let out = pack_layout(inputs.clone(), &cfg).expect("pack");
    for r in out.pages.iter().flat_map(|p| &p.records) {
        let (_, w, h) = &inputs[r.sprite_id];
        if r.rotated {
            assert_eq!((r.w, r.h), (*h, *w));
        } else {
            assert_eq!((r.w, r.h), (*w, *h));
        }
        assert_eq!(r.source_size, (*w, *h));
    }
}

#[test]
fn no_rotation_when_disallowed() {
    let cfg = AtlasConfig::builder().allow_rotation(false).build();
    let out = pack_layout(random_inputs(40, 8), &cfg).expect("pack");
    assert!(out.pages.iter().flat_map(|p| &p.records).all(|r| !r.rotated));
}

#[test]
fn zero_sized_layout_inputs_are_warned_about() {
    let cfg = AtlasConfig::default();
    let out = pack_layout(vec![("a", 0u32, 5u32), ("b", 4, 4)], &cfg).expect("pack");
    assert_eq!(out.warnings.len(), 1);
    let records = &out.pages[0].records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sprite_id, 1);
}

#[test]
fn empty_input_is_an_error() {
    let none: Vec<(String, u32, u32)> = Vec::new();
    assert!(matches!(
        pack_layout(none, &AtlasConfig::default()),
        Err(AtlasError::Empty)
    ));
    assert!(matches!(
        AtlasBuilder::default().build(&[]),
        Err(AtlasError::Empty)
    ));
}
