use atlas_toolbox_core::config::{Heuristic, PackerKind, SortOrder};
use atlas_toolbox_core::model::{PackItem, PlacedRect, Rect};
use atlas_toolbox_core::packer::registry;
use rand::{Rng, SeedableRng};

fn disjoint(placements: &[PlacedRect]) -> bool {
    for i in 0..placements.len() {
        for j in (i + 1)..placements.len() {
            if placements[i].rect().intersects(&placements[j].rect()) {
                return false;
            }
        }
    }
    true
}

fn random_items(seed: u64, count: usize, max_side: u32) -> Vec<PackItem> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| PackItem::new(i, rng.gen_range(1..=max_side), rng.gen_range(1..=max_side)))
        .collect()
}

#[test]
fn every_strategy_stays_inside_and_disjoint() {
    let items = random_items(42, 80, 48);
    let bin = Rect::new(0, 0, 256, 192);
    for allow_rotation in [false, true] {
        for s in registry(PackerKind::Automatic, Heuristic::Auto, SortOrder::AreaDesc) {
            let fill = s.fill(&items, bin.w, bin.h, allow_rotation);
            assert_eq!(
                fill.placements.len() + fill.unplaced.len(),
                items.len(),
                "{} lost items",
                s.id()
            );
            assert!(!fill.placements.is_empty(), "{} placed nothing", s.id());
            for p in &fill.placements {
                assert!(bin.contains(&p.rect()), "{} out of bounds: {:?}", s.id(), p);
                let it = items[p.id];
                if p.rotated {
                    assert!(allow_rotation, "{} rotated without permission", s.id());
                    assert_eq!((p.w, p.h), (it.h, it.w));
                } else {
                    assert_eq!((p.w, p.h), (it.w, it.h));
                }
            }
            assert!(disjoint(&fill.placements), "{} produced overlaps", s.id());
        }
    }
}

#[test]
fn try_pack_is_all_or_nothing() {
    // 5 cells of 60x60 never fit a 100x100 bin
    let items: Vec<PackItem> = (0..5).map(|i| PackItem::new(i, 60, 60)).collect();
    for s in registry(PackerKind::Automatic, Heuristic::Auto, SortOrder::AreaDesc) {
        assert!(s.try_pack(&items, 100, 100, true).is_none(), "{}", s.id());
        let canvas = s.try_pack(&items, 300, 120, true).expect("fits");
        assert_eq!(canvas.placements.len(), 5, "{}", s.id());
        assert_eq!(canvas.strategy, s.id());
    }
}

#[test]
fn rotation_lets_tall_items_into_wide_bins() {
    let items = vec![PackItem::new(0, 10, 90)];
    for s in registry(PackerKind::Automatic, Heuristic::Auto, SortOrder::AreaDesc) {
        assert!(s.try_pack(&items, 100, 20, false).is_none(), "{}", s.id());
        let canvas = s.try_pack(&items, 100, 20, true).expect("rotated fit");
        let p = canvas.placements[0];
        assert!(p.rotated, "{}", s.id());
        assert_eq!((p.w, p.h), (90, 10));
    }
}

#[test]
fn zero_sized_items_are_never_placed() {
    let items = vec![PackItem::new(0, 0, 5), PackItem::new(1, 4, 4)];
    for s in registry(PackerKind::Automatic, Heuristic::Auto, SortOrder::None) {
        let fill = s.fill(&items, 16, 16, true);
        assert_eq!(fill.unplaced, vec![0], "{}", s.id());
        assert_eq!(fill.placements.len(), 1);
    }
}
