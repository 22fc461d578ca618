use atlas_toolbox_core::packer::simple_row::SimpleRowStrategy;
use atlas_toolbox_core::prelude::*;
use atlas_toolbox_core::{Fill, PackingStrategy, Portfolio};

/// Places nothing, whatever the size.
struct Refuses;

impl PackingStrategy for Refuses {
    fn id(&self) -> StrategyId {
        StrategyId {
            packer: PackerKind::MaxRects,
            heuristic: Heuristic::MaxRects(MaxRectsHeuristic::BestAreaFit),
        }
    }

    fn fill(&self, items: &[PackItem], _: u32, _: u32, _: bool) -> Fill {
        Fill {
            placements: Vec::new(),
            unplaced: items.iter().map(|i| i.id).collect(),
        }
    }
}

fn row_items() -> Vec<PackItem> {
    (0..4).map(|id| PackItem::new(id, 10, 10)).collect()
}

#[test]
fn pinned_packers_carry_simple_row_as_fallback() {
    for packer in PackerKind::REGISTRY_ORDER {
        let cfg = AtlasConfig::builder().packer(packer).build();
        let fb = Portfolio::new(&cfg).fallback_id().map(|id| id.packer);
        if packer == PackerKind::SimpleRow {
            assert_eq!(fb, None);
        } else {
            assert_eq!(fb, Some(PackerKind::SimpleRow), "{packer}");
        }
    }
    assert_eq!(Portfolio::new(&AtlasConfig::default()).fallback_id(), None);
}

#[test]
fn fallback_runs_only_when_every_strategy_fails() {
    let failing = Portfolio::from_strategies(vec![Box::new(Refuses)], false)
        .with_fallback(Box::new(SimpleRowStrategy));
    let canvas = failing
        .try_pack(&row_items(), 40, 10, false, &CancelToken::new(), &|c: Canvas| c)
        .expect("not cancelled")
        .expect("simple row fits four 10x10 in a row");
    assert_eq!(canvas.strategy.packer, PackerKind::SimpleRow);

    let (id, fill) = failing
        .best_fill(&row_items(), 40, 10, false, &CancelToken::new())
        .expect("not cancelled")
        .expect("non-empty portfolio");
    assert_eq!(id.packer, PackerKind::SimpleRow);
    assert!(fill.unplaced.is_empty());

    // a succeeding family keeps the canvas even with a fallback configured
    let cfg = AtlasConfig::builder().packer(PackerKind::MaxRects).build();
    let canvas = Portfolio::new(&cfg)
        .try_pack(&row_items(), 40, 10, false, &CancelToken::new(), &|c: Canvas| c)
        .expect("not cancelled")
        .expect("fits");
    assert_eq!(canvas.strategy.packer, PackerKind::MaxRects);
}

#[test]
fn partial_fallback_does_not_replace_the_family_result() {
    let failing = Portfolio::from_strategies(vec![Box::new(Refuses)], false)
        .with_fallback(Box::new(SimpleRowStrategy));
    let (id, fill) = failing
        .best_fill(&row_items(), 20, 10, false, &CancelToken::new())
        .expect("not cancelled")
        .expect("non-empty portfolio");
    assert_eq!(id.packer, PackerKind::MaxRects);
    assert!(fill.placements.is_empty());
}

#[test]
fn shelf_family_falls_back_to_a_taller_row() {
    // shelf heuristics seat the 10x20 item on a new shelf below the 5px one and run out of height;
    // a single row holds both
    let cfg = AtlasConfig::builder()
        .packer(PackerKind::Shelf)
        .manual_size(20, 24)
        .padding(0)
        .allow_rotation(false)
        .build();
    let out = pack_layout(vec![("flat", 10u32, 5u32), ("tall", 10, 20)], &cfg).expect("pack");
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    assert_eq!(out.result.strategy.packer, PackerKind::SimpleRow);
    let records = &out.pages[0].records;
    assert_eq!((records[0].x, records[0].y), (0, 0));
    assert_eq!((records[1].x, records[1].y), (10, 0));
}
