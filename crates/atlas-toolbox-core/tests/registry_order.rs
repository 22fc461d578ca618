use atlas_toolbox_core::config::{
    Heuristic, MaxRectsHeuristic, PackerKind, ShelfHeuristic, SkylineHeuristic, SortOrder,
};
use atlas_toolbox_core::packer::registry;

#[test]
fn automatic_expands_every_family_in_registry_order() {
    let ids: Vec<_> = registry(PackerKind::Automatic, Heuristic::Auto, SortOrder::AreaDesc)
        .iter()
        .map(|s| s.id())
        .collect();
    // 5 MaxRects + 2 Skyline + 6 Guillotine + 4 Shelf-FFDH + 4 Shelf + 1 Simple Row
    assert_eq!(ids.len(), 22);
    let rank = |k: PackerKind| {
        PackerKind::REGISTRY_ORDER
            .iter()
            .position(|&r| r == k)
            .expect("registered")
    };
    for pair in ids.windows(2) {
        assert!(rank(pair[0].packer) <= rank(pair[1].packer));
    }
    assert_eq!(ids[0].packer, PackerKind::MaxRects);
    assert_eq!(ids[0].heuristic, Heuristic::MaxRects(MaxRectsHeuristic::BestAreaFit));
    assert_eq!(ids[21].packer, PackerKind::SimpleRow);
}

#[test]
fn ffdh_leads_with_first_fit() {
    let ids: Vec<_> = registry(PackerKind::ShelfFfdh, Heuristic::Auto, SortOrder::AreaDesc)
        .iter()
        .map(|s| s.id())
        .collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids[0].heuristic, Heuristic::Shelf(ShelfHeuristic::FirstFit));
}

#[test]
fn pinned_heuristic_narrows_only_its_family() {
    let pinned = Heuristic::Skyline(SkylineHeuristic::MinWaste);
    let ids: Vec<_> = registry(PackerKind::Automatic, pinned, SortOrder::AreaDesc)
        .iter()
        .map(|s| s.id())
        .collect();
    let skyline: Vec<_> = ids.iter().filter(|i| i.packer == PackerKind::Skyline).collect();
    assert_eq!(skyline.len(), 1);
    assert_eq!(skyline[0].heuristic, pinned);
    assert_eq!(ids.len(), 21);

    let single = registry(PackerKind::Skyline, pinned, SortOrder::AreaDesc);
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].id().to_string(), "skyline/mw");
}
