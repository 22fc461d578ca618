use crate::config::{
    GuillotineChoice, GuillotineSplit, Heuristic, MaxRectsHeuristic, PackerKind, ShelfHeuristic,
    SkylineHeuristic, SortOrder,
};
use crate::model::{Canvas, PackItem, PlacedRect, Rect, StrategyId};

pub mod guillotine;
pub mod maxrects;
pub mod portfolio;
pub mod shelf;
pub mod simple_row;
pub mod skyline;

pub use portfolio::Portfolio;

/// A packer places rectangles into a single bin.
///
/// Implementations must never return overlapping cells or cells outside the bin.
/// `insert` returns the placed cell (post-rotation size) and whether it was rotated,
/// or `None` if the rectangle cannot be placed in the current bin.
pub trait Packer {
    fn insert(&mut self, w: u32, h: u32) -> Option<(Rect, bool)>;
}

/// Outcome of greedily filling one canvas.
#[derive(Debug, Clone, Default)]
pub struct Fill {
    pub placements: Vec<PlacedRect>,
    /// Ids of the items that did not fit, in the order they were tried.
    pub unplaced: Vec<usize>,
}

impl Fill {
    pub fn placed_area(&self) -> u64 {
        self.placements.iter().map(|p| p.rect().area()).sum()
    }
}

/// One packing algorithm with a fixed heuristic.
///
/// `fill` places as many items as it can; `try_pack` is all-or-nothing. Strategies never
/// open additional canvases: overflow is the sizing policy's business.
pub trait PackingStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    fn fill(&self, items: &[PackItem], width: u32, height: u32, allow_rotation: bool) -> Fill;

    fn try_pack(
        &self,
        items: &[PackItem],
        width: u32,
        height: u32,
        allow_rotation: bool,
    ) -> Option<Canvas> {
        let fill = self.fill(items, width, height, allow_rotation);
        if !fill.unplaced.is_empty() {
            return None;
        }
        Some(Canvas {
            width,
            height,
            candidate: (width, height),
            placements: fill.placements,
            strategy: self.id(),
        })
    }
}

/// Feeds `order` into `bin` one item at a time. Later items may still fit after an earlier miss.
pub(crate) fn greedy_fill<P: Packer>(mut bin: P, order: &[PackItem]) -> Fill {
    let mut fill = Fill::default();
    for item in order {
        if item.w == 0 || item.h == 0 {
            fill.unplaced.push(item.id);
            continue;
        }
        match bin.insert(item.w, item.h) {
            Some((cell, rotated)) => fill.placements.push(PlacedRect {
                id: item.id,
                x: cell.x,
                y: cell.y,
                w: cell.w,
                h: cell.h,
                rotated,
            }),
            None => fill.unplaced.push(item.id),
        }
    }
    fill
}

/// Stable sort, so equal keys keep input order.
pub(crate) fn sorted_items(items: &[PackItem], order: SortOrder) -> Vec<PackItem> {
    let mut out = items.to_vec();
    match order {
        SortOrder::None => {}
        SortOrder::AreaDesc => out.sort_by(|a, b| b.area().cmp(&a.area())),
        SortOrder::MaxSideDesc => out.sort_by(|a, b| b.w.max(b.h).cmp(&a.w.max(a.h))),
        SortOrder::HeightDesc => out.sort_by(|a, b| b.h.cmp(&a.h)),
        SortOrder::WidthDesc => out.sort_by(|a, b| b.w.cmp(&a.w)),
    }
    out
}

/// Builds the ordered strategy list for `packer`.
///
/// `Automatic` walks `PackerKind::REGISTRY_ORDER`; a pinned heuristic only narrows the
/// family it belongs to. `Heuristic::Auto` expands every family into its published heuristics.
pub fn registry(
    packer: PackerKind,
    heuristic: Heuristic,
    sort: SortOrder,
) -> Vec<Box<dyn PackingStrategy>> {
    let kinds: Vec<PackerKind> = match packer {
        PackerKind::Automatic => PackerKind::REGISTRY_ORDER.to_vec(),
        k => vec![k],
    };
    let mut out: Vec<Box<dyn PackingStrategy>> = Vec::new();
    for kind in kinds {
        let h = if heuristic.applies_to(kind) {
            heuristic
        } else {
            Heuristic::Auto
        };
        family(kind, h, sort, &mut out);
    }
    out
}

/// Strategy a pinned packer falls back on when its whole family fails at a size.
/// `Automatic` already carries Simple Row as its last entry.
pub fn fallback(packer: PackerKind) -> Option<Box<dyn PackingStrategy>> {
    match packer {
        PackerKind::Automatic | PackerKind::SimpleRow => None,
        _ => Some(Box::new(simple_row::SimpleRowStrategy)),
    }
}

fn family(
    kind: PackerKind,
    heuristic: Heuristic,
    sort: SortOrder,
    out: &mut Vec<Box<dyn PackingStrategy>>,
) {
    match (kind, heuristic) {
        (PackerKind::MaxRects, Heuristic::MaxRects(h)) => {
            out.push(Box::new(maxrects::MaxRectsStrategy { heuristic: h, sort }))
        }
        (PackerKind::MaxRects, _) => {
            for h in MaxRectsHeuristic::ALL {
                out.push(Box::new(maxrects::MaxRectsStrategy { heuristic: h, sort }));
            }
        }
        (PackerKind::Skyline, Heuristic::Skyline(h)) => {
            out.push(Box::new(skyline::SkylineStrategy { heuristic: h, sort }))
        }
        (PackerKind::Skyline, _) => {
            for h in SkylineHeuristic::ALL {
                out.push(Box::new(skyline::SkylineStrategy { heuristic: h, sort }));
            }
        }
        (PackerKind::Guillotine, Heuristic::Guillotine(choice, split)) => out.push(Box::new(
            guillotine::GuillotineStrategy {
                choice,
                split,
                sort,
            },
        )),
        (PackerKind::Guillotine, _) => {
            for choice in [
                GuillotineChoice::BestAreaFit,
                GuillotineChoice::BestShortSideFit,
                GuillotineChoice::BestLongSideFit,
            ] {
                for split in [
                    GuillotineSplit::SplitShorterLeftoverAxis,
                    GuillotineSplit::SplitMinimizeArea,
                ] {
                    out.push(Box::new(guillotine::GuillotineStrategy {
                        choice,
                        split,
                        sort,
                    }));
                }
            }
        }
        (PackerKind::Shelf | PackerKind::ShelfFfdh, Heuristic::Shelf(h)) => {
            out.push(Box::new(shelf::ShelfStrategy {
                heuristic: h,
                decreasing_height: kind == PackerKind::ShelfFfdh,
            }))
        }
        (PackerKind::ShelfFfdh, _) => {
            // first-fit is the canonical FFDH rule, so it goes first
            for h in [
                ShelfHeuristic::FirstFit,
                ShelfHeuristic::NextFit,
                ShelfHeuristic::BestHeightFit,
                ShelfHeuristic::BestWidthFit,
            ] {
                out.push(Box::new(shelf::ShelfStrategy {
                    heuristic: h,
                    decreasing_height: true,
                }));
            }
        }
        (PackerKind::Shelf, _) => {
            for h in ShelfHeuristic::ALL {
                out.push(Box::new(shelf::ShelfStrategy {
                    heuristic: h,
                    decreasing_height: false,
                }));
            }
        }
        (PackerKind::SimpleRow, _) => out.push(Box::new(simple_row::SimpleRowStrategy)),
        (PackerKind::Automatic, _) => {}
    }
}
