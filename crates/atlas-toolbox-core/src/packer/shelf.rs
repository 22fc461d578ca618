use super::{Fill, Packer, PackingStrategy, greedy_fill};
use crate::config::{Heuristic, PackerKind, ShelfHeuristic};
use crate::model::{PackItem, Rect, StrategyId};

#[derive(Clone, Debug)]
struct Shelf {
    y: u32,
    h: u32,
    /// Width already consumed from the left edge.
    used: u32,
}

pub struct ShelfPacker {
    width: u32,
    height: u32,
    shelves: Vec<Shelf>,
    next_y: u32,
    heuristic: ShelfHeuristic,
    allow_rotation: bool,
}

impl ShelfPacker {
    pub fn new(width: u32, height: u32, heuristic: ShelfHeuristic, allow_rotation: bool) -> Self {
        Self {
            width,
            height,
            shelves: Vec::new(),
            next_y: 0,
            heuristic,
            allow_rotation,
        }
    }

    fn orientations(&self, w: u32, h: u32) -> impl Iterator<Item = (u32, u32, bool)> {
        let rotated = (self.allow_rotation && w != h).then_some((h, w, true));
        std::iter::once((w, h, false)).chain(rotated)
    }

    fn fits(&self, sh: &Shelf, rw: u32, rh: u32) -> bool {
        rh <= sh.h && sh.used.saturating_add(rw) <= self.width
    }

    /// Picks (shelf index, w, h, rotated) among existing shelves, lower key wins.
    fn choose_existing(&self, w: u32, h: u32) -> Option<(usize, u32, u32, bool)> {
        let range = match self.heuristic {
            ShelfHeuristic::NextFit => self.shelves.len().saturating_sub(1)..self.shelves.len(),
            _ => 0..self.shelves.len(),
        };
        let mut best: Option<(u64, usize, u32, u32, bool)> = None;
        for i in range {
            let sh = &self.shelves[i];
            for (rw, rh, rot) in self.orientations(w, h) {
                if !self.fits(sh, rw, rh) {
                    continue;
                }
                let key = match self.heuristic {
                    ShelfHeuristic::NextFit
                    | ShelfHeuristic::FirstFit
                    | ShelfHeuristic::BestHeightFit => (sh.h - rh) as u64,
                    ShelfHeuristic::BestWidthFit => (self.width - sh.used - rw) as u64,
                };
                if best.as_ref().is_none_or(|(bk, ..)| key < *bk) {
                    best = Some((key, i, rw, rh, rot));
                }
            }
            // first-fit stops at the first shelf with room
            if self.heuristic == ShelfHeuristic::FirstFit && best.is_some() {
                break;
            }
        }
        best.map(|(_, i, rw, rh, rot)| (i, rw, rh, rot))
    }

    /// Opens a shelf below the last one; prefers the flatter orientation.
    fn open_shelf(&mut self, w: u32, h: u32) -> Option<(usize, u32, u32, bool)> {
        let mut options: Vec<(u32, u32, bool)> = self.orientations(w, h).collect();
        options.sort_by_key(|&(_, rh, _)| rh);
        let (rw, rh, rot) = options
            .into_iter()
            .find(|&(rw, rh, _)| rw <= self.width && self.next_y.saturating_add(rh) <= self.height)?;
        self.shelves.push(Shelf {
            y: self.next_y,
            h: rh,
            used: 0,
        });
        self.next_y += rh;
        Some((self.shelves.len() - 1, rw, rh, rot))
    }
}

impl Packer for ShelfPacker {
    fn insert(&mut self, w: u32, h: u32) -> Option<(Rect, bool)> {
        let (i, rw, rh, rotated) = match self.choose_existing(w, h) {
            Some(found) => found,
            None => self.open_shelf(w, h)?,
        };
        let sh = &mut self.shelves[i];
        let cell = Rect::new(sh.used, sh.y, rw, rh);
        sh.used += rw;
        Some((cell, rotated))
    }
}

/// Shelf packing in input order, or by decreasing height for FFDH.
pub struct ShelfStrategy {
    pub heuristic: ShelfHeuristic,
    pub decreasing_height: bool,
}

impl PackingStrategy for ShelfStrategy {
    fn id(&self) -> StrategyId {
        StrategyId {
            packer: if self.decreasing_height {
                PackerKind::ShelfFfdh
            } else {
                PackerKind::Shelf
            },
            heuristic: Heuristic::Shelf(self.heuristic),
        }
    }

    fn fill(&self, items: &[PackItem], width: u32, height: u32, allow_rotation: bool) -> Fill {
        let mut order = items.to_vec();
        if self.decreasing_height {
            if allow_rotation {
                // shelves are flattest when every item lies on its long side
                order.sort_by(|a, b| b.w.min(b.h).cmp(&a.w.min(a.h)));
            } else {
                order.sort_by(|a, b| b.h.cmp(&a.h));
            }
        }
        let bin = ShelfPacker::new(width, height, self.heuristic, allow_rotation);
        greedy_fill(bin, &order)
    }
}
