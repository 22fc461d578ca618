use super::{Fill, Packer, PackingStrategy, greedy_fill, sorted_items};
use crate::config::{GuillotineChoice, GuillotineSplit, Heuristic, PackerKind, SortOrder};
use crate::model::{PackItem, Rect, StrategyId};

pub struct GuillotinePacker {
    free: Vec<Rect>,
    choice: GuillotineChoice,
    split: GuillotineSplit,
    allow_rotation: bool,
}

impl GuillotinePacker {
    pub fn new(
        width: u32,
        height: u32,
        choice: GuillotineChoice,
        split: GuillotineSplit,
        allow_rotation: bool,
    ) -> Self {
        Self {
            free: vec![Rect::new(0, 0, width, height)],
            choice,
            split,
            allow_rotation,
        }
    }

    fn score(choice: GuillotineChoice, fr: &Rect, w: u32, h: u32) -> (i64, i64) {
        let area_fit = fr.area() as i64 - (w as i64) * (h as i64);
        let leftover_h = fr.w as i64 - w as i64;
        let leftover_v = fr.h as i64 - h as i64;
        let short_fit = leftover_h.min(leftover_v);
        let long_fit = leftover_h.max(leftover_v);
        let s = match choice {
            GuillotineChoice::BestAreaFit => area_fit,
            GuillotineChoice::BestShortSideFit => short_fit,
            GuillotineChoice::BestLongSideFit => long_fit,
            GuillotineChoice::WorstAreaFit => -area_fit,
            GuillotineChoice::WorstShortSideFit => -short_fit,
            GuillotineChoice::WorstLongSideFit => -long_fit,
        };
        (s, area_fit)
    }

    fn choose(&self, w: u32, h: u32) -> Option<(usize, Rect, bool)> {
        let mut best: Option<((i64, i64), usize, Rect, bool)> = None;
        for (i, fr) in self.free.iter().enumerate() {
            if fr.w >= w && fr.h >= h {
                let s = Self::score(self.choice, fr, w, h);
                if best.as_ref().is_none_or(|(bs, ..)| s < *bs) {
                    best = Some((s, i, Rect::new(fr.x, fr.y, w, h), false));
                }
            }
            if self.allow_rotation && w != h && fr.w >= h && fr.h >= w {
                let s = Self::score(self.choice, fr, h, w);
                if best.as_ref().is_none_or(|(bs, ..)| s < *bs) {
                    best = Some((s, i, Rect::new(fr.x, fr.y, h, w), true));
                }
            }
        }
        best.map(|(_, idx, r, rot)| (idx, r, rot))
    }

    fn split(&self, fr: &Rect, placed: &Rect) -> (Option<Rect>, Option<Rect>) {
        // Leftover widths/heights to the right of and below the placed cell.
        let w_right = fr.right().saturating_sub(placed.right()) as u64;
        let h_bottom = fr.bottom().saturating_sub(placed.bottom()) as u64;

        let split_horizontal = match self.split {
            GuillotineSplit::SplitShorterLeftoverAxis => w_right <= h_bottom,
            GuillotineSplit::SplitLongerLeftoverAxis => w_right > h_bottom,
            GuillotineSplit::SplitMinimizeArea => {
                (placed.w as u64 * h_bottom) > (w_right * placed.h as u64)
            }
            GuillotineSplit::SplitMaximizeArea => {
                (placed.w as u64 * h_bottom) <= (w_right * placed.h as u64)
            }
            GuillotineSplit::SplitShorterAxis => fr.w <= fr.h,
            GuillotineSplit::SplitLongerAxis => fr.w > fr.h,
        };

        // Bottom and right leftovers; which one spans the full side depends on the cut.
        let mut bottom = Rect::new(fr.x, placed.bottom(), 0, fr.h.saturating_sub(placed.h));
        let mut right = Rect::new(placed.right(), fr.y, fr.w.saturating_sub(placed.w), 0);
        if split_horizontal {
            bottom.w = fr.w;
            right.h = placed.h;
        } else {
            bottom.w = placed.w;
            right.h = fr.h;
        }
        let r1 = (bottom.w > 0 && bottom.h > 0).then_some(bottom);
        let r2 = (right.w > 0 && right.h > 0).then_some(right);
        (r1, r2)
    }

    fn place(&mut self, idx: usize, placed: &Rect) {
        let fr = self.free.remove(idx);
        let (a, b) = self.split(&fr, placed);
        self.free.extend(a);
        self.free.extend(b);
        self.merge_free_list();
    }

    /// Joins free rects that share a full edge; guillotine leftovers stay disjoint.
    fn merge_free_list(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.free.len() {
                for j in i + 1..self.free.len() {
                    let a = self.free[i];
                    let b = self.free[j];
                    let joined = if a.y == b.y && a.h == b.h && a.right() == b.x {
                        Some(Rect::new(a.x, a.y, a.w + b.w, a.h))
                    } else if a.y == b.y && a.h == b.h && b.right() == a.x {
                        Some(Rect::new(b.x, a.y, a.w + b.w, a.h))
                    } else if a.x == b.x && a.w == b.w && a.bottom() == b.y {
                        Some(Rect::new(a.x, a.y, a.w, a.h + b.h))
                    } else if a.x == b.x && a.w == b.w && b.bottom() == a.y {
                        Some(Rect::new(a.x, b.y, a.w, a.h + b.h))
                    } else {
                        None
                    };
                    if let Some(r) = joined {
                        self.free[i] = r;
                        self.free.remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }
}

impl Packer for GuillotinePacker {
    fn insert(&mut self, w: u32, h: u32) -> Option<(Rect, bool)> {
        let (idx, place, rotated) = self.choose(w, h)?;
        self.place(idx, &place);
        Some((place, rotated))
    }
}

pub struct GuillotineStrategy {
    pub choice: GuillotineChoice,
    pub split: GuillotineSplit,
    pub sort: SortOrder,
}

impl PackingStrategy for GuillotineStrategy {
    fn id(&self) -> StrategyId {
        StrategyId {
            packer: PackerKind::Guillotine,
            heuristic: Heuristic::Guillotine(self.choice, self.split),
        }
    }

    fn fill(&self, items: &[PackItem], width: u32, height: u32, allow_rotation: bool) -> Fill {
        let order = sorted_items(items, self.sort);
        let bin = GuillotinePacker::new(width, height, self.choice, self.split, allow_rotation);
        greedy_fill(bin, &order)
    }
}
