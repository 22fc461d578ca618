use super::{Fill, Packer, PackingStrategy, greedy_fill, sorted_items};
use crate::config::{Heuristic, MaxRectsHeuristic, PackerKind, SortOrder};
use crate::model::{PackItem, Rect, StrategyId};

/// Single-bin MaxRects state: the list of maximal free rectangles plus the used cells.
pub struct MaxRectsPacker {
    border: Rect,
    free: Vec<Rect>,
    used: Vec<Rect>,
    heuristic: MaxRectsHeuristic,
    allow_rotation: bool,
}

/// Candidate scores, lower is better: (primary, secondary, leftover area).
type Score = (i64, i64, i64);

impl MaxRectsPacker {
    pub fn new(width: u32, height: u32, heuristic: MaxRectsHeuristic, allow_rotation: bool) -> Self {
        let border = Rect::new(0, 0, width, height);
        Self {
            border,
            free: vec![border],
            used: Vec::new(),
            heuristic,
            allow_rotation,
        }
    }

    fn place_rect(&mut self, node: &Rect) {
        let mut new_free: Vec<Rect> = Vec::new();
        let mut i = 0usize;
        while i < self.free.len() {
            let fr = self.free[i];
            if fr.intersects(node) {
                // the free rect is consumed; its leftovers go to new_free
                self.free.remove(i);
                split_free_node(fr, node, &mut new_free);
            } else {
                i += 1;
            }
        }
        self.prune_new_vs_old(&mut new_free);
        prune_within(&mut new_free);
        self.free.extend(new_free);
        self.used.push(*node);
    }

    fn prune_new_vs_old(&mut self, new_free: &mut Vec<Rect>) {
        new_free.retain(|nr| nr.w > 0 && nr.h > 0 && !self.free.iter().any(|of| of.contains(nr)));
        self.free
            .retain(|of| !new_free.iter().any(|nr| nr.contains(of)));
    }

    fn score(&self, fr: &Rect, w: u32, h: u32) -> Score {
        let leftover_h = fr.w as i64 - w as i64;
        let leftover_v = fr.h as i64 - h as i64;
        let short_fit = leftover_h.min(leftover_v);
        let long_fit = leftover_h.max(leftover_v);
        let area_fit = fr.area() as i64 - (w as i64) * (h as i64);
        let (s1, s2) = match self.heuristic {
            MaxRectsHeuristic::BestAreaFit => (area_fit, short_fit),
            MaxRectsHeuristic::BestShortSideFit => (short_fit, long_fit),
            MaxRectsHeuristic::BestLongSideFit => (long_fit, short_fit),
            MaxRectsHeuristic::BottomLeft => (fr.y as i64 + h as i64, fr.x as i64),
            MaxRectsHeuristic::ContactPoint => {
                // maximize contact score: use negative for minimization
                let contact = self.contact_point_score(fr.x, fr.y, w, h);
                (-(contact as i64), area_fit)
            }
        };
        (s1, s2, area_fit)
    }

    /// Best position for a `w x h` cell. Free-list order breaks exact ties.
    fn find_position(&self, w: u32, h: u32) -> Option<(Rect, bool)> {
        let mut best: Option<(Score, Rect, bool)> = None;
        for fr in &self.free {
            if fr.w >= w && fr.h >= h {
                // perfect fit early-out
                if fr.w == w && fr.h == h {
                    return Some((Rect::new(fr.x, fr.y, w, h), false));
                }
                let s = self.score(fr, w, h);
                if best.as_ref().is_none_or(|(bs, ..)| s < *bs) {
                    best = Some((s, Rect::new(fr.x, fr.y, w, h), false));
                }
            }
            if self.allow_rotation && w != h && fr.w >= h && fr.h >= w {
                if fr.w == h && fr.h == w {
                    return Some((Rect::new(fr.x, fr.y, h, w), true));
                }
                let s = self.score(fr, h, w);
                if best.as_ref().is_none_or(|(bs, ..)| s < *bs) {
                    best = Some((s, Rect::new(fr.x, fr.y, h, w), true));
                }
            }
        }
        best.map(|(_, r, rot)| (r, rot))
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u32;
        // contact with borders
        if node.x == self.border.x {
            score += node.h;
        }
        if node.y == self.border.y {
            score += node.w;
        }
        if node.right() == self.border.right() {
            score += node.h;
        }
        if node.bottom() == self.border.bottom() {
            score += node.w;
        }

        // contact with used rectangles
        for u in &self.used {
            if node.x == u.right() || u.x == node.right() {
                score += overlap_1d(node.y, node.bottom(), u.y, u.bottom());
            }
            if node.y == u.bottom() || u.y == node.bottom() {
                score += overlap_1d(node.x, node.right(), u.x, u.right());
            }
        }
        score
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }
}

impl Packer for MaxRectsPacker {
    fn insert(&mut self, w: u32, h: u32) -> Option<(Rect, bool)> {
        let (place, rotated) = self.find_position(w, h)?;
        self.place_rect(&place);
        Some((place, rotated))
    }
}

/// Splits `fr` around `node` into up to four maximal leftovers.
fn split_free_node(fr: Rect, node: &Rect, out: &mut Vec<Rect>) {
    // Left
    if node.x > fr.x && node.x < fr.right() {
        out.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
    }
    // Right
    if node.right() < fr.right() {
        out.push(Rect::new(node.right(), fr.y, fr.right() - node.right(), fr.h));
    }
    // Top
    if node.y > fr.y && node.y < fr.bottom() {
        out.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
    }
    // Bottom
    if node.bottom() < fr.bottom() {
        out.push(Rect::new(fr.x, node.bottom(), fr.w, fr.bottom() - node.bottom()));
    }
}

fn prune_within(v: &mut Vec<Rect>) {
    let mut i = 0;
    while i < v.len() {
        let a = v[i];
        let dominated = v
            .iter()
            .enumerate()
            .any(|(j, b)| j != i && b.contains(&a) && (a != *b || j < i));
        if dominated {
            v.remove(i);
        } else {
            i += 1;
        }
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

/// MaxRects over a stable presort.
pub struct MaxRectsStrategy {
    pub heuristic: MaxRectsHeuristic,
    pub sort: SortOrder,
}

impl PackingStrategy for MaxRectsStrategy {
    fn id(&self) -> StrategyId {
        StrategyId {
            packer: PackerKind::MaxRects,
            heuristic: Heuristic::MaxRects(self.heuristic),
        }
    }

    fn fill(&self, items: &[PackItem], width: u32, height: u32, allow_rotation: bool) -> Fill {
        let order = sorted_items(items, self.sort);
        let bin = MaxRectsPacker::new(width, height, self.heuristic, allow_rotation);
        greedy_fill(bin, &order)
    }
}
