use super::{Fill, Packer, PackingStrategy, greedy_fill, sorted_items};
use crate::config::{Heuristic, PackerKind, SkylineHeuristic, SortOrder};
use crate::model::{PackItem, Rect, StrategyId};

#[derive(Clone, Copy, Debug)]
struct SkylineNode {
    x: u32,
    y: u32,
    w: u32,
}

impl SkylineNode {
    #[inline]
    fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }
}

pub struct SkylinePacker {
    border: Rect,
    skylines: Vec<SkylineNode>,
    heuristic: SkylineHeuristic,
    allow_rotation: bool,
}

impl SkylinePacker {
    pub fn new(width: u32, height: u32, heuristic: SkylineHeuristic, allow_rotation: bool) -> Self {
        Self {
            border: Rect::new(0, 0, width, height),
            skylines: vec![SkylineNode { x: 0, y: 0, w: width }],
            heuristic,
            allow_rotation,
        }
    }

    /// Cell of `w x h` resting on the skyline starting at node `i`, if it stays inside the border.
    fn can_put(&self, mut i: usize, w: u32, h: u32) -> Option<Rect> {
        let mut rect = Rect::new(self.skylines[i].x, 0, w, h);
        if rect.right() > self.border.right() {
            return None;
        }
        let mut width_left = w;
        loop {
            rect.y = rect.y.max(self.skylines[i].y);
            if rect.bottom() > self.border.bottom() {
                return None;
            }
            if self.skylines[i].w >= width_left {
                return Some(rect);
            }
            width_left -= self.skylines[i].w;
            i += 1;
            if i >= self.skylines.len() {
                return None;
            }
        }
    }

    fn find_skyline(&self, w: u32, h: u32) -> Option<(usize, Rect)> {
        let mut best: Option<((u64, u64), usize, Rect)> = None;
        let consider = |i: usize, r: Rect, best: &mut Option<((u64, u64), usize, Rect)>| {
            let key = match self.heuristic {
                SkylineHeuristic::BottomLeft => (r.bottom() as u64, self.skylines[i].w as u64),
                SkylineHeuristic::MinWaste => (self.wasted_area_for(i, &r), r.bottom() as u64),
            };
            if best.as_ref().is_none_or(|(bk, ..)| key < *bk) {
                *best = Some((key, i, r));
            }
        };
        for i in 0..self.skylines.len() {
            if let Some(r) = self.can_put(i, w, h) {
                consider(i, r, &mut best);
            }
            if self.allow_rotation && w != h {
                if let Some(r) = self.can_put(i, h, w) {
                    consider(i, r, &mut best);
                }
            }
        }
        best.map(|(_, i, r)| (i, r))
    }

    /// Area trapped between the skyline and the underside of `r`.
    fn wasted_area_for(&self, start: usize, r: &Rect) -> u64 {
        let mut area = 0u64;
        let mut width_left = r.w;
        let mut i = start;
        while width_left > 0 && i < self.skylines.len() {
            let seg = &self.skylines[i];
            let use_w = width_left.min(seg.w);
            if seg.y < r.y {
                area += (r.y - seg.y) as u64 * use_w as u64;
            }
            width_left -= use_w;
            i += 1;
        }
        area
    }

    fn add_level(&mut self, index: usize, rect: &Rect) {
        let node = SkylineNode {
            x: rect.x,
            y: rect.bottom(),
            w: rect.w,
        };
        self.skylines.insert(index, node);

        let i = index + 1;
        while i < self.skylines.len() {
            let prev_right = self.skylines[i - 1].right();
            if self.skylines[i].x >= prev_right {
                break;
            }
            let shrink = prev_right - self.skylines[i].x;
            if self.skylines[i].w <= shrink {
                self.skylines.remove(i);
            } else {
                self.skylines[i].x += shrink;
                self.skylines[i].w -= shrink;
                break;
            }
        }
    }

    fn merge(&mut self) {
        let mut i = 1;
        while i < self.skylines.len() {
            if self.skylines[i - 1].y == self.skylines[i].y {
                let w = self.skylines[i].w;
                self.skylines[i - 1].w += w;
                self.skylines.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

impl Packer for SkylinePacker {
    fn insert(&mut self, w: u32, h: u32) -> Option<(Rect, bool)> {
        let (i, place) = self.find_skyline(w, h)?;
        self.add_level(i, &place);
        self.merge();
        let rotated = w != h && place.w != w;
        Some((place, rotated))
    }
}

pub struct SkylineStrategy {
    pub heuristic: SkylineHeuristic,
    pub sort: SortOrder,
}

impl PackingStrategy for SkylineStrategy {
    fn id(&self) -> StrategyId {
        StrategyId {
            packer: PackerKind::Skyline,
            heuristic: Heuristic::Skyline(self.heuristic),
        }
    }

    fn fill(&self, items: &[PackItem], width: u32, height: u32, allow_rotation: bool) -> Fill {
        let order = sorted_items(items, self.sort);
        let bin = SkylinePacker::new(width, height, self.heuristic, allow_rotation);
        greedy_fill(bin, &order)
    }
}
