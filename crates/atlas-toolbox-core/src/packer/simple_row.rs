use super::{Fill, Packer, PackingStrategy, greedy_fill};
use crate::config::{Heuristic, PackerKind};
use crate::model::{PackItem, Rect, StrategyId};

/// Left-to-right rows; an item that does not fit the current row starts a new one.
pub struct SimpleRowPacker {
    width: u32,
    height: u32,
    cursor_x: u32,
    row_y: u32,
    row_h: u32,
    allow_rotation: bool,
}

impl SimpleRowPacker {
    pub fn new(width: u32, height: u32, allow_rotation: bool) -> Self {
        Self {
            width,
            height,
            cursor_x: 0,
            row_y: 0,
            row_h: 0,
            allow_rotation,
        }
    }

    fn fits_at(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        x.saturating_add(w) <= self.width && y.saturating_add(h) <= self.height
    }
}

impl Packer for SimpleRowPacker {
    fn insert(&mut self, w: u32, h: u32) -> Option<(Rect, bool)> {
        let can_rotate = self.allow_rotation && w != h;
        // current row, as-is first
        let (x, y) = (self.cursor_x, self.row_y);
        let in_row = if self.fits_at(x, y, w, h) {
            Some((w, h, false))
        } else if can_rotate && self.fits_at(x, y, h, w) {
            Some((h, w, true))
        } else {
            None
        };
        if let Some((rw, rh, rot)) = in_row {
            self.cursor_x += rw;
            self.row_h = self.row_h.max(rh);
            return Some((Rect::new(x, y, rw, rh), rot));
        }

        // wrap
        let y = self.row_y.saturating_add(self.row_h);
        let (rw, rh, rot) = if self.fits_at(0, y, w, h) {
            (w, h, false)
        } else if can_rotate && self.fits_at(0, y, h, w) {
            (h, w, true)
        } else {
            return None;
        };
        self.row_y = y;
        self.row_h = rh;
        self.cursor_x = rw;
        Some((Rect::new(0, y, rw, rh), rot))
    }
}

pub struct SimpleRowStrategy;

impl PackingStrategy for SimpleRowStrategy {
    fn id(&self) -> StrategyId {
        StrategyId {
            packer: PackerKind::SimpleRow,
            heuristic: Heuristic::Auto,
        }
    }

    fn fill(&self, items: &[PackItem], width: u32, height: u32, allow_rotation: bool) -> Fill {
        let bin = SimpleRowPacker::new(width, height, allow_rotation);
        greedy_fill(bin, items)
    }
}
