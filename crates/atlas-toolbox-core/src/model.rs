use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{Heuristic, PackerKind};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`, saturating).
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }
    /// Exclusive bottom edge (`y + h`, saturating).
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.right() || r.x >= self.right() || self.y >= r.bottom() || r.y >= self.bottom())
    }
}

/// One rectangle handed to a packing strategy. `w`/`h` already include padding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackItem {
    /// Index into the caller's item table; strategies echo it back in placements.
    pub id: usize,
    pub w: u32,
    pub h: u32,
}

impl PackItem {
    pub fn new(id: usize, w: u32, h: u32) -> Self {
        Self { id, w, h }
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
}

/// A padded cell placed on a canvas. When `rotated`, `w`/`h` are the swapped item size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacedRect {
    pub id: usize,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub rotated: bool,
}

impl PlacedRect {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// Identifies the concrete algorithm + heuristic that produced a canvas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyId {
    pub packer: PackerKind,
    pub heuristic: Heuristic,
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.heuristic {
            Heuristic::Auto => write!(f, "{}", self.packer),
            h => write!(f, "{}/{}", self.packer, h),
        }
    }
}

/// One output texture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    /// Candidate size the sizing policy handed to the strategy; `width`/`height` never exceed it.
    pub candidate: (u32, u32),
    pub placements: Vec<PlacedRect>,
    pub strategy: StrategyId,
}

impl Canvas {
    pub fn used_area(&self) -> u64 {
        self.placements.iter().map(|p| p.rect().area()).sum()
    }
    pub fn area(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }
    /// `sum(placed cell area) / (width * height)`.
    pub fn fill_ratio(&self) -> f64 {
        let area = self.area();
        if area == 0 {
            0.0
        } else {
            self.used_area() as f64 / area as f64
        }
    }
}

/// Ordered canvases plus the trace of candidate sizes the sizing policy tried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackingResult {
    pub canvases: Vec<Canvas>,
    pub strategy: StrategyId,
    pub attempted_sizes: Vec<(u32, u32)>,
}

impl PackingResult {
    pub fn total_fill_ratio(&self) -> f64 {
        let total: u64 = self.canvases.iter().map(|c| c.area()).sum();
        if total == 0 {
            return 0.0;
        }
        let used: u64 = self.canvases.iter().map(|c| c.used_area()).sum();
        used as f64 / total as f64
    }

    pub fn placed_count(&self) -> usize {
        self.canvases.iter().map(|c| c.placements.len()).sum()
    }
}

/// Metadata-only reference from a sprite to the canonical sprite whose pixels it reuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlipRef {
    /// Input index of the canonical sprite.
    pub canonical: usize,
    pub flip_h: bool,
    pub flip_v: bool,
}

/// Abstract placement record consumed by format serializers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementRecord {
    /// Input index of the sprite.
    pub sprite_id: usize,
    pub name: String,
    pub group: Option<String>,
    /// Content rectangle on the page (padding removed, post-rotation size).
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub rotated: bool,
    /// Offset of the trimmed content inside the original sprite.
    pub trim_offset: (u32, u32),
    pub trimmed_size: (u32, u32),
    /// Original (untrimmed) sprite size.
    pub source_size: (u32, u32),
    pub flip_of: Option<FlipRef>,
}

impl PlacementRecord {
    pub fn frame(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
    pub fn trimmed(&self) -> bool {
        self.trimmed_size != self.source_size
    }
}

/// Progress/result summary of one generation job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasSummary {
    pub canvas_count: usize,
    pub sizes: Vec<(u32, u32)>,
    pub total_fill_ratio: f64,
    pub sprite_count: usize,
}

impl AtlasSummary {
    /// Returns a human-readable summary line.
    pub fn summary(&self) -> String {
        let sizes: Vec<String> = self.sizes.iter().map(|(w, h)| format!("{w}x{h}")).collect();
        format!(
            "Canvases: {} [{}], Sprites: {}, Fill: {:.2}%",
            self.canvas_count,
            sizes.join(", "),
            self.sprite_count,
            self.total_fill_ratio * 100.0,
        )
    }
}
