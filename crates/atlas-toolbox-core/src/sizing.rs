use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::cancel::CancelToken;
use crate::config::{AtlasConfig, SizingPolicy};
use crate::error::{AtlasError, Result};
use crate::model::{Canvas, PackItem, PackingResult, StrategyId};
use crate::packer::Portfolio;

/// Smallest power of two `>= v` (1 for 0).
pub fn next_pow2(v: u32) -> u32 {
    v.max(1).checked_next_power_of_two().unwrap_or(1 << 31)
}

/// Largest power of two `<= v` (0 for 0).
pub fn prev_pow2(v: u32) -> u32 {
    if v == 0 { 0 } else { 1 << (31 - v.leading_zeros()) }
}

/// Ceiling of the square root of `area`.
fn ceil_sqrt(area: u64) -> u64 {
    let mut s = (area as f64).sqrt() as u64;
    while s.saturating_mul(s) < area {
        s += 1;
    }
    while s > 0 && (s - 1) * (s - 1) >= area {
        s -= 1;
    }
    s
}

/// Rounding/clamping rules shared by every candidate of one search.
#[derive(Debug, Clone, Copy)]
struct Shape {
    pow2: bool,
    square: bool,
    max: (u32, u32),
}

impl Shape {
    fn new(cfg: &AtlasConfig, max: (u32, u32)) -> Self {
        Self {
            pow2: cfg.use_power_of_two,
            square: cfg.square,
            max,
        }
    }

    fn apply(&self, (mut w, mut h): (u32, u32)) -> (u32, u32) {
        let (mut mw, mut mh) = self.max;
        if self.square {
            let s = w.max(h);
            let ms = mw.min(mh);
            w = s;
            h = s;
            mw = ms;
            mh = ms;
        }
        let fit = |v: u32, max: u32| {
            if self.pow2 {
                let p = next_pow2(v);
                if p > max { prev_pow2(max) } else { p }
            } else {
                v.min(max)
            }
        };
        (fit(w, mw), fit(h, mh))
    }

    fn grow(&self, v: u32) -> u32 {
        if self.pow2 {
            v.saturating_mul(2).max(1)
        } else {
            v.saturating_add((v / 8).max(1))
        }
    }

    /// Next candidate after `cur`, alternating axes (width when `w <= h`).
    /// `None` once neither axis can grow inside the bounds.
    fn next(&self, cur: (u32, u32)) -> Option<(u32, u32)> {
        let (w, h) = cur;
        let grow_w = (self.grow(w), h);
        let grow_h = (w, self.grow(h));
        let order = if w <= h { [grow_w, grow_h] } else { [grow_h, grow_w] };
        order
            .into_iter()
            .map(|c| self.apply(c))
            .find(|&(nw, nh)| nw >= w && nh >= h && (nw, nh) != cur)
    }
}

/// The ordered, strictly growing candidate sizes a search would visit from `start`.
///
/// Each candidate is at least as large as its predecessor on both axes.
pub struct CandidateSizes {
    shape: Shape,
    next: Option<(u32, u32)>,
}

impl CandidateSizes {
    /// Candidates for `Automatic` sizing of `items` under `cfg`.
    pub fn automatic(items: &[PackItem], cfg: &AtlasConfig) -> Self {
        let ceiling = cfg.max_canvas_size;
        Self::between(items, cfg, (0, 0), (ceiling, ceiling))
    }

    fn between(items: &[PackItem], cfg: &AtlasConfig, min: (u32, u32), max: (u32, u32)) -> Self {
        let shape = Shape::new(cfg, max);
        let side = lower_bound_side(items);
        let start = (side.max(min.0).min(max.0), side.max(min.1).min(max.1));
        Self {
            shape,
            next: Some(shape.apply(start)),
        }
    }
}

impl Iterator for CandidateSizes {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let cur = self.next?;
        self.next = self.shape.next(cur);
        Some(cur)
    }
}

/// `max(ceil(sqrt(total area)), widest item, tallest item)`, saturated to `u32`.
fn lower_bound_side(items: &[PackItem]) -> u32 {
    let area: u64 = items.iter().map(|i| i.area()).sum();
    let widest = items.iter().map(|i| i.w).max().unwrap_or(0);
    let tallest = items.iter().map(|i| i.h).max().unwrap_or(0);
    let side = ceil_sqrt(area).min(u32::MAX as u64) as u32;
    side.max(widest).max(tallest).max(1)
}

/// Shrinks a successful canvas to the bounding extent of its placements, then re-applies
/// power-of-two / square rounding and the `min` floor. Never grows past the candidate.
fn tighten(canvas: Canvas, cfg: &AtlasConfig, min: (u32, u32)) -> Canvas {
    let used_w = canvas.placements.iter().map(|p| p.x + p.w).max().unwrap_or(0);
    let used_h = canvas.placements.iter().map(|p| p.y + p.h).max().unwrap_or(0);
    let (mut w, mut h) = (used_w.max(min.0).max(1), used_h.max(min.1).max(1));
    if cfg.use_power_of_two {
        w = next_pow2(w);
        h = next_pow2(h);
    }
    if cfg.square {
        let s = w.max(h);
        w = s;
        h = s;
    }
    let (cw, ch) = canvas.candidate;
    Canvas {
        width: w.min(cw),
        height: h.min(ch),
        ..canvas
    }
}

/// Result of running a sizing policy over a set of items.
#[derive(Debug, Clone)]
pub struct SizingOutcome {
    pub result: PackingResult,
    /// Items left out by `Manual` sizing; always empty for the other policies.
    pub unplaced: Vec<usize>,
}

/// Runs the configured sizing policy over `items`.
///
/// Returns `AtlasError::SizingExhausted` when `Automatic` reaches the ceiling or a `MinMax`
/// item cannot fit the maximum size, and `AtlasError::Cancelled` when `cancel` fires.
#[instrument(skip_all, fields(items = items.len(), sizing = ?cfg.sizing))]
pub fn pack(items: &[PackItem], cfg: &AtlasConfig, cancel: &CancelToken) -> Result<SizingOutcome> {
    let portfolio = Portfolio::new(cfg);
    let fallback_id = StrategyId {
        packer: cfg.packer,
        heuristic: cfg.heuristic,
    };
    let mut attempted = Vec::new();
    if items.is_empty() {
        return Ok(SizingOutcome {
            result: PackingResult {
                canvases: Vec::new(),
                strategy: fallback_id,
                attempted_sizes: attempted,
            },
            unplaced: Vec::new(),
        });
    }

    let (canvases, unplaced) = match cfg.sizing {
        SizingPolicy::Automatic => {
            let ceiling = cfg.max_canvas_size;
            let top = Shape::new(cfg, (ceiling, ceiling)).apply((ceiling, ceiling));
            reject_oversized(items, top, cfg.allow_rotation)?;
            let canvas = pack_automatic(items, cfg, &portfolio, cancel, &mut attempted)?;
            (vec![canvas], Vec::new())
        }
        SizingPolicy::MinMax { min, max } => {
            let canvases = pack_min_max(items, cfg, min, max, &portfolio, cancel, &mut attempted)?;
            (canvases, Vec::new())
        }
        SizingPolicy::Manual { width, height } => {
            pack_manual(items, cfg, (width, height), &portfolio, cancel, &mut attempted)?
        }
    };

    let strategy = canvases.first().map_or(fallback_id, |c| c.strategy);
    Ok(SizingOutcome {
        result: PackingResult {
            canvases,
            strategy,
            attempted_sizes: attempted,
        },
        unplaced,
    })
}

fn pack_automatic(
    items: &[PackItem],
    cfg: &AtlasConfig,
    portfolio: &Portfolio,
    cancel: &CancelToken,
    attempted: &mut Vec<(u32, u32)>,
) -> Result<Canvas> {
    let finish = |c: Canvas| tighten(c, cfg, (0, 0));
    let mut last = (0, 0);
    for (w, h) in CandidateSizes::automatic(items, cfg) {
        cancel.check()?;
        attempted.push((w, h));
        last = (w, h);
        debug!(width = w, height = h, "trying candidate size");
        if let Some(canvas) = portfolio.try_pack(items, w, h, cfg.allow_rotation, cancel, &finish)? {
            info!(
                width = canvas.width,
                height = canvas.height,
                strategy = %canvas.strategy,
                fill = canvas.fill_ratio(),
                "canvas accepted"
            );
            return Ok(canvas);
        }
    }
    Err(AtlasError::SizingExhausted {
        attempted: last,
        required_area: items.iter().map(|i| i.area()).sum(),
    })
}

fn fits_within(item: &PackItem, (mw, mh): (u32, u32), allow_rotation: bool) -> bool {
    (item.w <= mw && item.h <= mh) || (allow_rotation && item.h <= mw && item.w <= mh)
}

/// Fails with `SizingExhausted` when some item exceeds `top` in both orientations.
fn reject_oversized(items: &[PackItem], top: (u32, u32), allow_rotation: bool) -> Result<()> {
    match items.iter().find(|i| !fits_within(i, top, allow_rotation)) {
        Some(big) => Err(AtlasError::SizingExhausted {
            attempted: top,
            required_area: big.area(),
        }),
        None => Ok(()),
    }
}

fn pack_min_max(
    items: &[PackItem],
    cfg: &AtlasConfig,
    min: (u32, u32),
    max: (u32, u32),
    portfolio: &Portfolio,
    cancel: &CancelToken,
    attempted: &mut Vec<(u32, u32)>,
) -> Result<Vec<Canvas>> {
    let top = Shape::new(cfg, max).apply(max);
    reject_oversized(items, top, cfg.allow_rotation)?;

    let finish = |c: Canvas| tighten(c, cfg, min);
    let mut remaining: Vec<PackItem> = items.to_vec();
    let mut canvases = Vec::new();

    while !remaining.is_empty() {
        let mut last = top;
        let mut done = None;
        for (w, h) in CandidateSizes::between(&remaining, cfg, min, max) {
            cancel.check()?;
            attempted.push((w, h));
            last = (w, h);
            debug!(width = w, height = h, remaining = remaining.len(), "trying candidate size");
            if let Some(canvas) =
                portfolio.try_pack(&remaining, w, h, cfg.allow_rotation, cancel, &finish)?
            {
                done = Some(canvas);
                break;
            }
        }
        if let Some(canvas) = done {
            info!(
                index = canvases.len(),
                width = canvas.width,
                height = canvas.height,
                strategy = %canvas.strategy,
                "canvas accepted"
            );
            canvases.push(canvas);
            break;
        }

        // Even the largest size fails: keep the best partial fill and carry the rest over.
        let (w, h) = last;
        let Some((strategy, fill)) = portfolio.best_fill(&remaining, w, h, cfg.allow_rotation, cancel)?
        else {
            break;
        };
        if fill.placements.is_empty() {
            return Err(AtlasError::SizingExhausted {
                attempted: last,
                required_area: remaining.iter().map(|i| i.area()).sum(),
            });
        }
        let canvas = finish(Canvas {
            width: w,
            height: h,
            candidate: (w, h),
            placements: fill.placements,
            strategy,
        });
        info!(
            index = canvases.len(),
            width = canvas.width,
            height = canvas.height,
            carried = fill.unplaced.len(),
            "canvas full, opening another"
        );
        canvases.push(canvas);
        let left: HashSet<usize> = fill.unplaced.into_iter().collect();
        remaining.retain(|i| left.contains(&i.id));
    }
    Ok(canvases)
}

fn pack_manual(
    items: &[PackItem],
    cfg: &AtlasConfig,
    size: (u32, u32),
    portfolio: &Portfolio,
    cancel: &CancelToken,
    attempted: &mut Vec<(u32, u32)>,
) -> Result<(Vec<Canvas>, Vec<usize>)> {
    let ceiling = cfg.max_canvas_size;
    let (w, h) = Shape::new(cfg, (ceiling, ceiling)).apply(size);
    cancel.check()?;
    attempted.push((w, h));
    debug!(width = w, height = h, "manual size");

    // items larger than the page never reach a strategy
    let (fitting, oversized): (Vec<PackItem>, Vec<PackItem>) = items
        .iter()
        .copied()
        .partition(|i| fits_within(i, (w, h), cfg.allow_rotation));
    let mut unplaced: Vec<usize> = oversized.iter().map(|i| i.id).collect();
    let blank = Canvas {
        width: w,
        height: h,
        candidate: (w, h),
        placements: Vec::new(),
        strategy: StrategyId {
            packer: cfg.packer,
            heuristic: cfg.heuristic,
        },
    };

    // one greedy pass per strategy; a fill with nothing left over is a full success
    let Some((strategy, fill)) = portfolio.best_fill(&fitting, w, h, cfg.allow_rotation, cancel)?
    else {
        unplaced.extend(fitting.iter().map(|i| i.id));
        return Ok((vec![blank], unplaced));
    };
    if !fill.unplaced.is_empty() || !unplaced.is_empty() {
        debug!(
            placed = fill.placements.len(),
            unplaced = fill.unplaced.len() + unplaced.len(),
            "manual size overflowed"
        );
    }
    unplaced.extend(fill.unplaced);
    let canvas = Canvas {
        placements: fill.placements,
        strategy,
        ..blank
    };
    Ok((vec![canvas], unplaced))
}
