use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::cancel::CancelToken;
use crate::compositing::blit_rgba;
use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result, Warning};
use crate::geometry::{Prepared, Sprite, SpriteEntry, transform};
use crate::model::{AtlasSummary, Canvas, PackItem, PackingResult, PlacedRect, PlacementRecord, Rect};
use crate::sizing;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One composed texture with the records of every sprite drawn on it.
#[derive(Debug, Clone)]
pub struct OutputPage {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub rgba: RgbaImage,
    /// Ordered by sprite input order.
    pub records: Vec<PlacementRecord>,
}

/// Output of an atlas job: RGBA pages, the packing result and any non-fatal warnings.
#[derive(Debug, Clone)]
pub struct AtlasOutput {
    pub pages: Vec<OutputPage>,
    pub result: PackingResult,
    pub warnings: Vec<Warning>,
}

impl AtlasOutput {
    pub fn summary(&self) -> AtlasSummary {
        summarize(&self.result, self.records().count())
    }

    /// Every placement record, page by page.
    pub fn records(&self) -> impl Iterator<Item = &PlacementRecord> {
        self.pages.iter().flat_map(|p| p.records.iter())
    }

    /// Pixel-free view of this output, as consumed by the exporters.
    pub fn layout(&self) -> LayoutOutput {
        LayoutOutput {
            pages: self
                .pages
                .iter()
                .map(|p| LayoutPage {
                    index: p.index,
                    width: p.width,
                    height: p.height,
                    records: p.records.clone(),
                })
                .collect(),
            result: self.result.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Layout-only page (no pixels).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutPage {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub records: Vec<PlacementRecord>,
}

/// Output of [`pack_layout`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutOutput {
    pub pages: Vec<LayoutPage>,
    pub result: PackingResult,
    pub warnings: Vec<Warning>,
}

impl LayoutOutput {
    pub fn summary(&self) -> AtlasSummary {
        summarize(&self.result, self.pages.iter().map(|p| p.records.len()).sum())
    }
}

fn summarize(result: &PackingResult, sprite_count: usize) -> AtlasSummary {
    AtlasSummary {
        canvas_count: result.canvases.len(),
        sizes: result.canvases.iter().map(|c| (c.width, c.height)).collect(),
        total_fill_ratio: result.total_fill_ratio(),
        sprite_count,
    }
}

/// Orchestrates one atlas job: geometry pass, sizing search, compositing.
#[derive(Debug, Clone, Default)]
pub struct AtlasBuilder {
    cfg: AtlasConfig,
    cancel: CancelToken,
}

impl AtlasBuilder {
    pub fn new(cfg: AtlasConfig) -> Self {
        Self {
            cfg,
            cancel: CancelToken::new(),
        }
    }

    /// Shares `token` with the caller so the job can be aborted between candidate sizes.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.cfg
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Packs `sprites` and composes the output pages.
    ///
    /// Notes:
    /// - Sprites sharing pixels through flip detection are drawn once; their records point at
    ///   the canonical sprite via `flip_of`.
    /// - Manual sizing that cannot hold every sprite still returns the partial page and reports
    ///   `Warning::CanvasOverflow`.
    #[instrument(skip_all, fields(sprites = sprites.len()))]
    pub fn build(&self, sprites: &[Sprite]) -> Result<AtlasOutput> {
        self.cfg.validate()?;
        if sprites.is_empty() {
            return Err(AtlasError::Empty);
        }
        self.cancel.check()?;

        let prepared = transform(sprites, &self.cfg);
        let outcome = sizing::pack(&prepared.items, &self.cfg, &self.cancel)?;
        let mut warnings = prepared.warnings.clone();
        if let Some(w) = overflow_warning(&prepared, &outcome) {
            warn!("{w}");
            warnings.push(w);
        }

        let pad = self.cfg.padding_px;
        let mut pages = Vec::with_capacity(outcome.result.canvases.len());
        for (index, canvas) in outcome.result.canvases.iter().enumerate() {
            self.cancel.check()?;
            let mut rgba = RgbaImage::new(canvas.width, canvas.height);
            for p in &canvas.placements {
                if let Some(entry) = prepared.canonical(p.id) {
                    let (w, h) = entry.pixels.dimensions();
                    blit_rgba(
                        &entry.pixels,
                        Rect::new(0, 0, w, h),
                        &mut rgba,
                        p.x + pad,
                        p.y + pad,
                        p.rotated,
                    );
                }
            }
            pages.push(OutputPage {
                index,
                width: canvas.width,
                height: canvas.height,
                rgba,
                records: canvas_records(canvas, &prepared, pad),
            });
        }

        let out = AtlasOutput {
            pages,
            result: outcome.result,
            warnings,
        };
        info!("{}", out.summary().summary());
        Ok(out)
    }
}

/// Content record for one sprite placed through cell `p`.
fn record(entry: &SpriteEntry, p: &PlacedRect, pad: u32) -> PlacementRecord {
    let pad2 = pad.saturating_mul(2);
    PlacementRecord {
        sprite_id: entry.sprite_id,
        name: entry.name.clone(),
        group: entry.group.clone(),
        x: p.x + pad,
        y: p.y + pad,
        w: p.w.saturating_sub(pad2),
        h: p.h.saturating_sub(pad2),
        rotated: p.rotated,
        trim_offset: (entry.source.x, entry.source.y),
        trimmed_size: (entry.source.w, entry.source.h),
        source_size: entry.source_size,
        flip_of: entry.flip_of,
    }
}

fn canvas_records(canvas: &Canvas, prepared: &Prepared, pad: u32) -> Vec<PlacementRecord> {
    let mut records: Vec<PlacementRecord> = canvas
        .placements
        .iter()
        .flat_map(|p| {
            prepared
                .members
                .get(p.id)
                .into_iter()
                .flatten()
                .filter_map(|&e| prepared.entries.get(e))
                .map(move |entry| record(entry, p, pad))
        })
        .collect();
    records.sort_by_key(|r| r.sprite_id);
    records
}

fn overflow_warning(prepared: &Prepared, outcome: &sizing::SizingOutcome) -> Option<Warning> {
    if outcome.unplaced.is_empty() {
        return None;
    }
    let mut ids: Vec<usize> = outcome
        .unplaced
        .iter()
        .filter_map(|&item| prepared.members.get(item))
        .flatten()
        .copied()
        .collect();
    ids.sort_unstable();
    let unplaced = ids
        .into_iter()
        .filter_map(|e| prepared.entries.get(e))
        .map(|e| e.name.clone())
        .collect();
    let (width, height) = outcome
        .result
        .canvases
        .first()
        .map_or((0, 0), |c| (c.width, c.height));
    Some(Warning::CanvasOverflow {
        width,
        height,
        unplaced,
    })
}

/// Packs bare sizes without pixel data. Inputs are (key, width, height); there is no trimming
/// or flip detection, but padding, rotation and sizing behave as in [`AtlasBuilder::build`].
#[instrument(skip_all, fields(items = inputs.len()))]
pub fn pack_layout<K: Into<String>>(
    inputs: Vec<(K, u32, u32)>,
    cfg: &AtlasConfig,
) -> Result<LayoutOutput> {
    cfg.validate()?;
    if inputs.is_empty() {
        return Err(AtlasError::Empty);
    }

    let mut prepared = Prepared::default();
    let pad2 = cfg.padding_px.saturating_mul(2);
    for (sprite_id, (key, w, h)) in inputs.into_iter().enumerate() {
        let name = key.into();
        if w == 0 || h == 0 {
            prepared.warnings.push(Warning::UnplaceableSprite {
                name,
                reason: format!("zero size ({w}x{h})"),
            });
            continue;
        }
        let item = prepared.items.len();
        prepared
            .items
            .push(PackItem::new(item, w.saturating_add(pad2), h.saturating_add(pad2)));
        prepared.members.push(vec![prepared.entries.len()]);
        prepared.entries.push(SpriteEntry {
            sprite_id,
            name,
            group: None,
            source: Rect::new(0, 0, w, h),
            source_size: (w, h),
            pixels: RgbaImage::new(0, 0),
            flip_of: None,
        });
    }

    let outcome = sizing::pack(&prepared.items, cfg, &CancelToken::new())?;
    let mut warnings = prepared.warnings.clone();
    warnings.extend(overflow_warning(&prepared, &outcome));
    let pages = outcome
        .result
        .canvases
        .iter()
        .enumerate()
        .map(|(index, canvas)| LayoutPage {
            index,
            width: canvas.width,
            height: canvas.height,
            records: canvas_records(canvas, &prepared, cfg.padding_px),
        })
        .collect();
    Ok(LayoutOutput {
        pages,
        result: outcome.result,
        warnings,
    })
}

/// One independent job for [`build_batch`].
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub name: String,
    pub sprites: Vec<Sprite>,
    pub cfg: AtlasConfig,
}

/// Runs independent jobs, in parallel with the `parallel` feature. Results keep job order; one
/// failing job does not affect the others. `cancel` is shared by every job.
#[instrument(skip_all, fields(jobs = jobs.len()))]
pub fn build_batch(jobs: &[BatchJob], cancel: &CancelToken) -> Vec<(String, Result<AtlasOutput>)> {
    let run = |job: &BatchJob| {
        let out = AtlasBuilder::new(job.cfg.clone())
            .with_cancel(cancel.clone())
            .build(&job.sprites);
        (job.name.clone(), out)
    };
    #[cfg(feature = "parallel")]
    {
        jobs.par_iter().map(run).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        jobs.iter().map(run).collect()
    }
}
