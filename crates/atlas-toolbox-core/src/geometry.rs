use image::{DynamicImage, RgbaImage, imageops};
use tracing::{debug, warn};

use crate::config::AtlasConfig;
use crate::error::Warning;
use crate::flip::detect_flip_groups;
use crate::model::{FlipRef, PackItem, Rect};

/// In-memory sprite to pack: name, optional group tag and its RGBA pixels.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub name: String,
    /// Opaque tag carried through to the placement records.
    pub group: Option<String>,
    pub image: RgbaImage,
}

impl Sprite {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            group: None,
            image,
        }
    }

    pub fn from_dynamic(name: impl Into<String>, image: DynamicImage) -> Self {
        Self::new(name, image.to_rgba8())
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A sprite that survived trimming, with the metadata needed to reconstruct it.
#[derive(Debug, Clone)]
pub struct SpriteEntry {
    /// Input index of the sprite.
    pub sprite_id: usize,
    pub name: String,
    pub group: Option<String>,
    /// Trimmed content rectangle within the original sprite.
    pub source: Rect,
    pub source_size: (u32, u32),
    /// Trimmed pixels (`source.w x source.h`).
    pub pixels: RgbaImage,
    /// Set when this sprite reuses another sprite's pixels.
    pub flip_of: Option<FlipRef>,
}

/// Output of the geometry pass.
///
/// `items[i]` is the padded rectangle of one pixel buffer; `members[i]` lists the indices into
/// `entries` that share it, canonical first.
#[derive(Debug, Clone, Default)]
pub struct Prepared {
    pub items: Vec<PackItem>,
    pub entries: Vec<SpriteEntry>,
    pub members: Vec<Vec<usize>>,
    pub warnings: Vec<Warning>,
}

impl Prepared {
    /// Entry whose pixels item `item` carries.
    pub fn canonical(&self, item: usize) -> Option<&SpriteEntry> {
        self.members
            .get(item)
            .and_then(|m| m.first())
            .and_then(|&e| self.entries.get(e))
    }
}

/// Minimal bounding box of pixels with alpha above `threshold`, or `None` when there is none.
pub fn compute_trim_rect(rgba: &RgbaImage, threshold: u8) -> Option<Rect> {
    let (w, h) = rgba.dimensions();
    let opaque_col = |x: u32, y0: u32, y1: u32| (y0..y1).any(|y| rgba.get_pixel(x, y)[3] > threshold);
    let opaque_row = |y: u32, x0: u32, x1: u32| (x0..x1).any(|x| rgba.get_pixel(x, y)[3] > threshold);

    // left
    let x1 = (0..w).find(|&x| opaque_col(x, 0, h))?;
    // right (exclusive)
    let x2 = (x1..w).rev().find(|&x| opaque_col(x, 0, h)).map_or(x1 + 1, |x| x + 1);
    // top
    let y1 = (0..h).find(|&y| opaque_row(y, x1, x2))?;
    // bottom (exclusive)
    let y2 = (y1..h).rev().find(|&y| opaque_row(y, x1, x2)).map_or(y1 + 1, |y| y + 1);
    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}

/// Trims, de-duplicates and pads `sprites`.
///
/// Zero-sized sprites, and fully transparent ones when trimming, are skipped with a warning.
/// With `detect_flips`, mirrored or identical sprites collapse onto one packed item.
pub fn transform(sprites: &[Sprite], cfg: &AtlasConfig) -> Prepared {
    let mut out = Prepared::default();

    for (sprite_id, sprite) in sprites.iter().enumerate() {
        let (iw, ih) = sprite.image.dimensions();
        if iw == 0 || ih == 0 {
            warn!(name = %sprite.name, "zero-sized sprite skipped");
            out.warnings.push(Warning::UnplaceableSprite {
                name: sprite.name.clone(),
                reason: format!("zero size ({iw}x{ih})"),
            });
            continue;
        }
        let source = if cfg.trim {
            match compute_trim_rect(&sprite.image, cfg.trim_threshold) {
                Some(r) => r,
                None => {
                    warn!(name = %sprite.name, "fully transparent sprite skipped");
                    out.warnings.push(Warning::UnplaceableSprite {
                        name: sprite.name.clone(),
                        reason: "fully transparent".into(),
                    });
                    continue;
                }
            }
        } else {
            Rect::new(0, 0, iw, ih)
        };
        let pixels = if source == Rect::new(0, 0, iw, ih) {
            sprite.image.clone()
        } else {
            imageops::crop_imm(&sprite.image, source.x, source.y, source.w, source.h).to_image()
        };
        out.entries.push(SpriteEntry {
            sprite_id,
            name: sprite.name.clone(),
            group: sprite.group.clone(),
            source,
            source_size: (iw, ih),
            pixels,
            flip_of: None,
        });
    }

    if cfg.detect_flips && out.entries.len() > 1 {
        let buffers: Vec<&RgbaImage> = out.entries.iter().map(|e| &e.pixels).collect();
        let groups = detect_flip_groups(&buffers, cfg.parallel);
        let sprite_ids: Vec<usize> = out.entries.iter().map(|e| e.sprite_id).collect();
        for (entry, group) in out.entries.iter_mut().zip(groups) {
            // flip groups are indexed by entry; records want input indices
            entry.flip_of = group.map(|r| FlipRef {
                canonical: sprite_ids[r.canonical],
                ..r
            });
        }
    }

    // one item per canonical entry; members follow in entry (= input) order
    let mut item_of_sprite = std::collections::HashMap::new();
    let pad2 = cfg.padding_px.saturating_mul(2);
    for (e, entry) in out.entries.iter().enumerate() {
        let owner = entry.flip_of.map_or(entry.sprite_id, |r| r.canonical);
        let item = *item_of_sprite.entry(owner).or_insert_with(|| {
            let id = out.items.len();
            out.items.push(PackItem::new(
                id,
                entry.source.w.saturating_add(pad2),
                entry.source.h.saturating_add(pad2),
            ));
            out.members.push(Vec::new());
            id
        });
        out.members[item].push(e);
    }

    debug!(
        sprites = sprites.len(),
        entries = out.entries.len(),
        items = out.items.len(),
        "geometry prepared"
    );
    out
}
