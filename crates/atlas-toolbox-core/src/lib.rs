//! Core library for packing sprites into texture atlases.
//!
//! - Geometry: alpha trimming, flip/duplicate detection (blake3 + disjoint set), padding
//! - Algorithms: MaxRects (BAF/BSSF/BLSF/BL/CP), Skyline (BL/MW), Guillotine (choice + split),
//!   Shelf (NF/FF/BHF/BWF), Shelf-FFDH, Simple Row, and the `Automatic` portfolio over all of them
//! - Sizing: automatic growth search, min/max with overflow onto extra canvases, fixed manual size
//! - Builder: `AtlasBuilder` composes RGBA pages and emits serde-serializable placement records
//!
//! Quick example:
//! ```ignore
//! use atlas_toolbox_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let hero = image::open("hero.png")?;
//! let coin = image::open("coin.png")?;
//! let sprites = vec![
//!     Sprite::from_dynamic("hero", hero),
//!     Sprite::from_dynamic("coin", coin),
//! ];
//! let cfg = AtlasConfig::builder().pow2(true).detect_flips(true).build();
//! let out = AtlasBuilder::new(cfg).build(&sprites)?;
//! println!("{}", out.summary().summary());
//! # Ok(()) }
//! ```

pub mod builder;
pub mod cancel;
pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod flip;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod sizing;

pub use builder::*;
pub use cancel::CancelToken;
pub use config::*;
pub use error::*;
pub use export::*;
pub use geometry::{Prepared, Sprite, SpriteEntry};
pub use model::*;
pub use packer::{Fill, Packer, PackingStrategy, Portfolio};

/// Convenience prelude for common types and functions.
/// Importing `atlas_toolbox_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::builder::{
        AtlasBuilder, AtlasOutput, BatchJob, LayoutOutput, LayoutPage, OutputPage, build_batch,
        pack_layout,
    };
    pub use crate::cancel::CancelToken;
    pub use crate::config::{
        AtlasConfig, AtlasConfigBuilder, GuillotineChoice, GuillotineSplit, Heuristic,
        MaxRectsHeuristic, PackerKind, ShelfHeuristic, SizingPolicy, SkylineHeuristic, SortOrder,
    };
    pub use crate::error::{AtlasError, Warning};
    pub use crate::geometry::Sprite;
    pub use crate::model::{
        AtlasSummary, Canvas, FlipRef, PackItem, PackingResult, PlacedRect, PlacementRecord, Rect,
        StrategyId,
    };
}
