use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Nothing to pack")]
    Empty,
    #[error(
        "No canvas up to {}x{} can hold the sprites ({required_area} px² required)",
        .attempted.0,
        .attempted.1
    )]
    SizingExhausted {
        attempted: (u32, u32),
        required_area: u64,
    },
    #[error("Atlas generation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AtlasError>;

/// Non-fatal issue collected while building an atlas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The sprite was left out of the atlas (e.g. fully transparent with trimming on).
    UnplaceableSprite { name: String, reason: String },
    /// Manual sizing could not hold every sprite; `unplaced` names the ones left out.
    CanvasOverflow {
        width: u32,
        height: u32,
        unplaced: Vec<String>,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnplaceableSprite { name, reason } => {
                write!(f, "sprite '{name}' skipped: {reason}")
            }
            Warning::CanvasOverflow {
                width,
                height,
                unplaced,
            } => write!(
                f,
                "{} sprite(s) did not fit on the {width}x{height} canvas: {}",
                unplaced.len(),
                unplaced.join(", ")
            ),
        }
    }
}
