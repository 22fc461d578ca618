use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::sizing::next_pow2;

/// Packing algorithm families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PackerKind {
    /// Run every family against the same candidate size and keep the best fill ratio.
    Automatic,
    /// Free-rectangle list with full split/prune (best quality on mixed sizes).
    MaxRects,
    /// Guillotine cuts only (fast; good on same-sized sets).
    Guillotine,
    /// Horizontal shelves in input order.
    Shelf,
    /// Shelves after a presort by decreasing height (first-fit decreasing height).
    ShelfFfdh,
    /// Per-column height profile; lowest position first.
    Skyline,
    /// Left-to-right rows, wrap on overflow, no backtracking.
    SimpleRow,
}

impl PackerKind {
    /// Preference order used by `Automatic` to break fill-ratio ties.
    pub const REGISTRY_ORDER: [PackerKind; 6] = [
        PackerKind::MaxRects,
        PackerKind::Skyline,
        PackerKind::Guillotine,
        PackerKind::ShelfFfdh,
        PackerKind::Shelf,
        PackerKind::SimpleRow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackerKind::Automatic => "automatic",
            PackerKind::MaxRects => "maxrects",
            PackerKind::Guillotine => "guillotine",
            PackerKind::Shelf => "shelf",
            PackerKind::ShelfFfdh => "shelf-ffdh",
            PackerKind::Skyline => "skyline",
            PackerKind::SimpleRow => "simple-row",
        }
    }
}

impl fmt::Display for PackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackerKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "auto" | "automatic" => Ok(Self::Automatic),
            "maxrects" => Ok(Self::MaxRects),
            "guillotine" => Ok(Self::Guillotine),
            "shelf" => Ok(Self::Shelf),
            "shelf-ffdh" | "ffdh" => Ok(Self::ShelfFfdh),
            "skyline" => Ok(Self::Skyline),
            "simple-row" | "row" => Ok(Self::SimpleRow),
            _ => Err(()),
        }
    }
}

/// MaxRects placement heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MaxRectsHeuristic {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    BottomLeft,
    ContactPoint,
}

impl MaxRectsHeuristic {
    pub const ALL: [MaxRectsHeuristic; 5] = [
        Self::BestAreaFit,
        Self::BestShortSideFit,
        Self::BestLongSideFit,
        Self::BottomLeft,
        Self::ContactPoint,
    ];

    fn short_name(&self) -> &'static str {
        match self {
            Self::BestAreaFit => "baf",
            Self::BestShortSideFit => "bssf",
            Self::BestLongSideFit => "blsf",
            Self::BottomLeft => "bl",
            Self::ContactPoint => "cp",
        }
    }
}

impl FromStr for MaxRectsHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "bl" | "bottomleft" => Ok(Self::BottomLeft),
            "cp" | "contactpoint" => Ok(Self::ContactPoint),
            _ => Err(()),
        }
    }
}

/// Skyline placement heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkylineHeuristic {
    BottomLeft,
    MinWaste,
}

impl SkylineHeuristic {
    pub const ALL: [SkylineHeuristic; 2] = [Self::BottomLeft, Self::MinWaste];
}

impl FromStr for SkylineHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bl" | "bottomleft" => Ok(Self::BottomLeft),
            "minwaste" | "mw" => Ok(Self::MinWaste),
            _ => Err(()),
        }
    }
}

/// Guillotine free-rect choice heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GuillotineChoice {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    WorstAreaFit,
    WorstShortSideFit,
    WorstLongSideFit,
}

impl GuillotineChoice {
    fn short_name(&self) -> &'static str {
        match self {
            Self::BestAreaFit => "baf",
            Self::BestShortSideFit => "bssf",
            Self::BestLongSideFit => "blsf",
            Self::WorstAreaFit => "waf",
            Self::WorstShortSideFit => "wssf",
            Self::WorstLongSideFit => "wlsf",
        }
    }
}

impl FromStr for GuillotineChoice {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "waf" | "worstareafit" => Ok(Self::WorstAreaFit),
            "wssf" | "worstshortsidefit" => Ok(Self::WorstShortSideFit),
            "wlsf" | "worstlongsidefit" => Ok(Self::WorstLongSideFit),
            _ => Err(()),
        }
    }
}

/// Guillotine split axis heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GuillotineSplit {
    SplitShorterLeftoverAxis,
    SplitLongerLeftoverAxis,
    SplitMinimizeArea,
    SplitMaximizeArea,
    SplitShorterAxis,
    SplitLongerAxis,
}

impl GuillotineSplit {
    fn short_name(&self) -> &'static str {
        match self {
            Self::SplitShorterLeftoverAxis => "slas",
            Self::SplitLongerLeftoverAxis => "llas",
            Self::SplitMinimizeArea => "minas",
            Self::SplitMaximizeArea => "maxas",
            Self::SplitShorterAxis => "sas",
            Self::SplitLongerAxis => "las",
        }
    }
}

impl FromStr for GuillotineSplit {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slas" | "splitshorterleftoveraxis" => Ok(Self::SplitShorterLeftoverAxis),
            "llas" | "splitlongerleftoveraxis" => Ok(Self::SplitLongerLeftoverAxis),
            "minas" | "splitminimizearea" => Ok(Self::SplitMinimizeArea),
            "maxas" | "splitmaximizearea" => Ok(Self::SplitMaximizeArea),
            "sas" | "splitshorteraxis" => Ok(Self::SplitShorterAxis),
            "las" | "splitlongeraxis" => Ok(Self::SplitLongerAxis),
            _ => Err(()),
        }
    }
}

/// Shelf selection heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShelfHeuristic {
    /// Only the newest shelf is considered.
    NextFit,
    /// First shelf (top to bottom) with room.
    FirstFit,
    /// Shelf whose height leaves the least vertical slack.
    BestHeightFit,
    /// Shelf whose remaining width is smallest after placement.
    BestWidthFit,
}

impl ShelfHeuristic {
    pub const ALL: [ShelfHeuristic; 4] = [
        Self::NextFit,
        Self::FirstFit,
        Self::BestHeightFit,
        Self::BestWidthFit,
    ];

    fn short_name(&self) -> &'static str {
        match self {
            Self::NextFit => "nf",
            Self::FirstFit => "ff",
            Self::BestHeightFit => "bhf",
            Self::BestWidthFit => "bwf",
        }
    }
}

impl FromStr for ShelfHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nf" | "nextfit" => Ok(Self::NextFit),
            "ff" | "firstfit" => Ok(Self::FirstFit),
            "bhf" | "bestheightfit" => Ok(Self::BestHeightFit),
            "bwf" | "bestwidthfit" => Ok(Self::BestWidthFit),
            _ => Err(()),
        }
    }
}

/// Heuristic selection. `Auto` expands to every heuristic of the chosen family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    Auto,
    MaxRects(MaxRectsHeuristic),
    Skyline(SkylineHeuristic),
    Guillotine(GuillotineChoice, GuillotineSplit),
    Shelf(ShelfHeuristic),
}

impl Heuristic {
    /// True if this heuristic can drive `packer`.
    pub fn applies_to(&self, packer: PackerKind) -> bool {
        match self {
            Heuristic::Auto => true,
            Heuristic::MaxRects(_) => matches!(packer, PackerKind::MaxRects | PackerKind::Automatic),
            Heuristic::Skyline(_) => matches!(packer, PackerKind::Skyline | PackerKind::Automatic),
            Heuristic::Guillotine(..) => {
                matches!(packer, PackerKind::Guillotine | PackerKind::Automatic)
            }
            Heuristic::Shelf(_) => matches!(
                packer,
                PackerKind::Shelf | PackerKind::ShelfFfdh | PackerKind::Automatic
            ),
        }
    }

    /// Parses a heuristic name in the context of a packer family.
    /// Guillotine takes `choice[:split]`, e.g. `baf:slas`.
    pub fn parse(packer: PackerKind, s: &str) -> Option<Heuristic> {
        if s.eq_ignore_ascii_case("auto") {
            return Some(Heuristic::Auto);
        }
        match packer {
            PackerKind::MaxRects => s.parse().ok().map(Heuristic::MaxRects),
            PackerKind::Skyline => s.parse().ok().map(Heuristic::Skyline),
            PackerKind::Shelf | PackerKind::ShelfFfdh => s.parse().ok().map(Heuristic::Shelf),
            PackerKind::Guillotine => {
                let (choice, split) = match s.split_once(':') {
                    Some((c, sp)) => (c.parse().ok()?, sp.parse().ok()?),
                    None => (s.parse().ok()?, GuillotineSplit::SplitShorterLeftoverAxis),
                };
                Some(Heuristic::Guillotine(choice, split))
            }
            PackerKind::SimpleRow | PackerKind::Automatic => None,
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heuristic::Auto => f.write_str("auto"),
            Heuristic::MaxRects(h) => f.write_str(h.short_name()),
            Heuristic::Skyline(SkylineHeuristic::BottomLeft) => f.write_str("bl"),
            Heuristic::Skyline(SkylineHeuristic::MinWaste) => f.write_str("mw"),
            Heuristic::Guillotine(c, s) => write!(f, "{}:{}", c.short_name(), s.short_name()),
            Heuristic::Shelf(h) => f.write_str(h.short_name()),
        }
    }
}

/// Canvas size search policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Grow from the area lower bound until something fits (up to `max_canvas_size`).
    Automatic,
    /// Grow within `[min, max]`; overflow at `max` opens additional canvases.
    MinMax { min: (u32, u32), max: (u32, u32) },
    /// Exactly one canvas of the given size; overflow is reported, not retried.
    Manual { width: u32, height: u32 },
}

impl FromStr for SizingPolicy {
    type Err = ();
    /// Accepts `auto`, `manual:WxH`, `minmax:WxH-WxH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower == "auto" || lower == "automatic" {
            return Ok(Self::Automatic);
        }
        if let Some(rest) = lower.strip_prefix("manual:") {
            let (width, height) = parse_size(rest).ok_or(())?;
            return Ok(Self::Manual { width, height });
        }
        if let Some(rest) = lower.strip_prefix("minmax:") {
            let (a, b) = rest.split_once('-').ok_or(())?;
            return Ok(Self::MinMax {
                min: parse_size(a).ok_or(())?,
                max: parse_size(b).ok_or(())?,
            });
        }
        Err(())
    }
}

/// Parses `WxH` (or a single `N` meaning `NxN`).
pub fn parse_size(s: &str) -> Option<(u32, u32)> {
    match s.split_once(['x', 'X']) {
        Some((w, h)) => Some((w.trim().parse().ok()?, h.trim().parse().ok()?)),
        None => {
            let n = s.trim().parse().ok()?;
            Some((n, n))
        }
    }
}

/// Presort applied before greedy placement (MaxRects, Guillotine, Skyline).
/// Sorting is stable, so input order breaks ties.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    AreaDesc,
    MaxSideDesc,
    HeightDesc,
    WidthDesc,
    None,
}

impl FromStr for SortOrder {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "area_desc" => Ok(Self::AreaDesc),
            "max_side_desc" => Ok(Self::MaxSideDesc),
            "height_desc" => Ok(Self::HeightDesc),
            "width_desc" => Ok(Self::WidthDesc),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Hard ceiling used by `Automatic` sizing when nothing else is configured.
pub const DEFAULT_MAX_CANVAS_SIZE: u32 = 8192;

/// Packing engine configuration.
/// Key notes:
///   - `packer` selects one algorithm family or `Automatic` (every family, best fill ratio wins)
///   - `heuristic` pins a family-specific heuristic; `Auto` tries every published heuristic of the family
///   - `sizing` drives the search over candidate canvas sizes
///   - `parallel` lets `Automatic` evaluate candidates concurrently when the `parallel` feature is on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasConfig {
    #[serde(default = "default_packer")]
    pub packer: PackerKind,
    #[serde(default = "default_heuristic")]
    pub heuristic: Heuristic,
    #[serde(default = "default_sizing")]
    pub sizing: SizingPolicy,
    /// Round every candidate canvas size up to a power of two.
    #[serde(default)]
    pub use_power_of_two: bool,
    /// Force square candidate canvases.
    #[serde(default)]
    pub square: bool,
    /// Pixels reserved on every side of each sprite.
    #[serde(default = "default_padding")]
    pub padding_px: u32,
    /// Allow 90° rotations for placements where beneficial.
    #[serde(default = "default_true")]
    pub allow_rotation: bool,
    /// Store mirrored/identical sprites once and reference them by flip flags.
    #[serde(default)]
    pub detect_flips: bool,
    /// Trim transparent borders (alpha <= trim_threshold).
    #[serde(default = "default_true")]
    pub trim: bool,
    #[serde(default)]
    pub trim_threshold: u8,
    #[serde(default = "default_sort_order")]
    pub sort_order: SortOrder,
    /// Largest side `Automatic` sizing may reach before giving up.
    #[serde(default = "default_max_canvas_size")]
    pub max_canvas_size: u32,
    /// Evaluate `Automatic` candidates in parallel when feature "parallel" is on.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            packer: default_packer(),
            heuristic: default_heuristic(),
            sizing: default_sizing(),
            use_power_of_two: false,
            square: false,
            padding_px: default_padding(),
            allow_rotation: true,
            detect_flips: false,
            trim: true,
            trim_threshold: 0,
            sort_order: default_sort_order(),
            max_canvas_size: default_max_canvas_size(),
            parallel: false,
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - A manual or min/max size is zero, inverted, or above `max_canvas_size`
    /// - A min/max range holds no power of two (with `use_power_of_two`) or no square size
    ///   (with `square`)
    /// - The heuristic belongs to a different family than `packer`
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.max_canvas_size == 0 {
            return Err(AtlasError::InvalidConfig(
                "max_canvas_size must be greater than zero".into(),
            ));
        }
        let ceiling = self.max_canvas_size;
        match self.sizing {
            SizingPolicy::Automatic => {}
            SizingPolicy::Manual { width, height } => {
                if width == 0 || height == 0 {
                    return Err(AtlasError::InvalidDimensions { width, height });
                }
                if width > ceiling || height > ceiling {
                    return Err(AtlasError::InvalidConfig(format!(
                        "manual size {width}x{height} exceeds max_canvas_size {ceiling}"
                    )));
                }
            }
            SizingPolicy::MinMax { min, max } => {
                if max.0 == 0 || max.1 == 0 {
                    return Err(AtlasError::InvalidDimensions {
                        width: max.0,
                        height: max.1,
                    });
                }
                if min.0 > max.0 || min.1 > max.1 {
                    return Err(AtlasError::InvalidConfig(format!(
                        "min size {}x{} is larger than max size {}x{}",
                        min.0, min.1, max.0, max.1
                    )));
                }
                if max.0 > ceiling || max.1 > ceiling {
                    return Err(AtlasError::InvalidConfig(format!(
                        "max size {}x{} exceeds max_canvas_size {ceiling}",
                        max.0, max.1
                    )));
                }
                // every candidate must be able to honour both bounds after rounding
                let axes = if self.square {
                    let lo = min.0.max(min.1);
                    let hi = max.0.min(max.1);
                    [(lo, hi), (lo, hi)]
                } else {
                    [(min.0, max.0), (min.1, max.1)]
                };
                for (lo, hi) in axes {
                    if lo > hi {
                        return Err(AtlasError::InvalidConfig(format!(
                            "square canvases cannot satisfy min {}x{} and max {}x{}",
                            min.0, min.1, max.0, max.1
                        )));
                    }
                    if self.use_power_of_two && next_pow2(lo) > hi {
                        return Err(AtlasError::InvalidConfig(format!(
                            "no power of two lies between {lo} and {hi}"
                        )));
                    }
                }
            }
        }
        if !self.heuristic.applies_to(self.packer) {
            return Err(AtlasError::InvalidConfig(format!(
                "heuristic {} does not apply to packer {}",
                self.heuristic, self.packer
            )));
        }
        Ok(())
    }
}

fn default_packer() -> PackerKind {
    PackerKind::Automatic
}
fn default_heuristic() -> Heuristic {
    Heuristic::Auto
}
fn default_sizing() -> SizingPolicy {
    SizingPolicy::Automatic
}
fn default_padding() -> u32 {
    2
}
fn default_true() -> bool {
    true
}
fn default_sort_order() -> SortOrder {
    SortOrder::AreaDesc
}
fn default_max_canvas_size() -> u32 {
    DEFAULT_MAX_CANVAS_SIZE
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn packer(mut self, v: PackerKind) -> Self {
        self.cfg.packer = v;
        self
    }
    pub fn heuristic(mut self, v: Heuristic) -> Self {
        self.cfg.heuristic = v;
        self
    }
    pub fn sizing(mut self, v: SizingPolicy) -> Self {
        self.cfg.sizing = v;
        self
    }
    pub fn manual_size(mut self, width: u32, height: u32) -> Self {
        self.cfg.sizing = SizingPolicy::Manual { width, height };
        self
    }
    pub fn min_max(mut self, min: (u32, u32), max: (u32, u32)) -> Self {
        self.cfg.sizing = SizingPolicy::MinMax { min, max };
        self
    }
    pub fn pow2(mut self, v: bool) -> Self {
        self.cfg.use_power_of_two = v;
        self
    }
    pub fn square(mut self, v: bool) -> Self {
        self.cfg.square = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding_px = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn detect_flips(mut self, v: bool) -> Self {
        self.cfg.detect_flips = v;
        self
    }
    pub fn trim(mut self, v: bool) -> Self {
        self.cfg.trim = v;
        self
    }
    pub fn trim_threshold(mut self, v: u8) -> Self {
        self.cfg.trim_threshold = v;
        self
    }
    pub fn sort_order(mut self, v: SortOrder) -> Self {
        self.cfg.sort_order = v;
        self
    }
    pub fn max_canvas_size(mut self, v: u32) -> Self {
        self.cfg.max_canvas_size = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

impl AtlasConfig {
    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}
