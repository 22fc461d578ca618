use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use atlas_toolbox_core::prelude::*;
use atlas_toolbox_core::{to_json_array, to_json_hash};
use clap::{ArgAction, Args, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::ImageReader;
use serde::Deserialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "atlas-toolbox",
    about = "Pack sprites into texture atlases",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a file or directory of sprites into one atlas
    Pack(PackArgs),
    /// Pack every sub-directory of a folder as an independent atlas
    Batch(BatchArgs),
    /// Time each packer on the same input and print fill ratios
    Bench(BenchArgs),
}

#[derive(Args, Debug, Clone)]
struct EngineArgs {
    /// YAML config file path (overrides engine options given as flags)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Sizing
    /// Sizing policy: auto | manual:WxH | minmax:WxH-WxH
    #[arg(long, default_value = "auto", help_heading = "Sizing")]
    sizing: String,
    /// Round canvas sizes to powers of two
    #[arg(long, default_value_t = false, help_heading = "Sizing")]
    pow2: bool,
    /// Force square canvases
    #[arg(long, default_value_t = false, help_heading = "Sizing")]
    square: bool,
    /// Largest canvas side the automatic search may reach
    #[arg(long, default_value_t = 8192, help_heading = "Sizing")]
    max_canvas_size: u32,

    // Algorithms
    /// Packer: auto | maxrects | skyline | guillotine | shelf | shelf-ffdh | simple-row
    #[arg(long, default_value = "auto", help_heading = "Algorithms")]
    packer: String,
    /// Heuristic of the chosen packer (auto tries all). Guillotine takes choice[:split], e.g. baf:slas
    #[arg(long, default_value = "auto", help_heading = "Algorithms")]
    heuristic: String,
    /// Sort order: area_desc|max_side_desc|height_desc|width_desc|none
    #[arg(long, default_value = "area_desc", help_heading = "Algorithms")]
    sort_order: String,
    /// Evaluate packers in parallel (requires feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Algorithms")]
    parallel: bool,

    // Image Processing
    /// Allow rotation (90deg)
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Image Processing")]
    allow_rotation: bool,
    /// Padding on every side of each sprite
    #[arg(long, default_value_t = 2, help_heading = "Image Processing")]
    padding: u32,
    /// Trim transparent borders
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Image Processing")]
    trim: bool,
    /// Trim alpha threshold (0..=255)
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    trim_threshold: u8,
    /// Store mirrored and duplicate sprites once
    #[arg(long, default_value_t = false, help_heading = "Image Processing")]
    detect_flips: bool,
}

#[derive(Args, Debug, Clone)]
struct PackArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas base name (files will be name.png/.json)
    #[arg(short, long, default_value = "atlas", help_heading = "Input/Output")]
    name: String,
    #[command(flatten)]
    engine: EngineArgs,
    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug, Clone)]
struct BatchArgs {
    /// Directory whose sub-directories are packed one atlas each
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    #[command(flatten)]
    engine: EngineArgs,
    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug, Clone)]
struct ExportArgs {
    /// Metadata format: json-array | json (alias) | json-hash
    #[arg(long, default_value = "json-array", help_heading = "Export")]
    metadata: String,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: pack and report but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Args, Debug, Clone)]
struct BenchArgs {
    /// Input file or directory
    input: PathBuf,
    #[command(flatten)]
    engine: EngineArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Pack(args) => run_pack(args, progress),
        Commands::Batch(args) => run_batch(args, progress),
        Commands::Bench(args) => run_bench(args),
    }
}

fn run_pack(args: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = build_config(&args.engine)?;
    if args.export.print_config {
        return print_config(&cfg, &args.export.print_config_format);
    }

    let paths = gather_paths(&args.input, &args.engine.include, &args.engine.exclude)?;
    let sprites = load_sprites_with_progress(&args.input, &paths, show_progress)?;
    info!(count = sprites.len(), "loaded input sprites");

    let out = AtlasBuilder::new(cfg).build(&sprites)?;
    report(&args.name, &out);
    if !args.export.dry_run {
        write_output(&args.out_dir, &args.name, &out, &args.export.metadata)?;
    }
    Ok(())
}

fn run_batch(args: &BatchArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = build_config(&args.engine)?;
    if args.export.print_config {
        return print_config(&cfg, &args.export.print_config_format);
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(&args.input)
        .with_context(|| format!("read dir {}", args.input.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let mut jobs = Vec::with_capacity(dirs.len());
    for dir in &dirs {
        let name = dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("atlas")
            .to_string();
        let paths = gather_paths(dir, &args.engine.include, &args.engine.exclude)?;
        let sprites = load_sprites_with_progress(dir, &paths, show_progress)?;
        if sprites.is_empty() {
            warn!(job = %name, "no sprites, skipping");
            continue;
        }
        jobs.push(BatchJob {
            name,
            sprites,
            cfg: cfg.clone(),
        });
    }
    info!(jobs = jobs.len(), "running batch");

    let mut failed = 0usize;
    for (name, result) in build_batch(&jobs, &CancelToken::new()) {
        match result {
            Ok(out) => {
                report(&name, &out);
                if !args.export.dry_run {
                    write_output(&args.out_dir, &name, &out, &args.export.metadata)?;
                }
            }
            Err(e) => {
                failed += 1;
                error!(job = %name, error = %e, "job failed");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} batch job(s) failed", jobs.len());
    }
    Ok(())
}

fn run_bench(args: &BenchArgs) -> anyhow::Result<()> {
    let base = build_config(&args.engine)?;
    let paths = gather_paths(&args.input, &args.engine.include, &args.engine.exclude)?;
    let sprites = load_sprites_with_progress(&args.input, &paths, false)?;

    let kinds = std::iter::once(PackerKind::Automatic).chain(PackerKind::REGISTRY_ORDER);
    for packer in kinds {
        let cfg = AtlasConfig {
            packer,
            heuristic: Heuristic::Auto,
            ..base.clone()
        };
        let start = Instant::now();
        match AtlasBuilder::new(cfg).build(&sprites) {
            Ok(out) => {
                let s = out.summary();
                println!(
                    "{:<12} strategy={:<22} canvases={} fill={:.2}% time={}",
                    packer.as_str(),
                    out.result.strategy.to_string(),
                    s.canvas_count,
                    s.total_fill_ratio * 100.0,
                    bench_fmt_dur(start.elapsed())
                );
            }
            Err(e) => println!("{:<12} failed: {e}", packer.as_str()),
        }
    }
    Ok(())
}

fn bench_fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn report(name: &str, out: &AtlasOutput) {
    for w in &out.warnings {
        warn!(atlas = %name, "{w}");
    }
    info!(
        atlas = %name,
        strategy = %out.result.strategy,
        attempts = out.result.attempted_sizes.len(),
        "{}",
        out.summary().summary()
    );
}

fn write_output(out_dir: &Path, name: &str, out: &AtlasOutput, metadata: &str) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create out_dir {}", out_dir.display()))?;
    let json_value = match metadata {
        // Accept "json" as an alias of "json-array"
        "json-array" | "json" => to_json_array(&out.layout()),
        "json-hash" => to_json_hash(&out.layout()),
        other => anyhow::bail!("unknown metadata format: {}", other),
    };

    if out.pages.len() == 1 {
        let png_path = out_dir.join(format!("{}.png", name));
        out.pages[0]
            .rgba
            .save(&png_path)
            .with_context(|| format!("write {}", png_path.display()))?;
        info!(?png_path, "wrote page 0");
    } else {
        for p in &out.pages {
            let png_path = out_dir.join(format!("{}_{}.png", name, p.index));
            p.rgba
                .save(&png_path)
                .with_context(|| format!("write {}", png_path.display()))?;
            info!(?png_path, index = p.index, "wrote page");
        }
    }

    let json_path = out_dir.join(format!("{}.json", name));
    let json = serde_json::to_string_pretty(&json_value)?;
    fs::write(&json_path, json).with_context(|| format!("write {}", json_path.display()))?;
    info!(?json_path, pages = out.pages.len(), "atlas written");
    Ok(())
}

fn print_config(cfg: &AtlasConfig, format: &str) -> anyhow::Result<()> {
    match format {
        "yaml" => println!("{}", serde_yaml::to_string(cfg)?),
        _ => println!("{}", serde_json::to_string_pretty(cfg)?),
    }
    Ok(())
}

/// Flags first, then the YAML file (if any) on top; the result is validated.
fn build_config(args: &EngineArgs) -> anyhow::Result<AtlasConfig> {
    let packer = parse_packer(&args.packer)?;
    let mut cfg = AtlasConfig::builder()
        .packer(packer)
        .heuristic(parse_heuristic(packer, &args.heuristic)?)
        .sizing(parse_sizing(&args.sizing)?)
        .pow2(args.pow2)
        .square(args.square)
        .max_canvas_size(args.max_canvas_size)
        .sort_order(parse_sort_order(&args.sort_order)?)
        .parallel(args.parallel)
        .allow_rotation(args.allow_rotation)
        .padding(args.padding)
        .trim(args.trim)
        .trim_threshold(args.trim_threshold)
        .detect_flips(args.detect_flips)
        .build();

    if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg = y.into_atlas_config(cfg)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn parse_packer(s: &str) -> anyhow::Result<PackerKind> {
    s.parse().map_err(|_| anyhow!("unknown packer: {}", s))
}

fn parse_heuristic(packer: PackerKind, s: &str) -> anyhow::Result<Heuristic> {
    Heuristic::parse(packer, s).ok_or_else(|| anyhow!("unknown heuristic for {}: {}", packer, s))
}

fn parse_sizing(s: &str) -> anyhow::Result<SizingPolicy> {
    s.parse().map_err(|_| {
        anyhow!(
            "unknown sizing policy: {} (expected auto | manual:WxH | minmax:WxH-WxH)",
            s
        )
    })
}

fn parse_sort_order(s: &str) -> anyhow::Result<SortOrder> {
    s.parse().map_err(|_| anyhow!("unknown sort order: {}", s))
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;

    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("bad glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    include.is_some_and(|inc| !inc.is_match(&s))
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

/// Sprite name = path relative to `root` without extension; group = its parent directory.
fn sprite_identity(root: &Path, p: &Path) -> (String, Option<String>) {
    let rel = p.strip_prefix(root).unwrap_or(p);
    let rel = if rel.as_os_str().is_empty() {
        Path::new(p.file_name().unwrap_or_default())
    } else {
        rel
    };
    let name = rel.with_extension("").to_string_lossy().replace('\\', "/");
    let group = rel
        .parent()
        .map(|d| d.to_string_lossy().replace('\\', "/"))
        .filter(|d| !d.is_empty());
    (name, group)
}

fn load_sprites_with_progress(
    root: &Path,
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<Sprite>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match load_image(p) {
            Ok(img) => {
                let (name, group) = sprite_identity(root, p);
                let mut sprite = Sprite::new(name, img);
                sprite.group = group;
                list.push(sprite);
            }
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<image::RgbaImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgba8())
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

/// Engine options accepted from a YAML file. Every field is optional and overrides the flag value.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    packer: Option<String>,
    heuristic: Option<String>,
    sizing: Option<String>,
    power_of_two: Option<bool>,
    square: Option<bool>,
    padding_px: Option<u32>,
    allow_rotation: Option<bool>,
    detect_flips: Option<bool>,
    trim: Option<bool>,
    trim_threshold: Option<u8>,
    sort_order: Option<String>,
    max_canvas_size: Option<u32>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn into_atlas_config(self, mut cfg: AtlasConfig) -> anyhow::Result<AtlasConfig> {
        if let Some(v) = self.packer {
            cfg.packer = parse_packer(&v)?;
        }
        if let Some(v) = self.heuristic {
            cfg.heuristic = parse_heuristic(cfg.packer, &v)?;
        }
        if let Some(v) = self.sizing {
            cfg.sizing = parse_sizing(&v)?;
        }
        if let Some(v) = self.power_of_two {
            cfg.use_power_of_two = v;
        }
        if let Some(v) = self.square {
            cfg.square = v;
        }
        if let Some(v) = self.padding_px {
            cfg.padding_px = v;
        }
        if let Some(v) = self.allow_rotation {
            cfg.allow_rotation = v;
        }
        if let Some(v) = self.detect_flips {
            cfg.detect_flips = v;
        }
        if let Some(v) = self.trim {
            cfg.trim = v;
        }
        if let Some(v) = self.trim_threshold {
            cfg.trim_threshold = v;
        }
        if let Some(v) = self.sort_order {
            cfg.sort_order = parse_sort_order(&v)?;
        }
        if let Some(v) = self.max_canvas_size {
            cfg.max_canvas_size = v;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        Ok(cfg)
    }
}
