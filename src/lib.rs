//! Detoverlay: detection overlays for documents and drawings.
//!
//! Detoverlay takes the output of object detectors, line detectors and OCR
//! engines, normalizes its many geometry encodings into one canonical model,
//! and draws it on top of the source image, either as a raster bitmap or as
//! an interactive SVG document that can be decoded back into items.
//!
//! # Modules
//!
//! - [`ir`]: Canonical item model, geometry normalization and payload readers
//! - [`style`]: Category → color/dash/label resolution
//! - [`layers`]: Layer groups and visibility filtering
//! - [`placement`]: Collision-avoiding label placement
//! - [`plan`]: The backend-independent paint plan
//! - [`render`]: Raster backend, image loading and PNG export
//! - [`svg`]: SVG encoder and decoder
//! - [`hit`]: Point-to-item lookup
//! - [`config`]: YAML/JSON configuration files
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod hit;
pub mod ir;
pub mod layers;
pub mod placement;
pub mod plan;
pub mod render;
pub mod style;
pub mod svg;

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser, Subcommand};

pub use error::OverlayError;

use config::OverlayConfig;
use hit::HitTest;
use ir::{ItemSet, Point};

/// The detoverlay CLI application.
#[derive(Parser)]
#[command(name = "detoverlay")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Draw detections over an image and write a PNG.
    Render(RenderArgs),
    /// Encode detections as an SVG overlay.
    Svg(SvgArgs),
    /// Decode an SVG overlay back into item JSON.
    Decode(DecodeArgs),
    /// Report which detection sits at a point of an SVG overlay.
    Hit(HitArgs),
}

/// Where items come from and how they are styled.
#[derive(clap::Args)]
#[command(group(ArgGroup::new("source").required(true).args(["detections", "items"])))]
struct InputArgs {
    /// Detection payload JSON (bare array or {detections, lines, texts}).
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Canonical item JSON, as written by `detoverlay decode`.
    #[arg(long)]
    items: Option<PathBuf>,

    /// Style/layer/render config (.yaml, .yml or .json).
    #[arg(long, env = "DETOVERLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Layer group to hide (repeatable).
    #[arg(long = "hide", value_name = "GROUP")]
    hide: Vec<String>,

    /// Do not draw label captions.
    #[arg(long)]
    no_labels: bool,

    /// Append confidence percentages to captions.
    #[arg(long)]
    confidence: bool,
}

/// Arguments for the render subcommand.
#[derive(clap::Args)]
struct RenderArgs {
    /// Source image.
    #[arg(long)]
    image: PathBuf,

    #[command(flatten)]
    input: InputArgs,

    /// Output PNG path.
    #[arg(short, long)]
    output: PathBuf,

    /// Font for label text (defaults to the system sans-serif face).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Also print the result as a PNG data URL on stdout.
    #[arg(long)]
    data_url: bool,
}

/// Arguments for the svg subcommand.
#[derive(clap::Args)]
#[command(group(ArgGroup::new("size").required(true).args(["image", "width"])))]
struct SvgArgs {
    /// Source image; its dimensions size the overlay.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Overlay width when no image is given.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Overlay height when no image is given.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    #[command(flatten)]
    input: InputArgs,

    /// Output path (stdout when omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit tooltips and focusable items.
    #[arg(long)]
    interactive: bool,

    /// Wrap the markup in a JSON envelope.
    #[arg(long)]
    envelope: bool,

    /// Embed the source image as a background data URL.
    #[arg(long, requires = "image")]
    embed_image: bool,
}

/// Arguments for the decode subcommand.
#[derive(clap::Args)]
struct DecodeArgs {
    /// SVG overlay to decode.
    input: PathBuf,

    /// Output item JSON path (stdout when omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the hit subcommand.
#[derive(clap::Args)]
struct HitArgs {
    /// SVG overlay to query.
    input: PathBuf,

    #[arg(long, allow_negative_numbers = true)]
    x: f64,

    #[arg(long, allow_negative_numbers = true)]
    y: f64,
}

/// Run the detoverlay CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), OverlayError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Render(args)) => run_render(args),
        Some(Commands::Svg(args)) => run_svg(args),
        Some(Commands::Decode(args)) => run_decode(args),
        Some(Commands::Hit(args)) => run_hit(args),
        None => {
            println!("detoverlay {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Detection overlays as PNG or SVG.");
            println!();
            println!("Run 'detoverlay --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the render subcommand.
fn run_render(args: RenderArgs) -> Result<(), OverlayError> {
    // Decode first: a missing image aborts before anything is drawn.
    let image = render::load_image(&args.image)?;
    let config = effective_config(&args.input)?;
    let items = load_items(&args.input, image.width(), image.height())?;

    let font = if config.render.show_labels {
        render::load_font(args.font.as_deref())?
    } else {
        None
    };
    let mut canvas = render::RasterCanvas::new(font);
    let plan = render::render(
        &mut canvas,
        &image,
        &items,
        &config.style_table(),
        &config.visibility(),
        &config.render,
    );

    let output = canvas.into_image();
    render::write_png(&args.output, &output)?;
    log::info!(
        "rendered {} items onto {}x{} image -> {}",
        plan.item_count(),
        plan.width,
        plan.height,
        args.output.display()
    );

    if args.data_url {
        println!("{}", render::to_png_data_url(&output)?);
    }
    Ok(())
}

/// Execute the svg subcommand.
fn run_svg(args: SvgArgs) -> Result<(), OverlayError> {
    let (width, height) = match (&args.image, args.width, args.height) {
        (Some(path), _, _) => image_dimensions(path)?,
        (None, Some(width), Some(height)) => (width, height),
        _ => {
            return Err(OverlayError::UnsupportedFormat(
                "svg needs --image or both --width and --height".to_string(),
            ))
        }
    };

    let config = effective_config(&args.input)?;
    let items = load_items(&args.input, width, height)?;

    let mut options = svg::SvgOptions::new(width, height)
        .with_interactive(args.interactive)
        .with_render(config.render.clone());
    if args.embed_image {
        if let Some(path) = &args.image {
            let image = render::load_image(path)?;
            options = options.with_background(render::to_png_data_url(&image)?);
        }
    }

    let styles = config.style_table();
    let visibility = config.visibility();
    let text = if args.envelope {
        let envelope = svg::encode_envelope(&items, &styles, &visibility, &options);
        serde_json::to_string_pretty(&envelope).map_err(|source| OverlayError::ItemJsonWrite {
            path: args.output.clone().unwrap_or_else(|| PathBuf::from("<stdout>")),
            source,
        })?
    } else {
        svg::encode_items(&items, &styles, &visibility, &options)
    };

    write_output(args.output.as_deref(), &text)
}

/// Execute the decode subcommand.
fn run_decode(args: DecodeArgs) -> Result<(), OverlayError> {
    let markup = std::fs::read_to_string(&args.input)?;
    let items = svg::decode_items(&markup);
    log::info!(
        "decoded {} items from {}",
        items.len(),
        args.input.display()
    );

    match &args.output {
        Some(path) => ir::io_json::write_items_json(path, &items),
        None => {
            let json = ir::io_json::to_json_string(&items).map_err(|source| {
                OverlayError::ItemJsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{json}");
            Ok(())
        }
    }
}

/// Execute the hit subcommand.
fn run_hit(args: HitArgs) -> Result<(), OverlayError> {
    let markup = std::fs::read_to_string(&args.input)?;
    let detections = svg::decode(&markup);

    match detections.as_slice().hit(&Point::new(args.x, args.y)) {
        Some(id) => println!("{id}"),
        None => println!("none"),
    }
    Ok(())
}

fn effective_config(input: &InputArgs) -> Result<OverlayConfig, OverlayError> {
    let mut config = config::load_config(input.config.as_deref())?;
    if input.no_labels {
        config.render.show_labels = false;
    }
    if input.confidence {
        config.render.show_confidence = true;
    }
    config.layers.hidden.extend(input.hide.iter().cloned());
    Ok(config)
}

fn load_items(input: &InputArgs, width: u32, height: u32) -> Result<ItemSet, OverlayError> {
    let items = match (&input.detections, &input.items) {
        (Some(path), _) => ir::io_payload::read_payload(path, width, height)?,
        (None, Some(path)) => ir::io_json::read_items_json(path)?,
        (None, None) => ItemSet::default(),
    };
    log::info!(
        "loaded {} detections, {} lines, {} texts",
        items.detections.len(),
        items.lines.len(),
        items.texts.len()
    );
    Ok(items)
}

/// Reads image dimensions from the header without decoding pixels.
fn image_dimensions(path: &Path) -> Result<(u32, u32), OverlayError> {
    let size = imagesize::size(path).map_err(|err| OverlayError::ImageLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let width = u32::try_from(size.width).map_err(|_| OverlayError::ImageLoad {
        path: path.to_path_buf(),
        message: format!("width {} out of range", size.width),
    })?;
    let height = u32::try_from(size.height).map_err(|_| OverlayError::ImageLoad {
        path: path.to_path_buf(),
        message: format!("height {} out of range", size.height),
    })?;
    Ok((width, height))
}

fn write_output(path: Option<&Path>, text: &str) -> Result<(), OverlayError> {
    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            log::info!("wrote {}", path.display());
            Ok(())
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
