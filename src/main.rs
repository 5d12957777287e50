use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use image::DynamicImage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use facemesh_overlay::face_detection::recorded::RecordedDetections;
use facemesh_overlay::overlay::Primitive;
use facemesh_overlay::pipeline::frame_summary_json;
use facemesh_overlay::raster::save_overlay;
use facemesh_overlay::scaling::Resolution;
use facemesh_overlay::session::SessionEvent;
use facemesh_overlay::{FramePipeline, OverlayConfig};

/// Replays recorded face detections through the overlay pipeline.
#[derive(Parser)]
#[command(name = "facemesh-overlay", version, long_about = None)]
struct Cli {
    /// Recorded detector output, one JSON result per line
    #[arg(short, long)]
    frames: PathBuf,

    /// Width of the surface the overlay is drawn on
    #[arg(long)]
    render_width: Option<f32>,

    /// Height of the surface the overlay is drawn on
    #[arg(long)]
    render_height: Option<f32>,

    /// Overlay configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Still image fed to the detector and used as the capture background
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Where to save the last overlay drawn on top of --image
    #[arg(short, long, default_value = "overlay.png")]
    output: PathBuf,

    /// Write each frame's state and primitives as JSON lines
    #[arg(long)]
    primitives: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => OverlayConfig::default(),
    };

    let image = match &cli.image {
        Some(path) => Some(
            image::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => None,
    };

    let render = render_size(&cli, &config, image.as_ref())?;
    info!(width = render.width, height = render.height, "render surface");

    let mut detector = RecordedDetections::open(&cli.frames)
        .with_context(|| format!("failed to read recording {}", cli.frames.display()))?;
    info!(frames = detector.remaining(), "replaying {}", cli.frames.display());

    let mut primitives_out = match &cli.primitives {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => None,
    };

    let background = image.unwrap_or_else(|| {
        DynamicImage::new_rgba8(render.width.round() as u32, render.height.round() as u32)
    });

    let mut pipeline = FramePipeline::new(&config);
    let mut last_overlay: Vec<Primitive> = Vec::new();
    let mut acquisitions = 0usize;
    let mut skipped = 0usize;

    while !detector.is_exhausted() {
        let output = pipeline.process_image(&mut detector, &background, render);

        if output.scale_error.is_some() {
            skipped += 1;
        }
        if output.event == Some(SessionEvent::FaceAcquired) {
            acquisitions += 1;
            if let Some(readout) = &output.readout {
                info!("\n{readout}");
            }
        }

        if let Some(out) = primitives_out.as_mut() {
            writeln!(out, "{}", frame_summary_json(&output)?)?;
        }

        last_overlay = output.primitives;
    }

    if let Some(mut out) = primitives_out {
        out.flush()?;
    }

    if skipped > 0 {
        warn!(skipped, "frames skipped without a usable scale");
    }
    info!(
        frames = pipeline.session().frames_observed(),
        acquisitions,
        status = pipeline.session().status_text(),
        "replay finished"
    );
    for entry in pipeline.session().log() {
        info!(frame = entry.frame, "{}", entry.message);
    }

    if cli.image.is_some() {
        save_overlay(&background, &last_overlay, &cli.output)
            .with_context(|| format!("failed to save {}", cli.output.display()))?;
        info!("saved overlay to {}", cli.output.display());
    }

    Ok(())
}

// explicit flags win, then the still image, then the detector resolution
fn render_size(
    cli: &Cli,
    config: &OverlayConfig,
    image: Option<&DynamicImage>,
) -> Result<Resolution> {
    let fallback = image
        .map(|img| Resolution::new(img.width() as f32, img.height() as f32))
        .or(config.detector_resolution)
        .context("no render size: pass --render-width/--render-height or --image")?;

    Ok(Resolution::new(
        cli.render_width.unwrap_or(fallback.width),
        cli.render_height.unwrap_or(fallback.height),
    ))
}
