//! cascade_watch - Haar-cascade animal detector with on-screen labels

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use wildlife_watch::alert::ConsoleEmitter;
use wildlife_watch::display::open_display;
use wildlife_watch::ingest::open_source;
use wildlife_watch::session::{run_cascade, CascadePipeline, LoopOptions, Shutdown};
use wildlife_watch::{ObjectDetector, WatchConfig};

const WINDOW_TITLE: &str = "Wild Animal Detection";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (TOML, or JSON with a .json extension).
    #[arg(long, env = "WATCH_CONFIG")]
    config: Option<PathBuf>,
    /// Camera device: index, /dev/videoN, image directory or stub://scene.
    #[arg(long)]
    camera: Option<String>,
    /// Cascade model file.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Run without a preview window.
    #[arg(long)]
    headless: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

#[cfg(feature = "vision-opencv")]
fn load_detector(cfg: &WatchConfig) -> Result<Box<dyn ObjectDetector>> {
    let cascade = wildlife_watch::HaarCascade::load(&cfg.cascade)?;
    Ok(Box::new(cascade))
}

#[cfg(not(feature = "vision-opencv"))]
fn load_detector(cfg: &WatchConfig) -> Result<Box<dyn ObjectDetector>> {
    Err(anyhow::anyhow!(
        "cascade model {} cannot be loaded: build with the vision-opencv feature",
        cfg.cascade.model_path.display()
    ))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = WatchConfig::load_from(args.config.as_deref())?;
    if let Some(camera) = args.camera {
        cfg.camera.device = camera;
    }
    if let Some(model) = args.model {
        cfg.cascade.model_path = model;
    }
    if args.headless {
        cfg.display.headless = true;
    }

    // Model first: a bad model path should fail before the camera is touched.
    let detector = load_detector(&cfg).context("failed to load cascade model")?;
    let mut pipeline = CascadePipeline::new(detector);
    let mut source = open_source(&cfg.camera)
        .with_context(|| format!("failed to open camera {}", cfg.camera.device))?;
    let mut display = open_display(&cfg.display, WINDOW_TITLE);
    // Cascade alerts are console-only; bell and sound command belong to motion_watch.
    let mut console = ConsoleEmitter;

    let shutdown = Shutdown::new();
    shutdown.install_ctrlc()?;
    let options =
        LoopOptions::from_display(&cfg.display, shutdown).with_max_frames(args.max_frames);

    log::info!(
        "cascade_watch running on {} with {}",
        cfg.camera.device,
        cfg.cascade.model_path.display()
    );
    println!("Press '{}' to quit", cfg.display.quit_key);

    let summary = run_cascade(
        source.as_mut(),
        display.as_mut(),
        &mut console,
        &mut pipeline,
        &options,
    )?;
    log::info!(
        "cascade_watch stopped: {:?}, frames={} detection_frames={} alerts={}",
        summary.stop,
        summary.frames,
        summary.detection_frames,
        summary.alerts_raised
    );
    Ok(())
}
