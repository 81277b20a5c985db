//! motion_watch - background-subtraction motion detector with a debounced alert

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use wildlife_watch::display::open_display;
use wildlife_watch::ingest::open_source;
use wildlife_watch::session::{run_motion, LoopOptions, Shutdown};
use wildlife_watch::{AlertDispatcher, MotionDetector, WatchConfig};

const WINDOW_TITLE: &str = "Motion Detection";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (TOML, or JSON with a .json extension).
    #[arg(long, env = "WATCH_CONFIG")]
    config: Option<PathBuf>,
    /// Camera device: index, /dev/videoN, image directory or stub://scene.
    #[arg(long)]
    camera: Option<String>,
    /// Run without a preview window.
    #[arg(long)]
    headless: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = WatchConfig::load_from(args.config.as_deref())?;
    if let Some(camera) = args.camera {
        cfg.camera.device = camera;
    }
    if args.headless {
        cfg.display.headless = true;
    }

    let mut detector = MotionDetector::new(cfg.motion.clone())?;
    let mut source = open_source(&cfg.camera)
        .with_context(|| format!("failed to open camera {}", cfg.camera.device))?;
    let mut display = open_display(&cfg.display, WINDOW_TITLE);
    let mut alerts = AlertDispatcher::from_settings(&cfg.alert)?;

    let shutdown = Shutdown::new();
    shutdown.install_ctrlc()?;
    let options =
        LoopOptions::from_display(&cfg.display, shutdown).with_max_frames(args.max_frames);

    log::info!(
        "motion_watch running on {} (min_area={}, adapt_rate={})",
        cfg.camera.device,
        cfg.motion.min_area,
        cfg.motion.adapt_rate
    );
    println!("Press '{}' to quit", cfg.display.quit_key);

    let summary = run_motion(
        source.as_mut(),
        display.as_mut(),
        &alerts,
        &mut detector,
        &options,
    )?;
    let delivery = alerts.shutdown();
    log::info!(
        "motion_watch stopped: {:?}, frames={} detection_frames={} episodes={} alerts dropped={}",
        summary.stop,
        summary.frames,
        summary.detection_frames,
        detector.episodes(),
        delivery.dropped
    );
    Ok(())
}
