use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CAMERA_DEVICE: &str = "0";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_ADAPT_RATE: f32 = 0.01;
const DEFAULT_BLUR_KERNEL: u32 = 21;
const DEFAULT_DIFF_THRESHOLD: u8 = 25;
const DEFAULT_DILATE_ITERATIONS: u32 = 2;
const DEFAULT_MIN_AREA: u64 = 1000;
const DEFAULT_CASCADE_MODEL: &str = "/usr/share/opencv4/haarcascades/haarcascade_fullbody.xml";
const DEFAULT_SCALE_FACTOR: f64 = 1.1;
const DEFAULT_MIN_NEIGHBORS: i32 = 3;
const DEFAULT_ALERT_QUEUE_DEPTH: usize = 8;
const DEFAULT_QUIT_KEY: char = 'q';

#[derive(Debug, Deserialize, Default)]
struct WatchConfigFile {
    camera: Option<CameraConfigFile>,
    motion: Option<MotionConfigFile>,
    cascade: Option<CascadeConfigFile>,
    alert: Option<AlertConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    adapt_rate: Option<f32>,
    blur_kernel: Option<u32>,
    diff_threshold: Option<u8>,
    dilate_iterations: Option<u32>,
    min_area: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CascadeConfigFile {
    model_path: Option<PathBuf>,
    scale_factor: Option<f64>,
    min_neighbors: Option<i32>,
    min_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    bell: Option<bool>,
    sound_command: Option<Vec<String>>,
    queue_depth: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    headless: Option<bool>,
    window_title: Option<String>,
    quit_key: Option<char>,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub camera: CameraSettings,
    pub motion: MotionSettings,
    pub cascade: CascadeSettings,
    pub alert: AlertSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    /// `stub://<scene>`, an image directory, `/dev/videoN`, or a numeric camera index.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionSettings {
    /// Background blend weight per frame, in (0, 1).
    pub adapt_rate: f32,
    /// Odd Gaussian kernel size applied before differencing.
    pub blur_kernel: u32,
    /// Per-pixel difference above which a pixel counts as changed.
    pub diff_threshold: u8,
    pub dilate_iterations: u32,
    /// Regions must have strictly more pixels than this.
    pub min_area: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeSettings {
    pub model_path: PathBuf,
    pub scale_factor: f64,
    pub min_neighbors: i32,
    /// Smallest object edge in pixels; 0 lets the classifier decide.
    pub min_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    pub bell: bool,
    /// Program and arguments run on each alert, e.g. `["aplay", "alarm.wav"]`.
    pub sound_command: Option<Vec<String>>,
    pub queue_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub headless: bool,
    /// Window title; `None` lets each pipeline pick its own.
    pub window_title: Option<String>,
    pub quit_key: char,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_CAMERA_DEVICE.to_string(),
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            target_fps: DEFAULT_CAMERA_FPS,
        }
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            adapt_rate: DEFAULT_ADAPT_RATE,
            blur_kernel: DEFAULT_BLUR_KERNEL,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_CASCADE_MODEL),
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: 0,
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            bell: true,
            sound_command: None,
            queue_depth: DEFAULT_ALERT_QUEUE_DEPTH,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            headless: false,
            window_title: None,
            quit_key: DEFAULT_QUIT_KEY,
        }
    }
}

impl MotionSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.adapt_rate > 0.0 && self.adapt_rate < 1.0) {
            return Err(anyhow!(
                "motion.adapt_rate must be in (0, 1), got {}",
                self.adapt_rate
            ));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(anyhow!(
                "motion.blur_kernel must be a positive odd number, got {}",
                self.blur_kernel
            ));
        }
        Ok(())
    }
}

impl CascadeSettings {
    pub fn validate(&self) -> Result<()> {
        if self.scale_factor <= 1.0 {
            return Err(anyhow!(
                "cascade.scale_factor must be greater than 1.0, got {}",
                self.scale_factor
            ));
        }
        if self.min_neighbors < 0 {
            return Err(anyhow!("cascade.min_neighbors must not be negative"));
        }
        Ok(())
    }
}

impl WatchConfig {
    /// Load from `WATCH_CONFIG` (if set), then apply `WATCH_*` env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WATCH_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => WatchConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let camera_defaults = CameraSettings::default();
        let camera = file.camera.unwrap_or_default();
        let camera = CameraSettings {
            device: camera.device.unwrap_or(camera_defaults.device),
            width: camera.width.unwrap_or(camera_defaults.width),
            height: camera.height.unwrap_or(camera_defaults.height),
            target_fps: camera.target_fps.unwrap_or(camera_defaults.target_fps),
        };

        let motion_defaults = MotionSettings::default();
        let motion = file.motion.unwrap_or_default();
        let motion = MotionSettings {
            adapt_rate: motion.adapt_rate.unwrap_or(motion_defaults.adapt_rate),
            blur_kernel: motion.blur_kernel.unwrap_or(motion_defaults.blur_kernel),
            diff_threshold: motion
                .diff_threshold
                .unwrap_or(motion_defaults.diff_threshold),
            dilate_iterations: motion
                .dilate_iterations
                .unwrap_or(motion_defaults.dilate_iterations),
            min_area: motion.min_area.unwrap_or(motion_defaults.min_area),
        };

        let cascade_defaults = CascadeSettings::default();
        let cascade = file.cascade.unwrap_or_default();
        let cascade = CascadeSettings {
            model_path: cascade.model_path.unwrap_or(cascade_defaults.model_path),
            scale_factor: cascade.scale_factor.unwrap_or(cascade_defaults.scale_factor),
            min_neighbors: cascade
                .min_neighbors
                .unwrap_or(cascade_defaults.min_neighbors),
            min_size: cascade.min_size.unwrap_or(cascade_defaults.min_size),
        };

        let alert_defaults = AlertSettings::default();
        let alert = file.alert.unwrap_or_default();
        let alert = AlertSettings {
            bell: alert.bell.unwrap_or(alert_defaults.bell),
            sound_command: alert.sound_command.or(alert_defaults.sound_command),
            queue_depth: alert.queue_depth.unwrap_or(alert_defaults.queue_depth),
        };

        let display_defaults = DisplaySettings::default();
        let display = file.display.unwrap_or_default();
        let display = DisplaySettings {
            headless: display.headless.unwrap_or(display_defaults.headless),
            window_title: display.window_title.or(display_defaults.window_title),
            quit_key: display.quit_key.unwrap_or(display_defaults.quit_key),
        };

        Self {
            camera,
            motion,
            cascade,
            alert,
            display,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("WATCH_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device.trim().to_string();
            }
        }
        if let Ok(min_area) = std::env::var("WATCH_MIN_AREA") {
            self.motion.min_area = min_area
                .trim()
                .parse()
                .map_err(|_| anyhow!("WATCH_MIN_AREA must be a non-negative integer"))?;
        }
        if let Ok(rate) = std::env::var("WATCH_ADAPT_RATE") {
            self.motion.adapt_rate = rate
                .trim()
                .parse()
                .map_err(|_| anyhow!("WATCH_ADAPT_RATE must be a number"))?;
        }
        if let Ok(path) = std::env::var("WATCH_CASCADE_MODEL") {
            if !path.trim().is_empty() {
                self.cascade.model_path = PathBuf::from(path.trim());
            }
        }
        if let Ok(headless) = std::env::var("WATCH_HEADLESS") {
            self.display.headless = parse_bool(&headless)
                .ok_or_else(|| anyhow!("WATCH_HEADLESS must be true/false/1/0"))?;
        }
        if let Ok(command) = std::env::var("WATCH_SOUND_COMMAND") {
            let parts = split_words(&command);
            self.alert.sound_command = if parts.is_empty() { None } else { Some(parts) };
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.device.trim().is_empty() {
            return Err(anyhow!("camera.device must not be empty"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        self.motion.validate()?;
        self.cascade.validate()?;
        if self.alert.queue_depth == 0 {
            return Err(anyhow!("alert.queue_depth must be at least 1"));
        }
        if let Some(command) = &self.alert.sound_command {
            if command.is_empty() {
                self.alert.sound_command = None;
            }
        }
        if let Some(title) = &self.display.window_title {
            if title.trim().is_empty() {
                return Err(anyhow!("display.window_title must not be empty"));
            }
        }
        self.display.quit_key = self.display.quit_key.to_ascii_lowercase();
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(|word| word.to_string()).collect()
}
