//! Daemon configuration.
//!
//! Loaded from an optional TOML file named by `ARCAM_CONFIG`, then
//! overridden by `ARCAM_*` environment variables, then validated.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::camera::Transformation;

const DEFAULT_FEED_WIDTH: u32 = 640;
const DEFAULT_FEED_HEIGHT: u32 = 480;
const DEFAULT_FEED_FPS: u32 = 30;
const DEFAULT_WARMUP_FRAMES: u32 = 3;
const DEFAULT_CANDIDATE_NAME: &str = "capture";
// ~3 seconds of polls at the default frame rate.
const DEFAULT_JOB_LATENCY: u32 = 90;
const DEFAULT_CAPTURE_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct ArcamConfigFile {
    camera: Option<CameraConfigFile>,
    capture: Option<CaptureConfigFile>,
    library: Option<LibraryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    warmup_frames: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    transform: Option<String>,
    candidate_name: Option<String>,
    interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LibraryConfigFile {
    job_latency: Option<u32>,
    mutable: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ArcamConfig {
    pub camera: CameraSettings,
    pub capture: CaptureSettings,
    pub library: LibrarySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    pub warmup_frames: u32,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub transform: Transformation,
    pub candidate_name: String,
    /// How often the daemon re-arms a capture.
    pub interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LibrarySettings {
    /// Completion polls before a stub add-image job reports done.
    pub job_latency: u32,
    pub mutable: bool,
}

impl ArcamConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ARCAM_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ArcamConfigFile) -> Result<Self> {
        let camera = CameraSettings {
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_FEED_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_FEED_HEIGHT),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_FEED_FPS),
            warmup_frames: file
                .camera
                .and_then(|camera| camera.warmup_frames)
                .unwrap_or(DEFAULT_WARMUP_FRAMES),
        };
        let transform = match file.capture.as_ref().and_then(|c| c.transform.as_deref()) {
            Some(value) => value.parse()?,
            None => Transformation::default(),
        };
        let capture = CaptureSettings {
            transform,
            candidate_name: file
                .capture
                .as_ref()
                .and_then(|capture| capture.candidate_name.clone())
                .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string()),
            interval_secs: file
                .capture
                .and_then(|capture| capture.interval_secs)
                .unwrap_or(DEFAULT_CAPTURE_INTERVAL_SECS),
        };
        let library = LibrarySettings {
            job_latency: file
                .library
                .as_ref()
                .and_then(|library| library.job_latency)
                .unwrap_or(DEFAULT_JOB_LATENCY),
            mutable: file
                .library
                .and_then(|library| library.mutable)
                .unwrap_or(true),
        };
        Ok(Self {
            camera,
            capture,
            library,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(transform) = std::env::var("ARCAM_TRANSFORM") {
            if !transform.trim().is_empty() {
                self.capture.transform = transform.parse()?;
            }
        }
        if let Ok(name) = std::env::var("ARCAM_CANDIDATE_NAME") {
            if !name.trim().is_empty() {
                self.capture.candidate_name = name;
            }
        }
        if let Ok(fps) = std::env::var("ARCAM_FEED_FPS") {
            self.camera.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("ARCAM_FEED_FPS must be an integer frame rate"))?;
        }
        if let Ok(latency) = std::env::var("ARCAM_JOB_LATENCY") {
            self.library.job_latency = latency
                .parse()
                .map_err(|_| anyhow!("ARCAM_JOB_LATENCY must be an integer poll count"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be greater than zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.capture.candidate_name.trim().is_empty() {
            return Err(anyhow!("capture candidate_name must not be empty"));
        }
        if self.capture.interval_secs == 0 {
            return Err(anyhow!("capture interval_secs must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ArcamConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ArcamConfig::from_file(ArcamConfigFile::default()).unwrap();
        assert_eq!(cfg.camera.width, 640);
        assert_eq!(cfg.camera.height, 480);
        assert_eq!(cfg.capture.transform, Transformation::MirrorX);
        assert_eq!(cfg.capture.candidate_name, "capture");
        assert!(cfg.library.mutable);
        cfg.validate().unwrap();
    }

    #[test]
    fn bad_transform_in_file_is_rejected() {
        let file: ArcamConfigFile = toml::from_str(
            r#"
            [capture]
            transform = "diagonal"
            "#,
        )
        .unwrap();
        assert!(ArcamConfig::from_file(file).is_err());
    }

    #[test]
    fn zero_dimensions_fail_validation() {
        let file: ArcamConfigFile = toml::from_str(
            r#"
            [camera]
            width = 0
            "#,
        )
        .unwrap();
        let cfg = ArcamConfig::from_file(file).unwrap();
        assert!(cfg.validate().is_err());
    }
}
