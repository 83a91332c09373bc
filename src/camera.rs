//! Camera feed seam and the synthetic stub feed.
//!
//! The host engine's camera subsystem is reduced to two traits:
//! - `CameraFeed`: "acquire the latest CPU-readable frame", which may fail
//!   when no frame is currently available.
//! - `CpuFrame`: an acquired frame handle exposing metadata and a single
//!   convert-to-RGBA operation. The handle owns whatever native resources
//!   back the frame; implementations release them in `Drop`, which is what
//!   gives the release-exactly-once guarantee on every exit path.
//!
//! `StubCameraFeed` produces synthetic frames so the binaries and tests run
//! without hardware.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::CaptureError;
use crate::frame::BYTES_PER_PIXEL;

/// Orientation transform applied during conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transformation {
    None,
    /// Horizontal mirror. The default, matching front-camera display.
    #[default]
    MirrorX,
    MirrorY,
    MirrorXY,
}

impl Transformation {
    /// (mirror_x, mirror_y)
    pub(crate) fn mirrors(self) -> (bool, bool) {
        match self {
            Transformation::None => (false, false),
            Transformation::MirrorX => (true, false),
            Transformation::MirrorY => (false, true),
            Transformation::MirrorXY => (true, true),
        }
    }
}

impl FromStr for Transformation {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Transformation::None),
            "mirror-x" => Ok(Transformation::MirrorX),
            "mirror-y" => Ok(Transformation::MirrorY),
            "mirror-xy" => Ok(Transformation::MirrorXY),
            other => Err(anyhow!(
                "unknown transform '{}' (expected none, mirror-x, mirror-y, or mirror-xy)",
                other
            )),
        }
    }
}

/// Pixel layout of a frame as delivered by the camera, before conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    /// Planar YUV 4:2:0 (three planes).
    Yuv420Planar,
    /// Y plane plus interleaved UV plane.
    Nv12,
    /// Single 8-bit luminance plane. What the stub feed produces.
    Gray8,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Yuv420Planar => "yuv420-planar",
            SourceFormat::Nv12 => "nv12",
            SourceFormat::Gray8 => "gray8",
        };
        f.write_str(name)
    }
}

/// Metadata of an acquired frame, read before conversion for display.
#[derive(Clone, Copy, Debug)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub plane_count: u32,
    /// Capture timestamp in seconds.
    pub timestamp: f64,
    pub format: SourceFormat,
}

/// An acquired CPU-readable frame.
///
/// Conversion writes RGBA8 into the caller's buffer, whose length must equal
/// `width * height * 4`. Dropping the handle releases the underlying frame
/// resources exactly once, whether or not conversion succeeded.
pub trait CpuFrame {
    fn info(&self) -> FrameInfo;

    fn convert(
        &mut self,
        transform: Transformation,
        dest: &mut [u8],
    ) -> Result<(), CaptureError>;
}

/// The camera subsystem, reduced to "try to hand me the latest frame".
pub trait CameraFeed {
    /// Returns `None` when no CPU-readable frame is available right now.
    fn try_acquire_latest(&mut self) -> Option<Box<dyn CpuFrame>>;
}

// ----------------------------------------------------------------------------
// Stub feed: synthetic frames for binaries and tests
// ----------------------------------------------------------------------------

/// Configuration for the synthetic camera feed.
#[derive(Clone, Debug)]
pub struct StubFeedConfig {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; only used to derive timestamps.
    pub target_fps: u32,
    /// Number of initial acquisitions that report "no frame available",
    /// modelling camera warm-up.
    pub warmup_frames: u32,
}

impl Default for StubFeedConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            target_fps: 30,
            warmup_frames: 3,
        }
    }
}

/// Statistics for a stub feed.
#[derive(Clone, Debug)]
pub struct FeedStats {
    pub acquisitions: u64,
    pub frames_delivered: u64,
}

/// Synthetic camera feed. Produces single-plane gray frames whose content
/// drifts over time, with a new scene every 50 frames.
pub struct StubCameraFeed {
    config: StubFeedConfig,
    acquisitions: u64,
    frames_delivered: u64,
    scene: u8,
    rng: StdRng,
}

impl StubCameraFeed {
    pub fn new(config: StubFeedConfig) -> Self {
        Self {
            config,
            acquisitions: 0,
            frames_delivered: 0,
            scene: 0,
            rng: StdRng::seed_from_u64(0x0a7c_a21d),
        }
    }

    pub fn stats(&self) -> FeedStats {
        FeedStats {
            acquisitions: self.acquisitions,
            frames_delivered: self.frames_delivered,
        }
    }

    pub fn is_healthy(&self) -> bool {
        true
    }

    fn generate_luma(&mut self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let mut luma = vec![0u8; width * height];
        let drift = self.frames_delivered + self.scene as u64 * 31;
        for (i, value) in luma.iter_mut().enumerate() {
            let base = ((i % width) + (i / width) + drift as usize) % 256;
            let noise: u8 = self.rng.gen_range(0..8);
            *value = (base as u8).wrapping_add(noise);
        }
        luma
    }
}

impl CameraFeed for StubCameraFeed {
    fn try_acquire_latest(&mut self) -> Option<Box<dyn CpuFrame>> {
        self.acquisitions += 1;
        if self.acquisitions <= self.config.warmup_frames as u64 {
            return None;
        }
        self.frames_delivered += 1;
        if self.frames_delivered % 50 == 0 {
            self.scene = self.scene.wrapping_add(1);
        }
        let timestamp = self.frames_delivered as f64 / self.config.target_fps.max(1) as f64;
        let luma = self.generate_luma();
        Some(Box::new(StubCpuFrame {
            width: self.config.width,
            height: self.config.height,
            timestamp,
            luma,
        }))
    }
}

struct StubCpuFrame {
    width: u32,
    height: u32,
    timestamp: f64,
    luma: Vec<u8>,
}

impl CpuFrame for StubCpuFrame {
    fn info(&self) -> FrameInfo {
        FrameInfo {
            width: self.width,
            height: self.height,
            plane_count: 1,
            timestamp: self.timestamp,
            format: SourceFormat::Gray8,
        }
    }

    fn convert(
        &mut self,
        transform: Transformation,
        dest: &mut [u8],
    ) -> Result<(), CaptureError> {
        let width = self.width as usize;
        let height = self.height as usize;
        let expected = width * height * BYTES_PER_PIXEL;
        if dest.len() != expected {
            return Err(CaptureError::conversion(format!(
                "destination buffer is {} bytes, expected {}",
                dest.len(),
                expected
            )));
        }

        let (mirror_x, mirror_y) = transform.mirrors();
        for y in 0..height {
            let src_y = if mirror_y { height - 1 - y } else { y };
            for x in 0..width {
                let src_x = if mirror_x { width - 1 - x } else { x };
                let value = self.luma[src_y * width + src_x];
                let offset = (y * width + x) * BYTES_PER_PIXEL;
                dest[offset] = value;
                dest[offset + 1] = value;
                dest[offset + 2] = value;
                dest[offset + 3] = 0xff;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_from(luma: Vec<u8>, width: u32, height: u32) -> StubCpuFrame {
        StubCpuFrame {
            width,
            height,
            timestamp: 0.0,
            luma,
        }
    }

    #[test]
    fn warmup_acquisitions_report_no_frame() {
        let mut feed = StubCameraFeed::new(StubFeedConfig {
            width: 8,
            height: 8,
            target_fps: 30,
            warmup_frames: 2,
        });
        assert!(feed.try_acquire_latest().is_none());
        assert!(feed.try_acquire_latest().is_none());
        let frame = feed.try_acquire_latest().expect("frame after warmup");
        assert_eq!(frame.info().width, 8);
        assert_eq!(feed.stats().frames_delivered, 1);
        assert_eq!(feed.stats().acquisitions, 3);
    }

    #[test]
    fn convert_rejects_wrong_buffer_length() {
        let mut frame = frame_from(vec![0; 4], 2, 2);
        let mut dest = vec![0u8; 7];
        let err = frame.convert(Transformation::None, &mut dest).unwrap_err();
        assert!(err.to_string().contains("expected 16"));
    }

    #[test]
    fn mirror_x_flips_rows() {
        // 2x1 frame: left pixel 10, right pixel 200.
        let mut frame = frame_from(vec![10, 200], 2, 1);
        let mut dest = vec![0u8; 2 * BYTES_PER_PIXEL];
        frame.convert(Transformation::MirrorX, &mut dest).unwrap();
        assert_eq!(dest[0], 200);
        assert_eq!(dest[BYTES_PER_PIXEL], 10);
        assert_eq!(dest[3], 0xff);
    }

    #[test]
    fn mirror_y_flips_columns() {
        // 1x2 frame: top pixel 10, bottom pixel 200.
        let mut frame = frame_from(vec![10, 200], 1, 2);
        let mut dest = vec![0u8; 2 * BYTES_PER_PIXEL];
        frame.convert(Transformation::MirrorY, &mut dest).unwrap();
        assert_eq!(dest[0], 200);
        assert_eq!(dest[BYTES_PER_PIXEL], 10);
    }

    #[test]
    fn transform_parses_from_config_strings() {
        assert_eq!(
            "mirror-x".parse::<Transformation>().unwrap(),
            Transformation::MirrorX
        );
        assert_eq!(
            " None ".parse::<Transformation>().unwrap(),
            Transformation::None
        );
        assert!("sideways".parse::<Transformation>().is_err());
    }
}
