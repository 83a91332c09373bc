//! One-shot CPU image capture.
//!
//! `FrameCapture` bridges the camera feed's per-frame notification into a
//! pull-style capture: `request_capture` arms a one-shot flag, and the next
//! frame event that finds a frame available converts it to RGBA8, publishes
//! it to the display sink, and forwards it to the candidate sink.
//!
//! A failed acquisition leaves the flag armed so the request retries on the
//! next frame event instead of being silently dropped. A conversion failure
//! consumes the request: it is fatal to that capture attempt only, and the
//! frame handle is still released on that path.

use std::sync::Arc;

use crate::camera::{CameraFeed, Transformation};
use crate::display::DisplaySink;
use crate::error::CaptureError;
use crate::frame::{CapturedImage, TrackableImage};

/// Receives captured images as registration candidates.
pub trait CandidateSink {
    fn submit(&mut self, image: Arc<dyn TrackableImage>, name: &str, physical_width_m: f32);
}

/// What a single frame event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// No capture was requested.
    Idle,
    /// A capture is armed but no frame was available; still armed.
    NoFrame,
    /// A frame was converted and published.
    Captured,
}

pub struct FrameCapture {
    armed: bool,
    transform: Transformation,
    candidate_name: String,
    /// Single reusable snapshot; replaced in place, no history.
    image: Option<CapturedImage>,
}

impl FrameCapture {
    pub fn new(transform: Transformation, candidate_name: impl Into<String>) -> Self {
        Self {
            armed: false,
            transform,
            candidate_name: candidate_name.into(),
            image: None,
        }
    }

    /// Arm the one-shot capture flag. Idempotent while already armed.
    pub fn request_capture(&mut self) {
        if !self.armed {
            log::debug!("capture requested");
        }
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// The most recent successful capture, if any.
    pub fn latest(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    /// Handle one frame-available notification from the host loop.
    ///
    /// When a candidate sink is given, a successful capture is forwarded to
    /// it with the configured candidate name and the pixel width as the
    /// physical width.
    pub fn handle_frame_event(
        &mut self,
        feed: &mut dyn CameraFeed,
        display: &mut dyn DisplaySink,
        candidates: Option<&mut dyn CandidateSink>,
    ) -> Result<CaptureOutcome, CaptureError> {
        if !self.armed {
            return Ok(CaptureOutcome::Idle);
        }

        let Some(mut frame) = feed.try_acquire_latest() else {
            // No frame ready: keep the request armed and retry next event.
            log::debug!("no CPU frame available, capture stays armed");
            return Ok(CaptureOutcome::NoFrame);
        };

        let info = frame.info();
        display.set_info_text(&format!(
            "image info:\n\twidth: {}\n\theight: {}\n\tplane count: {}\n\ttimestamp: {:.3}\n\tformat: {}",
            info.width, info.height, info.plane_count, info.timestamp, info.format
        ));

        let image = self
            .image
            .get_or_insert_with(|| CapturedImage::new(info.width, info.height, info.timestamp));
        image.prepare(info.width, info.height, info.timestamp);

        // The attempt consumes the request whether or not conversion works.
        self.armed = false;

        let converted = frame.convert(self.transform, image.pixels_mut());
        // Release the frame handle before acting on the conversion result.
        drop(frame);
        converted?;

        display.publish_image(image);
        log::info!(
            "captured {}x{} frame at t={:.3}s",
            info.width,
            info.height,
            info.timestamp
        );

        if let Some(sink) = candidates {
            let shared: Arc<dyn TrackableImage> = Arc::new(image.clone());
            sink.submit(shared, &self.candidate_name, info.width as f32);
        }

        Ok(CaptureOutcome::Captured)
    }
}
