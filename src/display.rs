//! Display sinks.
//!
//! The engine's RawImage texture and info text widgets are reduced to one
//! trait. `LogDisplay` is the headless implementation the binaries use:
//! publishes become log lines, the info text is retained for inspection.

use crate::frame::CapturedImage;

/// Where capture output goes: an in-place texture plus a status text line.
pub trait DisplaySink {
    /// Replace the on-screen texture with the latest capture.
    fn publish_image(&mut self, image: &CapturedImage);

    /// Replace the image-info status text.
    fn set_info_text(&mut self, text: &str);
}

/// Headless display: logs publishes and keeps the last info text.
#[derive(Default)]
pub struct LogDisplay {
    last_info: String,
    published: u64,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_info(&self) -> &str {
        &self.last_info
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl DisplaySink for LogDisplay {
    fn publish_image(&mut self, image: &CapturedImage) {
        self.published += 1;
        log::info!(
            "display: published {}x{} image (t={:.3}s)",
            image.width(),
            image.height(),
            image.timestamp()
        );
    }

    fn set_info_text(&mut self, text: &str) {
        self.last_info = text.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_display_counts_publishes_and_keeps_info() {
        let mut display = LogDisplay::new();
        display.set_info_text("image info: 4x4");
        display.publish_image(&CapturedImage::new(4, 4, 0.0));
        assert_eq!(display.published(), 1);
        assert_eq!(display.last_info(), "image info: 4x4");
    }
}
