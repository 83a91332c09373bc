//! Converted camera images and registration image sources.
//!
//! - `CapturedImage`: one RGBA8 camera snapshot. The capture controller owns
//!   a single instance and reuses its buffer across captures; there is no
//!   history.
//! - `TrackableImage`: what the registrar accepts as a candidate source.
//!   Sources must be pixel-readable to enter the reference library.
//! - `DecodedImage`: a candidate loaded from a local PNG/JPEG file.

use std::path::Path;

use anyhow::{Context, Result};

/// RGBA8: the one pixel layout everything downstream of conversion uses.
pub const BYTES_PER_PIXEL: usize = 4;

/// A candidate source image for the reference library.
///
/// Implementations are externally owned relative to the registrar; the
/// registrar only holds shared references to them.
pub trait TrackableImage {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Whether CPU pixel access is allowed. Unreadable images are rejected
    /// at validation time, before any job is scheduled.
    fn is_readable(&self) -> bool;

    /// RGBA8 pixels, row-major. `None` when the image is not readable.
    fn rgba(&self) -> Option<&[u8]>;
}

// ----------------------------------------------------------------------------
// CapturedImage
// ----------------------------------------------------------------------------

/// One converted camera snapshot.
///
/// Invariant: `pixels.len() == width * height * 4`, always. The fields are
/// private so the invariant cannot be broken from outside; `prepare` is the
/// only resize path and updates dimensions and buffer length together.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    width: u32,
    height: u32,
    /// Source frame timestamp in seconds.
    timestamp: f64,
    pixels: Vec<u8>,
}

impl CapturedImage {
    pub fn new(width: u32, height: u32, timestamp: f64) -> Self {
        Self {
            width,
            height,
            timestamp,
            pixels: vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Retarget the buffer for a new capture. Keeps the allocation when the
    /// dimensions match the previous capture; reallocates otherwise.
    pub(crate) fn prepare(&mut self, width: u32, height: u32, timestamp: f64) {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        if self.width != width || self.height != height {
            self.pixels.resize(len, 0);
            self.width = width;
            self.height = height;
        }
        self.timestamp = timestamp;
    }

    /// Destination slice for conversion. Length is exactly `w * h * 4`.
    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

impl TrackableImage for CapturedImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_readable(&self) -> bool {
        // Converted snapshots live in CPU memory by construction.
        true
    }

    fn rgba(&self) -> Option<&[u8]> {
        Some(&self.pixels)
    }
}

// ----------------------------------------------------------------------------
// DecodedImage: file-loaded candidate
// ----------------------------------------------------------------------------

/// A reference image decoded from a local file.
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Decode a PNG or JPEG from a local path into RGBA8.
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path)
            .with_context(|| format!("failed to decode reference image {}", path.display()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

impl TrackableImage for DecodedImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn rgba(&self) -> Option<&[u8]> {
        Some(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_length_matches_dimensions() {
        let image = CapturedImage::new(64, 48, 0.0);
        assert_eq!(image.pixels().len(), 64 * 48 * BYTES_PER_PIXEL);
    }

    #[test]
    fn prepare_reuses_buffer_for_same_dimensions() {
        let mut image = CapturedImage::new(64, 48, 1.0);
        let ptr = image.pixels().as_ptr();
        image.prepare(64, 48, 2.0);
        assert_eq!(image.pixels().as_ptr(), ptr);
        assert_eq!(image.timestamp(), 2.0);
    }

    #[test]
    fn prepare_reallocates_on_dimension_change() {
        let mut image = CapturedImage::new(64, 48, 0.0);
        image.prepare(32, 32, 1.0);
        assert_eq!(image.width(), 32);
        assert_eq!(image.height(), 32);
        assert_eq!(image.pixels().len(), 32 * 32 * BYTES_PER_PIXEL);
    }

    #[test]
    fn captured_image_is_readable() {
        let image = CapturedImage::new(8, 8, 0.0);
        assert!(image.is_readable());
        assert_eq!(image.rgba().unwrap().len(), 8 * 8 * BYTES_PER_PIXEL);
    }

    #[test]
    fn decoded_image_round_trips_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ref.png");
        let buffer = image::RgbaImage::from_pixel(5, 3, image::Rgba([10, 20, 30, 255]));
        buffer.save(&path).expect("write png");

        let decoded = DecodedImage::load(&path).expect("load png");
        assert_eq!(decoded.width(), 5);
        assert_eq!(decoded.height(), 3);
        assert!(decoded.is_readable());
        assert_eq!(decoded.rgba().unwrap()[..4], [10, 20, 30, 255]);
    }
}
