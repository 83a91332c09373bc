//! Error kinds for the capture and registration paths.
//!
//! Capture-side errors are returned to the host loop and are fatal to the
//! current capture attempt only. Registrar-side errors never surface as
//! `Result` values at the tick boundary: they terminate the current batch in
//! the `Error` state with a human-readable message, and a new submission is
//! required to retry.

use thiserror::Error;

/// Errors from a single capture-and-convert attempt.
///
/// An unavailable frame is not an error: the capture request stays armed and
/// the next frame event retries.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Conversion into the RGBA destination buffer failed.
    #[error("image conversion failed: {reason}")]
    ConversionFailure { reason: String },
}

impl CaptureError {
    pub fn conversion(reason: impl Into<String>) -> Self {
        Self::ConversionFailure {
            reason: reason.into(),
        }
    }
}

/// Reasons a registration batch lands in the `Error` state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrarError {
    #[error("no images to add")]
    EmptyBatch,

    #[error("no reference library available")]
    LibraryUnavailable,

    #[error("the reference image library is not mutable")]
    LibraryNotMutable,

    /// The candidate's source image does not allow CPU pixel access.
    #[error("image {name} must be readable to be added to the image library")]
    ImageNotReadable { name: String },

    /// The library refused the add-image job at submission time.
    #[error("add-image job submission rejected: {reason}")]
    SubmissionRejected { reason: String },
}
