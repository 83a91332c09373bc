//! AR camera kernel
//!
//! Host-independent core of two AR sample components: one-shot CPU image
//! capture from a camera feed, and runtime registration of captured images
//! into a mutable image-tracking reference library.
//!
//! # Architecture
//!
//! Everything runs on a single cooperative loop owned by the host binary.
//! The engine runtime is reduced to trait seams; no threads are spawned
//! here, and the only asynchrony lives behind the library's add-image jobs,
//! which are polled once per tick and never awaited.
//!
//! Data flow:
//!
//! ```text
//! CameraFeed -> FrameCapture -> DisplaySink
//!                       \-> ImageRegistrar -> ReferenceLibrary -> AddImageJob
//! ```
//!
//! # Module Structure
//!
//! - `camera`: camera feed seam (`CameraFeed`, `CpuFrame`) and the synthetic
//!   stub feed
//! - `capture`: one-shot capture controller (`FrameCapture`)
//! - `frame`: converted images and candidate image sources
//! - `registrar`: the registration state machine and the stub library
//! - `display`: display sinks
//! - `config`: daemon configuration
//! - `error`: typed error kinds

pub mod camera;
pub mod capture;
pub mod config;
pub mod display;
pub mod error;
pub mod frame;
pub mod registrar;

pub use camera::{
    CameraFeed, CpuFrame, FeedStats, FrameInfo, SourceFormat, StubCameraFeed, StubFeedConfig,
    Transformation,
};
pub use capture::{CandidateSink, CaptureOutcome, FrameCapture};
pub use config::ArcamConfig;
pub use display::{DisplaySink, LogDisplay};
pub use error::{CaptureError, RegistrarError};
pub use frame::{CapturedImage, DecodedImage, TrackableImage, BYTES_PER_PIXEL};
pub use registrar::{
    AddImageJob, Candidate, ImageRegistrar, LibraryEntry, ReferenceLibrary, RegistrarState,
    StubLibrary,
};
