//! Runtime reference-library registration.
//!
//! `ImageRegistrar` takes candidate images, validates them, submits them to
//! the reference library's asynchronous add-image jobs, and polls completion
//! once per tick:
//!
//! ```text
//! NoImagesAdded --submit--> AddImagesRequested --valid--> AddingImages --all jobs done--> Done
//!                                  \--invalid--> Error
//! ```
//!
//! `Done` and `Error` are terminal until the next submission. A submission
//! while a batch is in flight replaces it: the old batch's jobs keep running
//! in the library but their results are never observed (last submission
//! wins, no queuing, no cancellation).
//!
//! The registrar is single-writer by contract: `submit_candidate` and `tick`
//! must run on the same thread, like every other per-frame callback here.

use std::sync::Arc;

use crate::capture::CandidateSink;
use crate::error::RegistrarError;
use crate::frame::TrackableImage;

/// An asynchronous add-image job owned by the library. Polled, never awaited.
pub trait AddImageJob {
    fn is_complete(&self) -> bool;

    /// Human-readable job status for the status report.
    fn status(&self) -> String;
}

/// The mutable runtime reference library.
pub trait ReferenceLibrary {
    /// Whether runtime insertion is supported at all.
    fn is_mutable(&self) -> bool;

    /// Schedule an add-with-validation job. Errors with
    /// `RegistrarError::SubmissionRejected` when the library refuses the
    /// image.
    fn schedule_add_image(
        &mut self,
        image: Arc<dyn TrackableImage>,
        name: &str,
        physical_width_m: f32,
    ) -> Result<Box<dyn AddImageJob>, RegistrarError>;
}

/// One image queued for registration.
pub struct Candidate {
    image: Arc<dyn TrackableImage>,
    name: String,
    physical_width_m: f32,
    job: Option<Box<dyn AddImageJob>>,
}

impl Candidate {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn physical_width_m(&self) -> f32 {
        self.physical_width_m
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrarState {
    NoImagesAdded,
    AddImagesRequested,
    AddingImages,
    Done,
    Error,
}

pub struct ImageRegistrar {
    library: Option<Box<dyn ReferenceLibrary>>,
    batch: Vec<Candidate>,
    state: RegistrarState,
    error_message: String,
}

impl ImageRegistrar {
    pub fn new(library: Option<Box<dyn ReferenceLibrary>>) -> Self {
        Self {
            library,
            batch: Vec::new(),
            state: RegistrarState::NoImagesAdded,
            error_message: String::new(),
        }
    }

    pub fn state(&self) -> RegistrarState {
        self.state
    }

    /// The rendered error message while in the `Error` state, empty otherwise.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.batch
    }

    /// Replace the pending batch with a single candidate and restart the
    /// cycle, from any state. An in-flight batch's jobs are orphaned.
    pub fn submit_candidate(
        &mut self,
        image: Arc<dyn TrackableImage>,
        name: &str,
        physical_width_m: f32,
    ) {
        if self.state == RegistrarState::AddingImages {
            log::debug!("replacing in-flight batch; prior jobs are orphaned");
        }
        self.batch.clear();
        self.batch.push(Candidate {
            image,
            name: name.to_string(),
            physical_width_m,
            job: None,
        });
        self.error_message.clear();
        self.state = RegistrarState::AddImagesRequested;
        log::info!(
            "registration requested for '{}' (width {}m)",
            name,
            physical_width_m
        );
    }

    /// Advance the state machine. At most one transition per call.
    pub fn tick(&mut self) {
        match self.state {
            RegistrarState::AddImagesRequested => {
                if let Err(err) = self.start_batch() {
                    self.set_error(err);
                }
            }
            RegistrarState::AddingImages => {
                let done = self
                    .batch
                    .iter()
                    .all(|c| c.job.as_ref().is_some_and(|job| job.is_complete()));
                if done {
                    self.state = RegistrarState::Done;
                    log::info!("all images added");
                }
            }
            // NoImagesAdded, Done, and Error wait for the next submission.
            _ => {}
        }
    }

    fn start_batch(&mut self) -> Result<(), RegistrarError> {
        if self.batch.is_empty() {
            return Err(RegistrarError::EmptyBatch);
        }
        let library = self
            .library
            .as_mut()
            .ok_or(RegistrarError::LibraryUnavailable)?;
        if !library.is_mutable() {
            return Err(RegistrarError::LibraryNotMutable);
        }
        if let Some(candidate) = self.batch.iter().find(|c| !c.image.is_readable()) {
            return Err(RegistrarError::ImageNotReadable {
                name: candidate.name.clone(),
            });
        }

        // Submit in batch order. A rejection fails the whole batch and
        // aborts the remaining submissions; already-scheduled jobs are
        // orphaned like any replaced batch.
        for candidate in &mut self.batch {
            let job = library.schedule_add_image(
                Arc::clone(&candidate.image),
                &candidate.name,
                candidate.physical_width_m,
            )?;
            log::debug!("scheduled add-image job for '{}'", candidate.name);
            candidate.job = Some(job);
        }
        self.state = RegistrarState::AddingImages;
        Ok(())
    }

    fn set_error(&mut self, err: RegistrarError) {
        self.state = RegistrarState::Error;
        self.error_message = format!("Error: {err}");
        log::warn!("{}", self.error_message);
    }

    /// Multi-line status block for on-screen display.
    pub fn status_report(&self) -> String {
        match self.state {
            RegistrarState::NoImagesAdded => "No images added".to_string(),
            RegistrarState::AddImagesRequested => "Add images requested".to_string(),
            RegistrarState::AddingImages => {
                let mut report = String::from("Add image status:\n");
                for candidate in &self.batch {
                    let status = candidate
                        .job
                        .as_ref()
                        .map_or_else(|| "Pending".to_string(), |job| job.status());
                    report.push_str(&format!("\t{}: {}\n", candidate.name, status));
                }
                report
            }
            RegistrarState::Done => "All images added".to_string(),
            RegistrarState::Error => self.error_message.clone(),
        }
    }
}

impl CandidateSink for ImageRegistrar {
    fn submit(&mut self, image: Arc<dyn TrackableImage>, name: &str, physical_width_m: f32) {
        self.submit_candidate(image, name, physical_width_m);
    }
}

// ----------------------------------------------------------------------------
// Stub library: in-memory mutable library with tick-delayed jobs
// ----------------------------------------------------------------------------

use std::cell::Cell;

/// In-memory reference library. Jobs complete after a fixed number of
/// completion polls, modelling the multi-frame latency of real validation.
pub struct StubLibrary {
    mutable: bool,
    rejecting: bool,
    /// Polls before a scheduled job reports complete.
    job_latency: u32,
    entries: Vec<LibraryEntry>,
}

/// What the stub records for each registered image.
#[derive(Clone, Debug)]
pub struct LibraryEntry {
    pub name: String,
    pub physical_width_m: f32,
    pub width: u32,
    pub height: u32,
}

impl StubLibrary {
    pub fn new(job_latency: u32) -> Self {
        Self {
            mutable: true,
            rejecting: false,
            job_latency,
            entries: Vec::new(),
        }
    }

    /// A precompiled, read-only library: `is_mutable` reports false.
    pub fn read_only() -> Self {
        Self {
            mutable: false,
            rejecting: false,
            job_latency: 0,
            entries: Vec::new(),
        }
    }

    /// A mutable library that refuses every submission.
    pub fn rejecting() -> Self {
        Self {
            mutable: true,
            rejecting: true,
            job_latency: 0,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferenceLibrary for StubLibrary {
    fn is_mutable(&self) -> bool {
        self.mutable
    }

    fn schedule_add_image(
        &mut self,
        image: Arc<dyn TrackableImage>,
        name: &str,
        physical_width_m: f32,
    ) -> Result<Box<dyn AddImageJob>, RegistrarError> {
        if self.rejecting {
            return Err(RegistrarError::SubmissionRejected {
                reason: format!("library refused image '{}'", name),
            });
        }
        self.entries.push(LibraryEntry {
            name: name.to_string(),
            physical_width_m,
            width: image.width(),
            height: image.height(),
        });
        Ok(Box::new(StubJob {
            polls_remaining: Cell::new(self.job_latency),
        }))
    }
}

struct StubJob {
    polls_remaining: Cell<u32>,
}

impl AddImageJob for StubJob {
    fn is_complete(&self) -> bool {
        let remaining = self.polls_remaining.get();
        if remaining == 0 {
            return true;
        }
        self.polls_remaining.set(remaining - 1);
        false
    }

    fn status(&self) -> String {
        if self.polls_remaining.get() == 0 {
            "Success".to_string()
        } else {
            format!("Pending ({} polls remaining)", self.polls_remaining.get())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CapturedImage;

    /// Image that refuses CPU pixel access.
    struct OpaqueImage;

    impl TrackableImage for OpaqueImage {
        fn width(&self) -> u32 {
            64
        }
        fn height(&self) -> u32 {
            64
        }
        fn is_readable(&self) -> bool {
            false
        }
        fn rgba(&self) -> Option<&[u8]> {
            None
        }
    }

    fn readable_image(width: u32, height: u32) -> Arc<dyn TrackableImage> {
        Arc::new(CapturedImage::new(width, height, 0.0))
    }

    fn registrar_with(library: StubLibrary) -> ImageRegistrar {
        ImageRegistrar::new(Some(Box::new(library)))
    }

    #[test]
    fn starts_with_no_images_and_tick_is_a_noop() {
        let mut registrar = registrar_with(StubLibrary::new(1));
        assert_eq!(registrar.state(), RegistrarState::NoImagesAdded);
        for _ in 0..100 {
            registrar.tick();
        }
        assert_eq!(registrar.state(), RegistrarState::NoImagesAdded);
        assert!(registrar.candidates().is_empty());
    }

    #[test]
    fn readable_candidate_runs_to_done() {
        let mut registrar = registrar_with(StubLibrary::new(2));
        registrar.submit_candidate(readable_image(64, 64), "hardyTest", 64.0);
        assert_eq!(registrar.state(), RegistrarState::AddImagesRequested);
        assert_eq!(registrar.candidates().len(), 1);

        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::AddingImages);
        assert!(registrar.status_report().contains("hardyTest"));

        // Job needs two more polls; state self-transitions until then.
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::AddingImages);
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::AddingImages);
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::Done);
        assert_eq!(registrar.status_report(), "All images added");

        // Terminal until the next submission.
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::Done);
    }

    #[test]
    fn submit_replaces_the_prior_batch() {
        let mut registrar = registrar_with(StubLibrary::new(10));
        registrar.submit_candidate(readable_image(32, 32), "first", 32.0);
        registrar.submit_candidate(readable_image(64, 64), "second", 64.0);

        assert_eq!(registrar.candidates().len(), 1);
        assert_eq!(registrar.candidates()[0].name(), "second");
        assert_eq!(registrar.state(), RegistrarState::AddImagesRequested);
    }

    #[test]
    fn submit_interrupts_an_in_flight_batch() {
        let mut registrar = registrar_with(StubLibrary::new(100));
        registrar.submit_candidate(readable_image(32, 32), "first", 32.0);
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::AddingImages);

        // Last submission wins; the first batch's job is orphaned.
        registrar.submit_candidate(readable_image(64, 64), "second", 64.0);
        assert_eq!(registrar.state(), RegistrarState::AddImagesRequested);
        assert_eq!(registrar.candidates()[0].name(), "second");
    }

    #[test]
    fn unreadable_image_errors_with_candidate_name() {
        let mut registrar = registrar_with(StubLibrary::new(1));
        registrar.submit_candidate(Arc::new(OpaqueImage), "opaque-poster", 0.3);
        registrar.tick();

        assert_eq!(registrar.state(), RegistrarState::Error);
        assert!(registrar.error_message().contains("opaque-poster"));
        assert!(registrar.status_report().contains("opaque-poster"));
    }

    #[test]
    fn read_only_library_errors_without_touching_the_batch() {
        let mut registrar = registrar_with(StubLibrary::read_only());
        registrar.submit_candidate(readable_image(64, 64), "cap", 0.2);
        registrar.tick();

        assert_eq!(registrar.state(), RegistrarState::Error);
        assert!(registrar.error_message().contains("not mutable"));
        // Batch untouched: the candidate is still there, unsubmitted.
        assert_eq!(registrar.candidates().len(), 1);
    }

    #[test]
    fn missing_library_errors() {
        let mut registrar = ImageRegistrar::new(None);
        registrar.submit_candidate(readable_image(64, 64), "cap", 0.2);
        registrar.tick();

        assert_eq!(registrar.state(), RegistrarState::Error);
        assert!(registrar.error_message().contains("no reference library"));
    }

    #[test]
    fn rejected_submission_errors() {
        let mut registrar = registrar_with(StubLibrary::rejecting());
        registrar.submit_candidate(readable_image(64, 64), "cap", 0.2);
        registrar.tick();

        assert_eq!(registrar.state(), RegistrarState::Error);
        assert!(registrar.error_message().contains("rejected"));
        assert!(registrar.error_message().contains("cap"));
    }

    #[test]
    fn error_state_recovers_on_new_submission() {
        let mut registrar = registrar_with(StubLibrary::new(0));
        registrar.submit_candidate(Arc::new(OpaqueImage), "bad", 0.2);
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::Error);

        registrar.submit_candidate(readable_image(64, 64), "good", 0.2);
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::AddingImages);
        registrar.tick();
        assert_eq!(registrar.state(), RegistrarState::Done);
        assert!(registrar.error_message().is_empty());
    }

    #[test]
    fn stub_library_records_entries() {
        let mut library = StubLibrary::new(0);
        let job = library
            .schedule_add_image(readable_image(64, 48), "cap", 0.25)
            .unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library.entries()[0].name, "cap");
        assert_eq!(library.entries()[0].width, 64);
        assert!(job.is_complete());
        assert_eq!(job.status(), "Success");
    }

    #[test]
    fn stub_job_counts_down_polls() {
        let job = StubJob {
            polls_remaining: Cell::new(2),
        };
        assert!(!job.is_complete());
        assert!(job.status().contains("Pending"));
        assert!(!job.is_complete());
        assert!(job.is_complete());
    }
}
