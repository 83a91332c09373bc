//! arcamd - AR camera kernel daemon
//!
//! This daemon:
//! 1. Drives the synthetic camera feed at the configured frame rate
//! 2. Re-arms a one-shot capture on a fixed interval
//! 3. Publishes converted frames to the headless display sink
//! 4. Forwards each capture to the registrar as a candidate
//! 5. Ticks the registration state machine and logs transitions

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arcam_kernel::{
    ArcamConfig, CaptureOutcome, FrameCapture, ImageRegistrar, LogDisplay, RegistrarState,
    StubCameraFeed, StubFeedConfig, StubLibrary,
};

fn main() -> Result<()> {
    // Initialize logging (simple stderr)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = ArcamConfig::load()?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let mut feed = StubCameraFeed::new(StubFeedConfig {
        width: cfg.camera.width,
        height: cfg.camera.height,
        target_fps: cfg.camera.target_fps,
        warmup_frames: cfg.camera.warmup_frames,
    });
    let mut display = LogDisplay::new();
    let library = if cfg.library.mutable {
        StubLibrary::new(cfg.library.job_latency)
    } else {
        StubLibrary::read_only()
    };
    let mut registrar = ImageRegistrar::new(Some(Box::new(library)));
    let mut capture = FrameCapture::new(cfg.capture.transform, cfg.capture.candidate_name.clone());

    let frame_interval = Duration::from_millis(1000 / cfg.camera.target_fps.max(1) as u64);
    let capture_interval = Duration::from_secs(cfg.capture.interval_secs);
    let mut last_capture: Option<Instant> = None;
    let mut last_health = Instant::now();
    let mut last_state = registrar.state();

    log::info!(
        "arcamd running: {}x{} feed at {} fps, transform {:?}",
        cfg.camera.width,
        cfg.camera.height,
        cfg.camera.target_fps,
        cfg.capture.transform
    );
    log::info!(
        "capturing '{}' every {}s, library mutable={}",
        cfg.capture.candidate_name,
        cfg.capture.interval_secs,
        cfg.library.mutable
    );

    while running.load(Ordering::SeqCst) {
        let due = last_capture.map_or(true, |at| at.elapsed() >= capture_interval);
        if due {
            capture.request_capture();
            last_capture = Some(Instant::now());
        }

        match capture.handle_frame_event(&mut feed, &mut display, Some(&mut registrar)) {
            Ok(CaptureOutcome::Captured) => {
                log::debug!("{}", display.last_info().replace('\n', " "));
            }
            Ok(_) => {}
            Err(e) => log::error!("capture attempt failed: {}", e),
        }

        registrar.tick();
        let state = registrar.state();
        if state != last_state {
            log::info!("registrar: {:?} -> {:?}", last_state, state);
            if state == RegistrarState::Error {
                log::warn!("{}", registrar.error_message());
            }
            last_state = state;
        }

        if last_health.elapsed() >= Duration::from_secs(5) {
            let stats = feed.stats();
            log::info!(
                "feed health={} frames={} acquisitions={} published={}",
                feed.is_healthy(),
                stats.frames_delivered,
                stats.acquisitions,
                display.published()
            );
            last_health = Instant::now();
        }

        std::thread::sleep(frame_interval);
    }

    log::info!("arcamd stopped");
    Ok(())
}
