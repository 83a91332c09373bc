//! demo - scripted capture-and-register run
//!
//! Captures one synthetic frame (or loads a reference image from disk),
//! submits it to the stub reference library, and polls the registration
//! state machine to a terminal state.

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use arcam_kernel::{
    CaptureOutcome, DecodedImage, FrameCapture, ImageRegistrar, LogDisplay, RegistrarState,
    StubCameraFeed, StubFeedConfig, StubLibrary, Transformation,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Reference image file (PNG/JPEG). Defaults to a synthetic capture.
    #[arg(long)]
    image: Option<PathBuf>,
    /// Candidate name in the reference library.
    #[arg(long, default_value = "demo")]
    name: String,
    /// Physical width of the image in meters (file images only; captures
    /// use the pixel width).
    #[arg(long, default_value_t = 0.2)]
    width_m: f32,
    /// Stub add-image job latency in completion polls.
    #[arg(long, default_value_t = 30)]
    job_latency: u32,
    /// Maximum ticks before giving up on the batch.
    #[arg(long, default_value_t = 600)]
    max_ticks: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    stage("build registrar");
    let mut registrar = ImageRegistrar::new(Some(Box::new(StubLibrary::new(args.job_latency))));

    match &args.image {
        Some(path) => {
            stage("load reference image");
            let image = DecodedImage::load(path)?;
            registrar.submit_candidate(Arc::new(image), &args.name, args.width_m);
        }
        None => {
            stage("capture synthetic frame");
            let mut feed = StubCameraFeed::new(StubFeedConfig::default());
            let mut display = LogDisplay::new();
            let mut capture = FrameCapture::new(Transformation::MirrorX, args.name.clone());
            capture.request_capture();
            let mut captured = false;
            // A few frame events: the stub feed warms up before delivering.
            for _ in 0..10 {
                let outcome =
                    capture.handle_frame_event(&mut feed, &mut display, Some(&mut registrar))?;
                if outcome == CaptureOutcome::Captured {
                    captured = true;
                    break;
                }
            }
            if !captured {
                bail!("stub feed never delivered a frame");
            }
            println!("{}", display.last_info());
        }
    }

    stage("poll registration jobs");
    for tick in 0..args.max_ticks {
        registrar.tick();
        match registrar.state() {
            RegistrarState::Done => {
                println!("{}", registrar.status_report());
                println!("done after {} ticks", tick + 1);
                return Ok(());
            }
            RegistrarState::Error => {
                return Err(anyhow!("registration failed: {}", registrar.error_message()));
            }
            _ => {}
        }
    }
    bail!("batch did not complete within {} ticks", args.max_ticks)
}

fn stage(name: &str) {
    println!("\n== {} ==", name);
}
