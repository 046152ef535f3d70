//! Still Capture demonstration
//!
//! Runs the capture pipeline end to end against the scriptable fake camera
//! and writes the resulting JPEGs to a local directory.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use still_capture::{
    capture::{FakeCamera, FileConfig, FocusScript, PixelFormat, Surface, Viewport},
    metrics::CaptureMetrics,
    orientation::OrientationCorrector,
    session::{CapturePipeline, CaptureStart, SessionController, ThreadScheduler},
    storage::{CaptureSink, DirectoryMedium, SystemClock},
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Focus {
    /// Focus completes after --focus-ms
    Fast,
    /// Focus never completes
    Never,
    /// The focus request is rejected
    Fail,
}

#[derive(Debug, Parser)]
#[command(name = "still-capture", version, about = "Still capture pipeline demo")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage root (overrides the configuration file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Number of pictures to take
    #[arg(short = 'n', long, default_value_t = 3)]
    captures: u32,

    /// Simulated auto-focus behavior
    #[arg(long, value_enum, default_value_t = Focus::Fast)]
    focus: Focus,

    /// Simulated auto-focus latency in milliseconds
    #[arg(long, default_value_t = 50)]
    focus_ms: u64,

    /// Viewport width and height
    #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"])]
    viewport: Option<Vec<u32>>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Still Capture v{}", still_capture::VERSION);
    info!("This is a demonstration using a fake camera");

    let mut file_config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(root) = args.root {
        file_config.storage.root = root;
    }
    let config = file_config.capture;

    if let Err(e) = std::fs::create_dir_all(&file_config.storage.root) {
        eprintln!("Failed to create storage root: {}", e);
        std::process::exit(1);
    }

    let focus = match args.focus {
        Focus::Fast => FocusScript::CompleteAfter {
            delay: Duration::from_millis(args.focus_ms),
            success: true,
        },
        Focus::Never => FocusScript::Never,
        Focus::Fail => FocusScript::FailRequest,
    };

    let metrics = match CaptureMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            eprintln!("Failed to create metrics: {}", e);
            std::process::exit(1);
        }
    };

    let scheduler = Arc::new(ThreadScheduler::new());
    let camera = Arc::new(FakeCamera::new(scheduler.clone()).with_focus(focus));
    let sink = CaptureSink::new(
        Arc::new(DirectoryMedium::new(&file_config.storage.root)),
        Arc::new(SystemClock),
        config.subdirectory.clone(),
        config.jpeg_quality,
    );
    let pipeline = CapturePipeline::new(OrientationCorrector::new(), sink);
    let deadline = config.focus_fallback() * 10;
    let mut session =
        SessionController::new(camera, scheduler, pipeline, config).with_metrics(metrics.clone());

    let viewport = args
        .viewport
        .as_deref()
        .and_then(|v| match v {
            [w, h] => Some(Viewport::new(*w, *h)),
            _ => None,
        });

    if let Err(e) = session.attach(&Surface::new(1)) {
        eprintln!("Failed to attach camera: {}", e);
        std::process::exit(1);
    }
    match session.configure(viewport, PixelFormat::Nv21) {
        Ok(applied) => info!(
            "Preview {} / picture {}",
            applied.preview_size, applied.picture_size
        ),
        Err(e) => {
            eprintln!("Failed to configure camera: {}", e);
            std::process::exit(1);
        }
    }

    for i in 0..args.captures {
        if let Err(e) = session.start_preview() {
            warn!("Preview failed: {}", e);
            break;
        }
        match session.capture() {
            Ok(CaptureStart::Armed) => info!("Capture {} armed", i + 1),
            Ok(CaptureStart::Ignored) => warn!("Capture {} ignored", i + 1),
            Err(e) => {
                warn!("Capture {} failed: {}", i + 1, e);
                continue;
            }
        }

        // Wait for the race to resolve and the persist worker to finish
        let started = Instant::now();
        thread::sleep(Duration::from_millis(5));
        while session.is_capture_in_flight() || session.phase() != still_capture::Phase::Previewing
        {
            if started.elapsed() > deadline {
                warn!("Capture {} did not finish in {:?}", i + 1, deadline);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    session.detach();

    match metrics.encode() {
        Ok(text) => println!("{}", text),
        Err(e) => warn!("Failed to encode metrics: {}", e),
    }
    info!("Done.");
}
