// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations. Each returns a `Result` so `main` can render
// failures through `humanize_error`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pagescan_bridge::{ReplayCapture, ReplayDevice, platform_media_capture};
use pagescan_core::error::{Result, ScanError};
use pagescan_core::{FilterMode, Rotation, RotationStep, ScannerConfig, ScannerStage};
use pagescan_document::ImageProcessor;
use pagescan_document::detect::DetectorKind;
use pagescan_scanner::driver::{self, DetectionDriver, DriverEvent};
use pagescan_scanner::{CameraController, DetectionLoop, RetryConfig, Scanner, TickOutcome};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What was written.
#[derive(Debug, Clone)]
pub struct Report {
    pub output: PathBuf,
    pub pages: usize,
    pub sha256: String,
}

pub fn load_config(path: Option<&Path>) -> Result<ScannerConfig> {
    match path {
        Some(path) => {
            let config = ScannerConfig::load(path)?;
            info!(path = %path.display(), "Configuration loaded");
            Ok(config)
        }
        None => Ok(ScannerConfig::default()),
    }
}

// -- scan ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub filter: FilterMode,
    pub rotation: Rotation,
    pub detector: DetectorKind,
}

/// Run each photo through crop, filter, and rotation, then write one PDF.
///
/// The detector's quad is used when it finds one; otherwise the default
/// inset quad.
pub fn scan(config: ScannerConfig, options: &ScanOptions) -> Result<Report> {
    if options.inputs.is_empty() {
        return Err(ScanError::NoPages);
    }
    let detector = options.detector.build();
    let mut outline = DetectionLoop::new(Arc::clone(&detector), &config);
    outline.set_auto_capture(false);
    let mut scanner = Scanner::new(config, platform_media_capture(), detector)?;

    for path in &options.inputs {
        let image = ImageProcessor::open(path)?.into_rgba();
        let detected = match outline.tick(image.clone()) {
            TickOutcome::Detected(quad) | TickOutcome::AutoCapture(quad) => Some(quad),
            TickOutcome::NoQuad | TickOutcome::Busy => None,
        };
        debug!(path = %path.display(), detected = detected.is_some(), "Photo loaded");

        scanner.load_image(image)?;
        if let Some(quad) = detected {
            scanner.cropper_mut()?.set_quad(quad);
        }
        process_result(&mut scanner, options.filter, options.rotation)?;
    }

    write_document(&mut scanner, &options.output)
}

// -- replay -------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub frames: Vec<PathBuf>,
    pub output: PathBuf,
    pub filter: FilterMode,
    pub detector: DetectorKind,
    /// Give up on auto-capture after this many ticks and capture manually.
    pub max_ticks: usize,
    /// Overrides `detection_interval_ms`.
    pub interval: Option<Duration>,
}

/// Feed image files through the camera path with auto-capture on and write
/// the captured page as a PDF.
pub async fn replay(mut config: ScannerConfig, options: &ReplayOptions) -> Result<Report> {
    config.auto_capture = true;
    let interval = options
        .interval
        .unwrap_or(Duration::from_millis(config.detection_interval_ms));

    let frames = options
        .frames
        .iter()
        .map(|path| Ok(ImageProcessor::open(path)?.into_rgba()))
        .collect::<Result<Vec<_>>>()?;
    let device = ReplayDevice::new("replay", Some("Replay"), frames);
    let capture = ReplayCapture::new().with_device(device);
    let scanner = Scanner::new(config, Arc::new(capture), options.detector.build())?;

    let shared = driver::shared(scanner);
    driver::start_camera(&shared, None).await?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let detection = DetectionDriver::spawn(Arc::clone(&shared), interval, tx);

    let mut ticks = 0;
    while let Some(event) = rx.recv().await {
        match event {
            DriverEvent::Tick(outcome) => {
                ticks += 1;
                debug!(ticks, ?outcome, "Detection tick");
                if ticks >= options.max_ticks {
                    detection.stop();
                }
            }
            DriverEvent::CaptureFailed(detail) => warn!(detail = %detail, "Auto-capture failed"),
            DriverEvent::Stopped => break,
        }
    }
    detection.join().await;

    let stage = shared.lock().await.stage();
    if stage == ScannerStage::Camera {
        info!(ticks, "No stable page detected; capturing manually");
        shared.lock().await.capture()?;
    }

    driver::confirm_crop(&shared).await?;
    let mut scanner = shared.lock().await;
    process_result(&mut scanner, options.filter, Rotation::Deg0)?;
    write_document(&mut scanner, &options.output)
}

// -- devices / config ---------------------------------------------------------

/// One line per camera: id and display label.
pub fn devices(config: &ScannerConfig) -> Result<Vec<String>> {
    let mut camera = CameraController::new(
        platform_media_capture(),
        RetryConfig::from(config.camera_retry),
        config.resolution,
    );
    let devices = camera.list_devices()?;
    Ok(devices
        .iter()
        .enumerate()
        .map(|(position, device)| format!("{}\t{}", device.id, device.display_label(position)))
        .collect())
}

/// Print the effective configuration, or write the defaults to `path`.
pub fn config(path: Option<&Path>, init: bool) -> Result<String> {
    match (path, init) {
        (Some(path), true) => {
            ScannerConfig::default().save(path)?;
            Ok(format!("Wrote default configuration to {}", path.display()))
        }
        (None, true) => Err(ScanError::Config("--init needs a --config path".into())),
        (path, false) => Ok(serde_json::to_string_pretty(&load_config(path)?)?),
    }
}

// -- Shared steps -------------------------------------------------------------

fn process_result(scanner: &mut Scanner, filter: FilterMode, rotation: Rotation) -> Result<()> {
    scanner.confirm_crop()?;
    scanner.select_filter(filter)?;
    for _ in 0..rotation.degrees() / 90 {
        scanner.rotate(RotationStep::Clockwise)?;
    }
    if let Some(warning) = scanner.review().and_then(|review| review.warning()) {
        warn!(warning, "Page kept without full normalization");
    }
    let page = scanner.accept_result()?;
    info!(page = %page, pages = scanner.session().len(), "Page added");
    Ok(())
}

fn write_document(scanner: &mut Scanner, output: &Path) -> Result<Report> {
    let writer = scanner.pdf_writer();
    let (document, session) = scanner.finish(&writer)?;
    std::fs::write(output, &document.bytes)?;
    info!(
        path = %output.display(),
        pages = session.len(),
        sha256 = %document.sha256,
        "Document written"
    );
    Ok(Report {
        output: output.to_path_buf(),
        pages: document.page_count,
        sha256: document.sha256,
    })
}
