// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner state machine — Setup → Camera → Cropper → Result → Setup.
//
// The machine owns every component and is the only place that moves between
// stages. Each transition advances the generation counter, so work started
// in one stage (a detection tick, a normalization) can tell on completion
// whether its result still applies. The camera stream is open only in the
// Camera stage.

use std::sync::Arc;

use image::RgbaImage;
use pagescan_bridge::{MediaCapture, VideoStream};
use pagescan_core::error::{Result, ScanError};
use pagescan_core::{
    DeviceId, DeviceInfo, FilterMode, PageId, Quad, Rotation, RotationStep, ScannerConfig,
    ScannerStage,
};
use pagescan_document::{DocumentEncoder, EdgeDetector, NormalizationEngine, PdfWriter};
use tracing::{debug, info, instrument, warn};

use crate::assembler::{ScanDocument, ScanSession, ScannedPage, finalize};
use crate::camera::{CameraController, CameraRequest};
use crate::capture::CaptureChain;
use crate::cropper::{CropEditor, CropEvent};
use crate::detection::{DetectionJob, DetectionLoop, TickOutcome};
use crate::generation::{Generation, GenerationToken};
use crate::retry::RetryConfig;
use crate::review::ResultReview;

// -- Deferred work ------------------------------------------------------------

/// A detection tick taken out of the machine to run elsewhere.
pub struct PendingDetection {
    job: DetectionJob,
    token: GenerationToken,
}

impl PendingDetection {
    pub fn token(&self) -> &GenerationToken {
        &self.token
    }

    pub fn run(self) -> (GenerationToken, Option<Quad>) {
        (self.token, self.job.run())
    }
}

/// Crop confirmation taken out of the machine to run elsewhere.
pub struct PendingReview {
    engine: NormalizationEngine,
    image: Arc<RgbaImage>,
    quad: Quad,
    token: GenerationToken,
}

impl PendingReview {
    pub fn token(&self) -> &GenerationToken {
        &self.token
    }

    pub fn run(self) -> (GenerationToken, ResultReview) {
        let review = ResultReview::open(&self.engine, self.image, self.quad);
        (self.token, review)
    }
}

/// Which transition a camera acquisition completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CameraAction {
    /// Setup → Camera.
    Start,
    /// Cropper → Camera.
    Reopen,
    /// Camera → Camera on the next device.
    Switch,
}

impl CameraAction {
    fn from_stage(self) -> ScannerStage {
        match self {
            Self::Start => ScannerStage::Setup,
            Self::Reopen => ScannerStage::Cropper,
            Self::Switch => ScannerStage::Camera,
        }
    }
}

/// A camera acquisition taken out of the machine so busy-device retries
/// happen without holding it.
pub struct PendingCamera {
    request: CameraRequest,
    action: CameraAction,
    token: GenerationToken,
}

impl PendingCamera {
    pub fn device(&self) -> &DeviceId {
        self.request.device()
    }

    pub fn run_blocking(self) -> OpenedCamera {
        let stream = self.request.acquire_blocking();
        self.opened(stream)
    }

    pub async fn run(self) -> OpenedCamera {
        let stream = self.request.acquire().await;
        self.opened(stream)
    }

    fn opened(self, stream: Result<Box<dyn VideoStream>>) -> OpenedCamera {
        OpenedCamera {
            request: self.request,
            action: self.action,
            token: self.token,
            stream,
        }
    }
}

/// Outcome of a [`PendingCamera`], handed back to [`Scanner::finish_camera`].
pub struct OpenedCamera {
    request: CameraRequest,
    action: CameraAction,
    token: GenerationToken,
    stream: Result<Box<dyn VideoStream>>,
}

// -- Scanner ------------------------------------------------------------------

pub struct Scanner {
    config: ScannerConfig,
    camera: CameraController,
    capture_chain: CaptureChain,
    detection: DetectionLoop,
    engine: NormalizationEngine,
    generation: Generation,
    stage: ScannerStage,
    cropper: CropEditor,
    review: Option<ResultReview>,
    session: ScanSession,
}

impl Scanner {
    /// Build a scanner in the Setup stage. Fails if `config` is invalid.
    pub fn new(
        config: ScannerConfig,
        capture: Arc<dyn MediaCapture>,
        detector: Arc<dyn EdgeDetector>,
    ) -> Result<Self> {
        config.validate()?;
        let camera = CameraController::new(
            capture,
            RetryConfig::from(config.camera_retry),
            config.resolution,
        );
        let detection = DetectionLoop::new(detector, &config);
        let engine = NormalizationEngine::new(config.thumbnail_max_side);
        let cropper = CropEditor::new(config.tap_radius_px, config.overlay_alpha);
        info!(
            platform = camera.platform_name(),
            detector = detection.detector_name(),
            "Scanner ready"
        );
        Ok(Self {
            config,
            camera,
            capture_chain: CaptureChain::default(),
            detection,
            engine,
            generation: Generation::new(),
            stage: ScannerStage::Setup,
            cropper,
            review: None,
            session: ScanSession::new(),
        })
    }

    pub fn with_capture_chain(mut self, chain: CaptureChain) -> Self {
        self.capture_chain = chain;
        self
    }

    pub fn with_engine(mut self, engine: NormalizationEngine) -> Self {
        self.engine = engine;
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn stage(&self) -> ScannerStage {
        self.stage
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn detection(&self) -> &DetectionLoop {
        &self.detection
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn review(&self) -> Option<&ResultReview> {
        self.review.as_ref()
    }

    pub fn cropper(&self) -> &CropEditor {
        &self.cropper
    }

    /// The crop editor, for forwarding pointer events. Cropper stage only.
    pub fn cropper_mut(&mut self) -> Result<&mut CropEditor> {
        self.expect_stage(ScannerStage::Cropper, "edit crop")?;
        Ok(&mut self.cropper)
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// PDF encoder configured with the page size and margin settings.
    pub fn pdf_writer(&self) -> PdfWriter {
        PdfWriter::new(self.config.paper_size, self.config.page_margin_mm)
    }

    fn expect_stage(&self, stage: ScannerStage, action: &'static str) -> Result<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(ScanError::InvalidTransition {
                from: self.stage,
                action,
            })
        }
    }

    fn enter(&mut self, next: ScannerStage) {
        let generation = self.generation.advance();
        info!(from = %self.stage, to = %next, generation, "Stage transition");
        self.stage = next;
    }

    // -- Setup ----------------------------------------------------------------

    pub fn list_devices(&mut self) -> Result<Vec<DeviceInfo>> {
        self.camera.list_devices()
    }

    /// Setup → Camera. On failure the scanner stays in Setup and the caller
    /// should offer `load_image` instead.
    #[instrument(skip(self))]
    pub fn start_camera(&mut self, device: Option<DeviceId>) -> Result<()> {
        let pending = self.begin_start_camera(device)?;
        self.finish_camera(pending.run_blocking())?;
        Ok(())
    }

    /// Pre-flight and device choice for `start_camera`; the stream itself is
    /// acquired by the returned job.
    pub fn begin_start_camera(&mut self, device: Option<DeviceId>) -> Result<PendingCamera> {
        self.expect_stage(ScannerStage::Setup, "start camera")?;
        let request = self.camera.prepare(device, self.config.resolution)?;
        Ok(PendingCamera {
            request,
            action: CameraAction::Start,
            token: self.generation.token(),
        })
    }

    /// Fold a camera acquisition back in and complete its transition.
    ///
    /// `Ok(false)` when the stage changed while acquiring; a stream that
    /// arrived late is stopped. Failures apply the same fallbacks as the
    /// blocking operations.
    pub fn finish_camera(&mut self, opened: OpenedCamera) -> Result<bool> {
        let OpenedCamera {
            request,
            action,
            token,
            stream,
        } = opened;
        if !token.is_current() || self.stage != action.from_stage() {
            if let Ok(mut stream) = stream {
                stream.stop();
            }
            debug!(token = token.value(), ?action, "Stale camera acquisition discarded");
            return Ok(false);
        }
        match stream {
            Ok(stream) => {
                self.camera.install(request, stream);
                self.detection.reset();
                match action {
                    CameraAction::Start => self.enter(ScannerStage::Camera),
                    CameraAction::Reopen => {
                        self.cropper.cancel();
                        self.cropper.clear();
                        self.enter(ScannerStage::Camera);
                    }
                    CameraAction::Switch => {}
                }
                Ok(true)
            }
            Err(err) => Err(self.camera_failed(action, err)),
        }
    }

    fn camera_failed(&mut self, action: CameraAction, err: ScanError) -> ScanError {
        match action {
            CameraAction::Start => {}
            CameraAction::Reopen => {
                warn!(error = %err, "Camera could not be reopened");
                self.cropper.cancel();
                self.cropper.clear();
                self.enter(ScannerStage::Setup);
            }
            CameraAction::Switch => {
                warn!(error = %err, "Camera switch failed");
                self.camera.close();
                self.enter(ScannerStage::Setup);
            }
        }
        err
    }

    /// Setup or Camera → Cropper with an uploaded image and the default quad.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn load_image(&mut self, image: RgbaImage) -> Result<()> {
        if !matches!(self.stage, ScannerStage::Setup | ScannerStage::Camera) {
            return Err(ScanError::InvalidTransition {
                from: self.stage,
                action: "load image",
            });
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(ScanError::ImageError("image has no pixels".into()));
        }
        self.detection.reset();
        self.camera.close();
        self.cropper.set_image(Arc::new(image), None);
        self.enter(ScannerStage::Cropper);
        Ok(())
    }

    // -- Camera ---------------------------------------------------------------

    /// Run one detection tick on the current thread.
    ///
    /// When the tick triggers auto-capture the scanner moves to Cropper
    /// before returning.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.expect_stage(ScannerStage::Camera, "detect")?;
        let Some(pending) = self.begin_detection() else {
            return Ok(if self.detection.is_detecting() {
                TickOutcome::Busy
            } else {
                TickOutcome::NoQuad
            });
        };
        let (token, result) = pending.run();
        Ok(self.finish_detection(&token, result)?.unwrap_or(TickOutcome::Busy))
    }

    /// Claim the detection slot and grab a frame.
    ///
    /// `None` when not in Camera, when a tick is already in flight, or when
    /// no frame could be grabbed (counted as a tick without a quad).
    pub fn begin_detection(&mut self) -> Option<PendingDetection> {
        if self.stage != ScannerStage::Camera || !self.detection.try_begin() {
            return None;
        }
        match self.camera.grab_frame() {
            Ok(frame) => Some(PendingDetection {
                job: self.detection.job(frame),
                token: self.generation.token(),
            }),
            Err(err) => {
                debug!(error = %err, "Frame grab failed; treating as no quad");
                self.detection.commit(None);
                None
            }
        }
    }

    /// Fold a detection result back in.
    ///
    /// `Ok(None)` when the stage changed since the tick began; the result is
    /// discarded. An auto-capture outcome performs the capture.
    pub fn finish_detection(
        &mut self,
        token: &GenerationToken,
        result: Option<Quad>,
    ) -> Result<Option<TickOutcome>> {
        if !token.is_current() {
            debug!(token = token.value(), current = self.generation.current(), "Stale detection discarded");
            return Ok(None);
        }
        let outcome = self.detection.commit(result);
        if let TickOutcome::AutoCapture(_) = outcome {
            self.capture()?;
        }
        Ok(Some(outcome))
    }

    /// Release the detection slot for a tick that never produced a result.
    pub fn abandon_detection(&mut self, token: &GenerationToken) {
        if token.is_current() {
            self.detection.abandon();
        }
    }

    /// Camera → Cropper with a still from the capture chain.
    ///
    /// The latest detection seeds the crop quad. If every capture strategy
    /// fails the scanner stays in Camera.
    #[instrument(skip(self))]
    pub fn capture(&mut self) -> Result<()> {
        self.expect_stage(ScannerStage::Camera, "capture")?;
        let stream = self.camera.stream_mut()?;
        let image = self.capture_chain.capture(stream)?;
        let seed = self.detection.overlay();
        self.detection.reset();
        self.camera.close();
        self.cropper.set_image(Arc::new(image), seed);
        self.enter(ScannerStage::Cropper);
        Ok(())
    }

    /// Camera → Setup without capturing.
    pub fn stop_camera(&mut self) -> Result<()> {
        self.expect_stage(ScannerStage::Camera, "stop camera")?;
        self.detection.reset();
        self.camera.close();
        self.enter(ScannerStage::Setup);
        Ok(())
    }

    pub fn set_auto_capture(&mut self, enabled: bool) {
        self.detection.set_auto_capture(enabled);
    }

    /// Flip auto-capture and return the new setting.
    pub fn toggle_auto_capture(&mut self) -> bool {
        let enabled = !self.detection.auto_capture();
        self.detection.set_auto_capture(enabled);
        enabled
    }

    pub fn set_torch(&mut self, enabled: bool) -> Result<()> {
        self.camera.set_torch(enabled)
    }

    /// Cycle to the next camera. In-flight ticks from the old device are
    /// discarded. If the next device cannot be opened the scanner returns to
    /// Setup.
    pub fn switch_camera(&mut self) -> Result<DeviceId> {
        let pending = self.begin_switch_camera()?;
        let device = pending.device().clone();
        self.finish_camera(pending.run_blocking())?;
        Ok(device)
    }

    /// Close the current stream and plan the open of the next device.
    pub fn begin_switch_camera(&mut self) -> Result<PendingCamera> {
        self.expect_stage(ScannerStage::Camera, "switch camera")?;
        self.detection.reset();
        self.generation.advance();
        match self.camera.prepare_next() {
            Ok(request) => Ok(PendingCamera {
                request,
                action: CameraAction::Switch,
                token: self.generation.token(),
            }),
            Err(err) => Err(self.camera_failed(CameraAction::Switch, err)),
        }
    }

    // -- Cropper --------------------------------------------------------------

    /// Snapshot the confirmed crop for normalization.
    pub fn begin_confirm(&mut self) -> Result<PendingReview> {
        self.expect_stage(ScannerStage::Cropper, "confirm crop")?;
        let image = self
            .cropper
            .image()
            .cloned()
            .ok_or_else(|| ScanError::ImageError("no captured image".into()))?;
        let CropEvent::Confirmed(quad) = self.cropper.confirm() else {
            return Err(ScanError::ImageError("crop was not confirmed".into()));
        };
        Ok(PendingReview {
            engine: self.engine.clone(),
            image,
            quad,
            token: self.generation.token(),
        })
    }

    /// Cropper → Result with a finished review. `Ok(false)` when the stage
    /// changed in the meantime and the review was dropped.
    pub fn finish_confirm(&mut self, token: &GenerationToken, review: ResultReview) -> Result<bool> {
        if !token.is_current() {
            debug!(token = token.value(), "Stale review discarded");
            return Ok(false);
        }
        self.expect_stage(ScannerStage::Cropper, "confirm crop")?;
        if let Some(warning) = review.warning() {
            warn!(warning, "Result shown without full normalization");
        }
        self.review = Some(review);
        self.enter(ScannerStage::Result);
        Ok(true)
    }

    /// Cropper → Result on the current thread.
    pub fn confirm_crop(&mut self) -> Result<()> {
        let pending = self.begin_confirm()?;
        let (token, review) = pending.run();
        self.finish_confirm(&token, review)?;
        Ok(())
    }

    /// Cropper → Camera, reopening the stream. If the camera cannot be
    /// reopened the scanner falls back to Setup and returns the error.
    #[instrument(skip(self))]
    pub fn cancel_crop(&mut self) -> Result<()> {
        let pending = self.begin_cancel_crop()?;
        self.finish_camera(pending.run_blocking())?;
        Ok(())
    }

    /// Plan the reopen for `cancel_crop`.
    pub fn begin_cancel_crop(&mut self) -> Result<PendingCamera> {
        self.expect_stage(ScannerStage::Cropper, "cancel crop")?;
        match self.camera.prepare_reopen() {
            Ok(request) => Ok(PendingCamera {
                request,
                action: CameraAction::Reopen,
                token: self.generation.token(),
            }),
            Err(err) => Err(self.camera_failed(CameraAction::Reopen, err)),
        }
    }

    // -- Result ---------------------------------------------------------------

    /// Result → Cropper. The crop quad and captured image are kept.
    pub fn cancel_result(&mut self) -> Result<()> {
        self.expect_stage(ScannerStage::Result, "cancel result")?;
        self.review = None;
        self.enter(ScannerStage::Cropper);
        Ok(())
    }

    pub fn select_filter(&mut self, mode: FilterMode) -> Result<()> {
        self.expect_stage(ScannerStage::Result, "select filter")?;
        if let Some(review) = self.review.as_mut() {
            review.select_filter(&self.engine, mode);
        }
        Ok(())
    }

    pub fn rotate(&mut self, step: RotationStep) -> Result<Rotation> {
        self.expect_stage(ScannerStage::Result, "rotate")?;
        self.review
            .as_mut()
            .map(|review| review.rotate(step))
            .ok_or_else(|| ScanError::ImageError("no result to rotate".into()))
    }

    /// Result → Setup, appending the page with its rotation applied.
    pub fn accept_result(&mut self) -> Result<PageId> {
        self.expect_stage(ScannerStage::Result, "accept result")?;
        let review = self
            .review
            .take()
            .ok_or_else(|| ScanError::ImageError("no result to accept".into()))?;
        let id = self.session.accept(review.into_page());
        self.cropper.clear();
        self.enter(ScannerStage::Setup);
        Ok(id)
    }

    // -- Session --------------------------------------------------------------

    pub fn remove_page(&mut self, index: usize) -> Option<ScannedPage> {
        self.session.remove_page(index)
    }

    pub fn clear_session(&mut self) -> usize {
        self.session.clear()
    }

    /// Encode the session from Setup.
    ///
    /// On success the finished session is handed back with the document and
    /// a fresh one starts. On failure the session is kept for a retry.
    pub fn finish(&mut self, encoder: &dyn DocumentEncoder) -> Result<(ScanDocument, ScanSession)> {
        self.expect_stage(ScannerStage::Setup, "finish")?;
        let document = finalize(&self.session, encoder)?;
        let session = std::mem::take(&mut self.session);
        Ok((document, session))
    }
}
