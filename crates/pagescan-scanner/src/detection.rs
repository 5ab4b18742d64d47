// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection loop — per-tick edge detection, rolling history, and
// stability-gated auto-capture.
//
// A tick is split into three steps so the detector can run off the caller's
// thread: `try_begin` sets the in-flight guard, `job(frame).run()` does the
// CPU work, and `commit` folds the result into the history.

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;
use pagescan_core::geometry::{STABILITY_WINDOW, is_steady, scale_quad};
use pagescan_core::{Quad, ScannerConfig};
use pagescan_document::{EdgeDetector, ImageProcessor};
use tracing::{debug, info};

// -- History ------------------------------------------------------------------

/// The most recent detections, oldest first, capped at the stability window.
#[derive(Debug, Clone, Default)]
pub struct DetectionHistory {
    entries: VecDeque<Quad>,
}

impl DetectionHistory {
    pub fn push(&mut self, quad: Quad) {
        if self.entries.len() == STABILITY_WINDOW {
            self.entries.pop_front();
        }
        self.entries.push_back(quad);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == STABILITY_WINDOW
    }

    pub fn is_steady(&self, threshold: f64) -> bool {
        let entries: Vec<Quad> = self.entries.iter().copied().collect();
        is_steady(&entries, threshold)
    }
}

// -- Tick ---------------------------------------------------------------------

/// What one detection tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A previous tick was still running; nothing was done.
    Busy,
    /// No document this tick. Overlay and history were cleared.
    NoQuad,
    /// A document was found and pushed onto the history.
    Detected(Quad),
    /// The last three detections agreed: capture now. History was cleared.
    AutoCapture(Quad),
}

/// The CPU-bound part of a tick, detached from the loop's state.
pub struct DetectionJob {
    frame: RgbaImage,
    detector: Arc<dyn EdgeDetector>,
    max_side: u32,
}

impl DetectionJob {
    /// Best quad in full-frame coordinates, or `None`.
    ///
    /// The frame is downscaled to `max_side` before detection and the quad
    /// mapped back. Detector errors count as "no quad".
    pub fn run(self) -> Option<Quad> {
        let (small, scale) = ImageProcessor::from_rgba(self.frame).downscale_to(self.max_side);
        let small = small.into_rgba();
        match self.detector.detect(&small) {
            Ok(results) => results
                .into_iter()
                .next()
                .map(|best| scale_quad(&best.quad, 1.0 / scale)),
            Err(err) => {
                debug!(detector = self.detector.name(), error = %err, "Detection failed; treating as no quad");
                None
            }
        }
    }
}

// -- Loop state ---------------------------------------------------------------

pub struct DetectionLoop {
    detector: Arc<dyn EdgeDetector>,
    history: DetectionHistory,
    detecting: bool,
    auto_capture: bool,
    threshold: f64,
    max_side: u32,
    overlay: Option<Quad>,
}

impl DetectionLoop {
    pub fn new(detector: Arc<dyn EdgeDetector>, config: &ScannerConfig) -> Self {
        Self {
            detector,
            history: DetectionHistory::default(),
            detecting: false,
            auto_capture: config.auto_capture,
            threshold: config.stability_threshold,
            max_side: config.max_detection_side,
            overlay: None,
        }
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    /// The quad currently drawn over the preview.
    pub fn overlay(&self) -> Option<Quad> {
        self.overlay
    }

    pub fn auto_capture(&self) -> bool {
        self.auto_capture
    }

    /// Enable or disable auto-capture. Clears the history.
    pub fn set_auto_capture(&mut self, enabled: bool) {
        self.auto_capture = enabled;
        self.history.clear();
        info!(enabled, "Auto-capture toggled");
    }

    /// Forget everything from a previous camera session.
    pub fn reset(&mut self) {
        self.history.clear();
        self.overlay = None;
        self.detecting = false;
    }

    /// Claim the in-flight slot. `false` if a tick is already running.
    pub fn try_begin(&mut self) -> bool {
        if self.detecting {
            return false;
        }
        self.detecting = true;
        true
    }

    pub fn job(&self, frame: RgbaImage) -> DetectionJob {
        DetectionJob {
            frame,
            detector: Arc::clone(&self.detector),
            max_side: self.max_side,
        }
    }

    /// Release the in-flight slot without touching history or overlay.
    pub fn abandon(&mut self) {
        self.detecting = false;
    }

    /// Fold one detection result into the loop state and release the slot.
    pub fn commit(&mut self, result: Option<Quad>) -> TickOutcome {
        self.detecting = false;

        let Some(quad) = result else {
            self.overlay = None;
            self.history.clear();
            return TickOutcome::NoQuad;
        };

        self.overlay = Some(quad);
        self.history.push(quad);

        if self.auto_capture && self.history.is_full() && self.history.is_steady(self.threshold) {
            info!(threshold = self.threshold, "Detection stable; auto-capturing");
            self.history.clear();
            return TickOutcome::AutoCapture(quad);
        }
        TickOutcome::Detected(quad)
    }

    /// Run a whole tick on the current thread.
    pub fn tick(&mut self, frame: RgbaImage) -> TickOutcome {
        if !self.try_begin() {
            return TickOutcome::Busy;
        }
        let result = self.job(frame).run();
        self.commit(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pagescan_core::error::{Result, ScanError};
    use pagescan_core::{DetectionResult, Point};
    use pagescan_document::FixedInsetDetector;

    struct FailingDetector;

    impl EdgeDetector for FailingDetector {
        fn detect(&self, _frame: &RgbaImage) -> Result<Vec<DetectionResult>> {
            Err(ScanError::DetectionFailure("model not loaded".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn frame(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255]))
    }

    fn auto_loop() -> DetectionLoop {
        let config = ScannerConfig {
            auto_capture: true,
            ..ScannerConfig::default()
        };
        DetectionLoop::new(Arc::new(FixedInsetDetector::default()), &config)
    }

    #[test]
    fn history_keeps_last_three() {
        let mut history = DetectionHistory::default();
        for i in 0..5 {
            history.push(Quad::from_rect(i as f64, 0.0, 10.0, 10.0));
        }
        assert_eq!(history.len(), 3);
        assert!(history.is_full());
    }

    #[test]
    fn auto_capture_fires_once_then_history_resets() {
        let mut detection = auto_loop();
        assert!(matches!(detection.tick(frame(640, 480)), TickOutcome::Detected(_)));
        assert!(matches!(detection.tick(frame(640, 480)), TickOutcome::Detected(_)));
        assert!(matches!(detection.tick(frame(640, 480)), TickOutcome::AutoCapture(_)));
        assert!(detection.history().is_empty());
        // Fourth identical tick only refills the history.
        assert!(matches!(detection.tick(frame(640, 480)), TickOutcome::Detected(_)));
        assert_eq!(detection.history().len(), 1);
    }

    #[test]
    fn no_auto_capture_when_disabled() {
        let mut detection =
            DetectionLoop::new(Arc::new(FixedInsetDetector::default()), &ScannerConfig::default());
        for _ in 0..5 {
            assert!(matches!(detection.tick(frame(640, 480)), TickOutcome::Detected(_)));
        }
    }

    #[test]
    fn detector_errors_are_treated_as_no_quad() {
        let mut detection = auto_loop();
        detection.tick(frame(640, 480));
        let mut failing = DetectionLoop::new(Arc::new(FailingDetector), &ScannerConfig::default());
        assert_eq!(failing.tick(frame(640, 480)), TickOutcome::NoQuad);
        assert!(!failing.is_detecting());
        // The loop keeps going.
        assert_eq!(failing.tick(frame(640, 480)), TickOutcome::NoQuad);
    }

    #[test]
    fn missing_quad_clears_overlay_and_history() {
        let mut detection = auto_loop();
        detection.tick(frame(640, 480));
        detection.tick(frame(640, 480));
        assert!(detection.overlay().is_some());
        assert!(detection.try_begin());
        assert_eq!(detection.commit(None), TickOutcome::NoQuad);
        assert!(detection.overlay().is_none());
        assert!(detection.history().is_empty());
    }

    #[test]
    fn in_flight_guard_rejects_overlapping_ticks() {
        let mut detection = auto_loop();
        assert!(detection.try_begin());
        assert!(!detection.try_begin());
        assert_eq!(detection.tick(frame(64, 48)), TickOutcome::Busy);
        detection.abandon();
        assert!(detection.try_begin());
    }

    #[test]
    fn downscaled_detection_maps_back_to_full_resolution() {
        let mut detection = auto_loop();
        // 2160x1440 is detected at 1080x720 (scale 0.5): margin 72 → 144.
        let TickOutcome::Detected(quad) = detection.tick(frame(2160, 1440)) else {
            panic!("expected a detection");
        };
        assert_eq!(quad.points()[0], Point::new(144.0, 144.0));
        assert_eq!(quad.points()[2], Point::new(2016.0, 1296.0));
    }

    #[test]
    fn toggling_auto_capture_clears_history() {
        let mut detection = auto_loop();
        detection.tick(frame(640, 480));
        detection.tick(frame(640, 480));
        detection.set_auto_capture(true);
        assert!(detection.history().is_empty());
        assert!(matches!(detection.tick(frame(640, 480)), TickOutcome::Detected(_)));
    }
}
