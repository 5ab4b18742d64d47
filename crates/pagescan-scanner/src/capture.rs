// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture strategy chain — ordered ways of turning a live stream into a
// still image. The chain fails only when every strategy fails.

use image::RgbaImage;
use pagescan_bridge::VideoStream;
use pagescan_core::error::{Result, ScanError};
use tracing::{debug, instrument, warn};

/// One way of obtaining a still from a live stream.
pub trait CaptureStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn capture(&self, stream: &mut dyn VideoStream) -> Result<RgbaImage>;
}

/// Copy the current preview frame.
pub struct GrabFrame;

impl CaptureStrategy for GrabFrame {
    fn name(&self) -> &'static str {
        "grab-frame"
    }

    fn capture(&self, stream: &mut dyn VideoStream) -> Result<RgbaImage> {
        stream.grab_frame()
    }
}

/// Ask the device for a full still photo.
pub struct TakePhoto;

impl CaptureStrategy for TakePhoto {
    fn name(&self) -> &'static str {
        "take-photo"
    }

    fn capture(&self, stream: &mut dyn VideoStream) -> Result<RgbaImage> {
        stream.take_photo()
    }
}

pub struct CaptureChain {
    strategies: Vec<Box<dyn CaptureStrategy>>,
}

impl Default for CaptureChain {
    /// Preview frame first, then still photo.
    fn default() -> Self {
        Self::new(vec![Box::new(GrabFrame), Box::new(TakePhoto)])
    }
}

impl CaptureChain {
    pub fn new(strategies: Vec<Box<dyn CaptureStrategy>>) -> Self {
        Self { strategies }
    }

    /// Try each strategy in order and return the first image.
    ///
    /// Fails with `CaptureFailed` listing every strategy's error when none
    /// succeeds. Empty images count as failures.
    #[instrument(skip_all, fields(strategies = self.strategies.len()))]
    pub fn capture(&self, stream: &mut dyn VideoStream) -> Result<RgbaImage> {
        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.capture(stream) {
                Ok(image) if image.width() > 0 && image.height() > 0 => {
                    debug!(
                        strategy = strategy.name(),
                        width = image.width(),
                        height = image.height(),
                        "Frame captured"
                    );
                    return Ok(image);
                }
                Ok(_) => failures.push(format!("{}: empty image", strategy.name())),
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "Capture strategy failed");
                    failures.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }
        if failures.is_empty() {
            failures.push("no capture strategies configured".into());
        }
        Err(ScanError::CaptureFailed(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pagescan_bridge::{MediaCapture, ReplayCapture, ReplayDevice};
    use pagescan_core::CameraConfig;

    fn stream_for(device: ReplayDevice) -> Box<dyn VideoStream> {
        ReplayCapture::new()
            .with_device(device)
            .acquire(&CameraConfig::default())
            .unwrap()
    }

    fn frames() -> Vec<RgbaImage> {
        vec![RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 255]))]
    }

    #[test]
    fn falls_back_to_still_photo() {
        let mut stream = stream_for(ReplayDevice::new("a", None, frames()).failing_grab());
        let image = CaptureChain::default().capture(stream.as_mut()).unwrap();
        assert_eq!(image.dimensions(), (10, 10));
    }

    #[test]
    fn all_failures_surface_capture_failed() {
        let mut stream =
            stream_for(ReplayDevice::new("a", None, frames()).failing_grab().failing_photo());
        match CaptureChain::default().capture(stream.as_mut()) {
            Err(ScanError::CaptureFailed(detail)) => {
                assert!(detail.contains("grab-frame"));
                assert!(detail.contains("take-photo"));
            }
            other => panic!("expected CaptureFailed, got {:?}", other.map(|i| i.dimensions())),
        }
    }

    #[test]
    fn empty_chain_fails() {
        let mut stream = stream_for(ReplayDevice::new("a", None, frames()));
        assert!(CaptureChain::new(Vec::new()).capture(stream.as_mut()).is_err());
    }
}
