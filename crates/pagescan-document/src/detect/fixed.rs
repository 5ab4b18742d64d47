// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed-rectangle detector, used when no real edge detection is available.

use image::RgbaImage;
use pagescan_core::error::Result;
use pagescan_core::{DetectionResult, Quad};

use super::EdgeDetector;

/// Proposes one rectangle inset from every side by `fraction` of the frame's
/// shorter side.
#[derive(Debug, Clone, Copy)]
pub struct FixedInsetDetector {
    fraction: f64,
}

impl Default for FixedInsetDetector {
    fn default() -> Self {
        Self { fraction: 0.10 }
    }
}

impl EdgeDetector for FixedInsetDetector {
    fn detect(&self, frame: &RgbaImage) -> Result<Vec<DetectionResult>> {
        let (w, h) = (frame.width() as f64, frame.height() as f64);
        if w == 0.0 || h == 0.0 {
            return Ok(Vec::new());
        }
        let margin = self.fraction * w.min(h);
        let quad = Quad::from_rect(margin, margin, w - margin, h - margin);
        Ok(vec![DetectionResult::new(quad)])
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescan_core::Point;

    #[test]
    fn margin_follows_shorter_side() {
        let frame = RgbaImage::new(1280, 720);
        let results = FixedInsetDetector::default().detect(&frame).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].quad.points(),
            &[
                Point::new(72.0, 72.0),
                Point::new(1208.0, 72.0),
                Point::new(1208.0, 648.0),
                Point::new(72.0, 648.0),
            ]
        );
    }

    #[test]
    fn empty_frame_yields_nothing() {
        assert!(FixedInsetDetector::default().detect(&RgbaImage::new(0, 0)).unwrap().is_empty());
    }
}
