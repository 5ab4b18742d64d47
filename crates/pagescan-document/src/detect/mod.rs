// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document edge detection.
//
// A detector is chosen once at startup; the detection loop only sees the
// `EdgeDetector` trait.

pub mod fixed;
pub mod hough;

use std::sync::Arc;

use image::RgbaImage;
use pagescan_core::DetectionResult;
use pagescan_core::error::{Result, ScanError};

pub use fixed::FixedInsetDetector;
pub use hough::HoughEdgeDetector;

/// Finds candidate document boundaries in a frame.
pub trait EdgeDetector: Send + Sync {
    /// Candidate quads in frame-pixel coordinates, best first. An empty list
    /// means no document was found.
    fn detect(&self, frame: &RgbaImage) -> Result<Vec<DetectionResult>>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Which detector implementation to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorKind {
    /// Always proposes a fixed inset rectangle.
    Fixed,
    /// Canny + Hough line search.
    #[default]
    Hough,
}

impl DetectorKind {
    pub fn build(self) -> Arc<dyn EdgeDetector> {
        match self {
            Self::Fixed => Arc::new(FixedInsetDetector::default()),
            Self::Hough => Arc::new(HoughEdgeDetector::default()),
        }
    }
}

impl std::str::FromStr for DetectorKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "mock" => Ok(Self::Fixed),
            "hough" | "edges" => Ok(Self::Hough),
            other => Err(ScanError::Config(format!("unknown detector: {other}"))),
        }
    }
}
