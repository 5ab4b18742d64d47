// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::geometry::{DEFAULT_STABILITY_THRESHOLD, STABILITY_WINDOW};
use crate::{PaperSize, Resolution};

/// Bounded retry for camera acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraRetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay_ms: u64,
}

impl Default for CameraRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Persistent scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Period of the detection loop.
    pub detection_interval_ms: u64,
    /// Frames whose longer side exceeds this are downscaled before detection.
    pub max_detection_side: u32,
    /// Minimum pairwise overlap ratio for auto-capture (exclusive).
    pub stability_threshold: f64,
    /// Detections kept for stability evaluation. Fixed by the algorithm.
    pub history_len: usize,
    /// Whether auto-capture starts enabled.
    pub auto_capture: bool,
    /// Corner grab radius in screen pixels.
    pub tap_radius_px: f64,
    /// Longest side of filter preview thumbnails.
    pub thumbnail_max_side: u32,
    /// Requested stream resolution.
    pub resolution: Resolution,
    pub camera_retry: CameraRetryConfig,
    /// Output page size for the assembled PDF.
    pub paper_size: PaperSize,
    /// Margin on every side of the PDF page.
    pub page_margin_mm: f32,
    /// Opacity of the dark crop-editor overlay.
    pub overlay_alpha: f32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 300,
            max_detection_side: 1080,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            history_len: STABILITY_WINDOW,
            auto_capture: false,
            tap_radius_px: 40.0,
            thumbnail_max_side: 150,
            resolution: Resolution::HD,
            camera_retry: CameraRetryConfig::default(),
            paper_size: PaperSize::A4,
            page_margin_mm: 10.0,
            overlay_alpha: 0.5,
        }
    }
}

impl ScannerConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.detection_interval_ms == 0 {
            return Err(ScanError::Config("detection_interval_ms must be positive".into()));
        }
        if !(self.stability_threshold > 0.0 && self.stability_threshold <= 1.0) {
            return Err(ScanError::Config(format!(
                "stability_threshold must be in (0, 1], got {}",
                self.stability_threshold
            )));
        }
        if self.history_len != STABILITY_WINDOW {
            return Err(ScanError::Config(format!(
                "history_len must be {STABILITY_WINDOW}, got {}",
                self.history_len
            )));
        }
        if self.max_detection_side == 0 || self.thumbnail_max_side == 0 {
            return Err(ScanError::Config("image size caps must be positive".into()));
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(ScanError::Config("resolution must be non-zero".into()));
        }
        if self.camera_retry.max_attempts == 0 {
            return Err(ScanError::Config("camera_retry.max_attempts must be at least 1".into()));
        }
        if self.tap_radius_px <= 0.0 {
            return Err(ScanError::Config("tap_radius_px must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.overlay_alpha) {
            return Err(ScanError::Config("overlay_alpha must be in [0, 1]".into()));
        }
        let (w, h) = self.paper_size.dimensions_mm();
        if self.page_margin_mm < 0.0 || 2.0 * self.page_margin_mm >= w.min(h) as f32 {
            return Err(ScanError::Config("page_margin_mm leaves no printable area".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera_retry.max_attempts, 3);
        assert_eq!(config.resolution, Resolution::HD);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.json");
        let config = ScannerConfig {
            auto_capture: true,
            resolution: Resolution::FULL_HD,
            ..ScannerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ScannerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "auto_capture": true }"#).unwrap();
        let config = ScannerConfig::load(&path).unwrap();
        assert!(config.auto_capture);
        assert_eq!(config.detection_interval_ms, 300);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = ScannerConfig {
            stability_threshold: 1.5,
            ..ScannerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));

        let config = ScannerConfig {
            camera_retry: CameraRetryConfig {
                max_attempts: 0,
                delay_ms: 0,
            },
            ..ScannerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
