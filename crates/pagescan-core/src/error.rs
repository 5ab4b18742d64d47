// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagescan.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ScannerStage;

/// Why the camera could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraUnavailableReason {
    /// The host has no media-capture facility at all.
    NotSupported,
    /// Capture is only allowed from a secure context and this one isn't.
    InsecureContext,
    /// The user (or policy) refused camera access.
    PermissionDenied,
    /// No video input devices are present.
    NoDevices,
    /// A device exists but could not be started (in use, hardware fault).
    DeviceBusy,
}

impl std::fmt::Display for CameraUnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotSupported => "media capture not supported",
            Self::InsecureContext => "insecure context",
            Self::PermissionDenied => "permission denied",
            Self::NoDevices => "no video input devices",
            Self::DeviceBusy => "device busy or failed to start",
        };
        f.write_str(s)
    }
}

/// Top-level error type for all Pagescan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Camera --
    #[error("camera unavailable: {0}")]
    CameraUnavailable(CameraUnavailableReason),

    #[error("torch is not supported by the active camera")]
    TorchUnsupported,

    #[error("all capture strategies failed: {0}")]
    CaptureFailed(String),

    // -- Pipeline --
    #[error("edge detection failed: {0}")]
    DetectionFailure(String),

    #[error("normalization failed: {0}")]
    NormalizationFailure(String),

    #[error("document assembly failed: {0}")]
    AssemblyFailure(String),

    #[error("no pages to assemble")]
    NoPages,

    #[error("a quad needs exactly four points, got {0}")]
    InvalidQuad(usize),

    #[error("action `{action}` is not valid in stage {from}")]
    InvalidTransition {
        from: ScannerStage,
        action: &'static str,
    },

    // -- Document --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_stage_and_action() {
        let err = ScanError::InvalidTransition {
            from: ScannerStage::Setup,
            action: "capture",
        };
        let text = err.to_string();
        assert!(text.contains("capture"));
        assert!(text.contains(&ScannerStage::Setup.to_string()));
    }
}
