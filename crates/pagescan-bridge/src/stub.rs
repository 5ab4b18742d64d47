// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub capture for hosts without a camera backend.
//
// Reports no support, so the controller fails pre-flight with
// `CameraUnavailable(NotSupported)` and callers fall back to image upload.

use pagescan_core::error::{CameraUnavailableReason, Result, ScanError};
use pagescan_core::{CameraConfig, DeviceInfo};

use crate::traits::{MediaCapture, VideoStream};

/// No-op capture returned on hosts without a native backend.
pub struct StubCapture;

impl MediaCapture for StubCapture {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn is_secure_context(&self) -> bool {
        true
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>> {
        tracing::warn!("MediaCapture::enumerate_devices called on stub capture");
        Err(ScanError::PlatformUnavailable)
    }

    fn acquire(&self, _config: &CameraConfig) -> Result<Box<dyn VideoStream>> {
        tracing::warn!("MediaCapture::acquire called on stub capture");
        Err(ScanError::CameraUnavailable(CameraUnavailableReason::NotSupported))
    }
}
