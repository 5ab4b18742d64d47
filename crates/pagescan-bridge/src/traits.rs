// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for camera access.

use image::RgbaImage;
use pagescan_core::error::Result;
use pagescan_core::{CameraConfig, DeviceId, DeviceInfo, Resolution};

/// Host media-capture facility: device enumeration, context checks, and
/// permission-gated stream acquisition.
pub trait MediaCapture: Send + Sync {
    /// Human-readable backend name.
    fn platform_name(&self) -> &str;

    /// Whether the host can capture video at all.
    fn is_supported(&self) -> bool;

    /// Whether the current context may request camera access.
    fn is_secure_context(&self) -> bool;

    /// Video input devices, in platform order.
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Open a live stream. May prompt for permission.
    ///
    /// Fails with `CameraUnavailable(PermissionDenied)` when access is
    /// refused and `CameraUnavailable(DeviceBusy)` when the device cannot be
    /// started right now.
    fn acquire(&self, config: &CameraConfig) -> Result<Box<dyn VideoStream>>;
}

/// One live camera stream. Dropping a stream releases it.
pub trait VideoStream: Send {
    fn device_id(&self) -> &DeviceId;

    /// Actual frame size delivered by the device.
    fn resolution(&self) -> Resolution;

    /// Copy the current preview frame.
    fn grab_frame(&mut self) -> Result<RgbaImage>;

    /// Take a full still photo.
    fn take_photo(&mut self) -> Result<RgbaImage>;

    fn supports_torch(&self) -> bool;

    /// Fails with `TorchUnsupported` when the device has no torch.
    fn set_torch(&mut self, enabled: bool) -> Result<()>;

    /// Release the device. Idempotent.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}
