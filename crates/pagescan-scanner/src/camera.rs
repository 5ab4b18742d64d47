// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Camera controller — owns at most one live video stream.
//
// Opening always closes the previous stream first. Pre-flight checks
// (support, secure context, device presence) run before any permission
// prompt; busy devices are retried with a bounded fixed delay.

use std::sync::Arc;

use image::RgbaImage;
use pagescan_bridge::{MediaCapture, VideoStream};
use pagescan_core::error::{CameraUnavailableReason, Result, ScanError};
use pagescan_core::{CameraConfig, DeviceId, DeviceInfo, Resolution};
use tracing::{debug, info, instrument, warn};

use crate::retry::{RetryConfig, retry, retry_blocking};

pub struct CameraController {
    capture: Arc<dyn MediaCapture>,
    retry: RetryConfig,
    config: CameraConfig,
    stream: Option<Box<dyn VideoStream>>,
    devices: Vec<DeviceInfo>,
    torch_supported: bool,
}

impl CameraController {
    pub fn new(capture: Arc<dyn MediaCapture>, retry: RetryConfig, resolution: Resolution) -> Self {
        Self {
            capture,
            retry,
            config: CameraConfig::new(None, resolution),
            stream: None,
            devices: Vec::new(),
            torch_supported: false,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_live())
    }

    /// Frame size actually delivered by the open stream.
    pub fn frame_resolution(&self) -> Option<Resolution> {
        self.stream.as_ref().map(|s| s.resolution())
    }

    /// Whether the open stream has a controllable torch. `false` when closed.
    pub fn torch_supported(&self) -> bool {
        self.is_open() && self.torch_supported
    }

    /// Devices seen by the last successful enumeration.
    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn platform_name(&self) -> &str {
        self.capture.platform_name()
    }

    // -- Device selection -----------------------------------------------------

    /// Run pre-flight checks and enumerate video inputs.
    ///
    /// Fails with `CameraUnavailable(NotSupported)`, `(InsecureContext)` or
    /// `(NoDevices)`.
    #[instrument(skip(self), fields(platform = self.capture.platform_name()))]
    pub fn list_devices(&mut self) -> Result<Vec<DeviceInfo>> {
        if !self.capture.is_supported() {
            return Err(ScanError::CameraUnavailable(CameraUnavailableReason::NotSupported));
        }
        if !self.capture.is_secure_context() {
            return Err(ScanError::CameraUnavailable(
                CameraUnavailableReason::InsecureContext,
            ));
        }
        let devices = match self.capture.enumerate_devices() {
            Ok(devices) => devices,
            Err(ScanError::PlatformUnavailable) => {
                return Err(ScanError::CameraUnavailable(CameraUnavailableReason::NotSupported));
            }
            Err(err) => return Err(err),
        };
        if devices.is_empty() {
            return Err(ScanError::CameraUnavailable(CameraUnavailableReason::NoDevices));
        }
        debug!(count = devices.len(), "Video inputs enumerated");
        self.devices = devices.clone();
        Ok(devices)
    }

    // -- Stream lifetime ------------------------------------------------------

    /// Open a stream on `device` (or the first enumerated device) at
    /// `resolution`, closing any existing stream first. Blocks the calling
    /// thread while a busy device is retried.
    pub fn open(&mut self, device: Option<DeviceId>, resolution: Resolution) -> Result<()> {
        let request = self.prepare(device, resolution)?;
        let stream = request.acquire_blocking()?;
        self.install(request, stream);
        Ok(())
    }

    /// Close any open stream, run the pre-flight checks, and pick the device
    /// to open. The returned request acquires the stream without borrowing
    /// the controller.
    #[instrument(skip(self), fields(width = resolution.width, height = resolution.height))]
    pub fn prepare(
        &mut self,
        device: Option<DeviceId>,
        resolution: Resolution,
    ) -> Result<CameraRequest> {
        self.close();

        let devices = self.list_devices()?;
        let device_id = match device {
            Some(id) if devices.iter().any(|d| d.id == id) => id,
            Some(id) => {
                warn!(device = %id, "Requested camera not found; using first device");
                devices[0].id.clone()
            }
            None => devices[0].id.clone(),
        };

        Ok(CameraRequest {
            capture: Arc::clone(&self.capture),
            retry: self.retry,
            config: CameraConfig::new(Some(device_id.clone()), resolution),
            device: device_id,
        })
    }

    /// Take ownership of a stream acquired for `request`.
    pub fn install(&mut self, request: CameraRequest, stream: Box<dyn VideoStream>) {
        self.close();
        let actual = stream.resolution();
        self.torch_supported = stream.supports_torch();
        info!(
            device = %stream.device_id(),
            width = actual.width,
            height = actual.height,
            torch = self.torch_supported,
            "Camera opened"
        );
        self.config = request.config;
        self.stream = Some(stream);
    }

    /// Stop and release the stream, if any. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!(device = %stream.device_id(), "Camera closed");
        }
        self.config.torch_enabled = false;
        self.torch_supported = false;
    }

    /// Reopen with the last device and resolution.
    pub fn reopen(&mut self) -> Result<()> {
        let request = self.prepare_reopen()?;
        let stream = request.acquire_blocking()?;
        self.install(request, stream);
        Ok(())
    }

    pub fn prepare_reopen(&mut self) -> Result<CameraRequest> {
        let device = self.config.device_id.clone();
        let resolution = self.config.resolution();
        self.prepare(device, resolution)
    }

    /// Close, then open the next enumerated device, cycling.
    pub fn switch_to_next(&mut self) -> Result<DeviceId> {
        let request = self.prepare_next()?;
        let stream = request.acquire_blocking()?;
        let device = request.device().clone();
        self.install(request, stream);
        Ok(device)
    }

    #[instrument(skip(self))]
    pub fn prepare_next(&mut self) -> Result<CameraRequest> {
        let resolution = self.config.resolution();
        let current = self.config.device_id.clone();
        self.close();

        let devices = self.list_devices()?;
        let position = current
            .and_then(|id| devices.iter().position(|d| d.id == id))
            .map_or(0, |i| (i + 1) % devices.len());
        let next = devices[position].id.clone();
        self.prepare(Some(next), resolution)
    }

    /// Turn the torch on or off.
    ///
    /// Fails with `TorchUnsupported` on a stream without a torch; the
    /// recorded state stays off.
    pub fn set_torch(&mut self, enabled: bool) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(ScanError::TorchUnsupported)?;
        if !stream.supports_torch() {
            self.config.torch_enabled = false;
            return Err(ScanError::TorchUnsupported);
        }
        stream.set_torch(enabled)?;
        self.config.torch_enabled = enabled;
        debug!(enabled, "Torch toggled");
        Ok(())
    }

    /// Copy the current preview frame.
    pub fn grab_frame(&mut self) -> Result<RgbaImage> {
        self.stream_mut()?.grab_frame()
    }

    pub(crate) fn stream_mut(&mut self) -> Result<&mut (dyn VideoStream + 'static)> {
        match self.stream.as_mut() {
            Some(stream) if stream.is_live() => Ok(stream.as_mut()),
            _ => Err(ScanError::CaptureFailed("camera is not open".into())),
        }
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.close();
    }
}

// -- Acquisition ----------------------------------------------------------------

/// A planned stream acquisition, detached from the controller so it can run
/// without holding the scanner.
pub struct CameraRequest {
    capture: Arc<dyn MediaCapture>,
    retry: RetryConfig,
    config: CameraConfig,
    device: DeviceId,
}

impl CameraRequest {
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Acquire on the current thread, sleeping between busy retries.
    pub fn acquire_blocking(&self) -> Result<Box<dyn VideoStream>> {
        retry_blocking(&self.retry, |attempt| {
            debug!(attempt, device = %self.device, "Acquiring camera stream");
            self.capture.acquire(&self.config)
        })
    }

    /// Acquire from async code. Each attempt runs on the blocking pool and
    /// the backoff waits on the tokio timer.
    pub async fn acquire(&self) -> Result<Box<dyn VideoStream>> {
        retry(&self.retry, |attempt| {
            let capture = Arc::clone(&self.capture);
            let config = self.config.clone();
            debug!(attempt, device = %self.device, "Acquiring camera stream");
            async move {
                tokio::task::spawn_blocking(move || capture.acquire(&config))
                    .await
                    .map_err(|err| ScanError::CaptureFailed(format!("camera task failed: {err}")))?
            }
        })
        .await
    }
}
