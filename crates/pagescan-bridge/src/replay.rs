// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay capture — serves recorded frames as a live camera.
//
// Each device holds a list of frames; `grab_frame` walks through them and
// repeats the last one once exhausted. Context checks, permission, transient
// busy failures, and per-method capture failures can all be scripted, and
// shared counters record how many streams are open.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use image::RgbaImage;
use pagescan_core::error::{CameraUnavailableReason, Result, ScanError};
use pagescan_core::{CameraConfig, DeviceId, DeviceInfo, Resolution};
use tracing::{debug, info};

use crate::traits::{MediaCapture, VideoStream};

/// A scripted video input device.
#[derive(Debug, Clone)]
pub struct ReplayDevice {
    info: DeviceInfo,
    frames: Arc<[RgbaImage]>,
    torch: bool,
    grab_fails: bool,
    photo_fails: bool,
}

impl ReplayDevice {
    pub fn new(id: impl Into<String>, label: Option<&str>, frames: Vec<RgbaImage>) -> Self {
        Self {
            info: DeviceInfo {
                id: DeviceId::new(id),
                label: label.map(str::to_owned),
            },
            frames: frames.into(),
            torch: false,
            grab_fails: false,
            photo_fails: false,
        }
    }

    pub fn with_torch(mut self) -> Self {
        self.torch = true;
        self
    }

    /// Make `grab_frame` fail on every stream of this device.
    pub fn failing_grab(mut self) -> Self {
        self.grab_fails = true;
        self
    }

    /// Make `take_photo` fail on every stream of this device.
    pub fn failing_photo(mut self) -> Self {
        self.photo_fails = true;
        self
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

#[derive(Debug, Default)]
struct Counters {
    acquisitions: AtomicUsize,
    open_streams: AtomicUsize,
    max_open_streams: AtomicUsize,
    busy_remaining: AtomicU32,
}

/// Snapshot of replay activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Successful `acquire` calls.
    pub acquisitions: usize,
    /// Streams currently live.
    pub open_streams: usize,
    /// Highest number of simultaneously live streams seen.
    pub max_open_streams: usize,
}

/// [`MediaCapture`] backed by in-memory frames.
#[derive(Debug, Clone)]
pub struct ReplayCapture {
    devices: Vec<ReplayDevice>,
    secure: bool,
    permission_granted: bool,
    counters: Arc<Counters>,
}

impl Default for ReplayCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayCapture {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            secure: true,
            permission_granted: true,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_device(mut self, device: ReplayDevice) -> Self {
        self.devices.push(device);
        self
    }

    /// Behave as an insecure (non-HTTPS) context.
    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    /// Refuse every acquisition with `PermissionDenied`.
    pub fn deny_permission(mut self) -> Self {
        self.permission_granted = false;
        self
    }

    /// Fail the next `count` acquisitions with `DeviceBusy`.
    pub fn busy_for(self, count: u32) -> Self {
        self.counters.busy_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub fn stats(&self) -> ReplayStats {
        ReplayStats {
            acquisitions: self.counters.acquisitions.load(Ordering::SeqCst),
            open_streams: self.counters.open_streams.load(Ordering::SeqCst),
            max_open_streams: self.counters.max_open_streams.load(Ordering::SeqCst),
        }
    }
}

impl MediaCapture for ReplayCapture {
    fn platform_name(&self) -> &str {
        "Replay"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn is_secure_context(&self) -> bool {
        self.secure
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.iter().map(|d| d.info.clone()).collect())
    }

    fn acquire(&self, config: &CameraConfig) -> Result<Box<dyn VideoStream>> {
        if !self.permission_granted {
            return Err(ScanError::CameraUnavailable(
                CameraUnavailableReason::PermissionDenied,
            ));
        }

        let busy = self
            .counters
            .busy_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if busy {
            debug!("Replay device reported busy");
            return Err(ScanError::CameraUnavailable(CameraUnavailableReason::DeviceBusy));
        }

        let device = match &config.device_id {
            Some(id) => self.devices.iter().find(|d| &d.info.id == id),
            None => self.devices.first(),
        }
        .ok_or(ScanError::CameraUnavailable(CameraUnavailableReason::NoDevices))?;

        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        let open = self.counters.open_streams.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_open_streams.fetch_max(open, Ordering::SeqCst);
        info!(device = %device.info.id, open, "Replay stream acquired");

        Ok(Box::new(ReplayStream {
            device: device.clone(),
            cursor: 0,
            torch_on: false,
            live: true,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ReplayStream {
    device: ReplayDevice,
    cursor: usize,
    torch_on: bool,
    live: bool,
    counters: Arc<Counters>,
}

impl ReplayStream {
    fn ensure_live(&self) -> Result<()> {
        if self.live {
            Ok(())
        } else {
            Err(ScanError::CaptureFailed("stream has been stopped".into()))
        }
    }

    fn current(&self) -> Result<RgbaImage> {
        let frames = &self.device.frames;
        let last = frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| ScanError::CaptureFailed("device has no frames".into()))?;
        Ok(frames[self.cursor.min(last)].clone())
    }
}

impl VideoStream for ReplayStream {
    fn device_id(&self) -> &DeviceId {
        &self.device.info.id
    }

    fn resolution(&self) -> Resolution {
        self.device
            .frames
            .first()
            .map(|f| Resolution::new(f.width(), f.height()))
            .unwrap_or_default()
    }

    fn grab_frame(&mut self) -> Result<RgbaImage> {
        self.ensure_live()?;
        if self.device.grab_fails {
            return Err(ScanError::CaptureFailed("grab_frame unavailable".into()));
        }
        let frame = self.current()?;
        self.cursor += 1;
        Ok(frame)
    }

    fn take_photo(&mut self) -> Result<RgbaImage> {
        self.ensure_live()?;
        if self.device.photo_fails {
            return Err(ScanError::CaptureFailed("take_photo unavailable".into()));
        }
        // A still shows what the preview last showed.
        let frame = self.cursor.saturating_sub(1);
        let frames = &self.device.frames;
        frames
            .get(frame.min(frames.len().saturating_sub(1)))
            .cloned()
            .ok_or_else(|| ScanError::CaptureFailed("device has no frames".into()))
    }

    fn supports_torch(&self) -> bool {
        self.device.torch
    }

    fn set_torch(&mut self, enabled: bool) -> Result<()> {
        if !self.device.torch {
            return Err(ScanError::TorchUnsupported);
        }
        self.torch_on = enabled;
        Ok(())
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.counters.open_streams.fetch_sub(1, Ordering::SeqCst);
            debug!(device = %self.device.info.id, "Replay stream stopped");
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.stop();
    }
}
