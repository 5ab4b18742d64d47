// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async driver — runs the detection loop on a tokio interval and moves
// CPU-bound work onto the blocking pool.
//
// The scanner lives behind an `Arc<tokio::sync::Mutex<_>>`. The lock is held
// only to start and to commit a step, never across the detector or the
// normalization engine or a camera acquisition; generation tokens discard results that arrive after
// the stage changed.

use std::sync::Arc;
use std::time::Duration;

use pagescan_core::{DeviceId, ScannerStage};
use pagescan_core::error::{Result, ScanError};
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::detection::TickOutcome;
use crate::machine::Scanner;

pub type SharedScanner = Arc<Mutex<Scanner>>;

pub fn shared(scanner: Scanner) -> SharedScanner {
    Arc::new(Mutex::new(scanner))
}

/// Notifications from the detection driver.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// One tick completed.
    Tick(TickOutcome),
    /// Auto-capture fired but no capture strategy produced an image.
    CaptureFailed(String),
    /// The loop exited.
    Stopped,
}

/// Handle to a running detection loop.
pub struct DetectionDriver {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl DetectionDriver {
    /// Start ticking every `interval` while the scanner is in Camera.
    ///
    /// The loop exits on `stop`, when the scanner leaves Camera, or when the
    /// event receiver is dropped.
    pub fn spawn(
        scanner: SharedScanner,
        interval: Duration,
        events: mpsc::UnboundedSender<DriverEvent>,
    ) -> Self {
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            Self::run(scanner, interval, signal, &events).await;
            let _ = events.send(DriverEvent::Stopped);
        });
        info!(interval_ms = interval.as_millis() as u64, "Detection driver started");
        Self { handle, shutdown }
    }

    /// Ask the loop to exit after the current step.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "Detection driver task failed");
        }
    }

    async fn run(
        scanner: SharedScanner,
        interval: Duration,
        shutdown: Arc<Notify>,
        events: &mpsc::UnboundedSender<DriverEvent>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("Detection driver received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let pending = {
                let mut scanner = scanner.lock().await;
                if scanner.stage() != ScannerStage::Camera {
                    debug!(stage = %scanner.stage(), "Left camera stage; driver exiting");
                    break;
                }
                scanner.begin_detection()
            };
            let Some(pending) = pending else {
                continue;
            };

            let token = pending.token().clone();
            let (token, result) = match tokio::task::spawn_blocking(move || pending.run()).await {
                Ok(done) => done,
                Err(err) => {
                    warn!(error = %err, "Detection task failed");
                    scanner.lock().await.abandon_detection(&token);
                    continue;
                }
            };

            let committed = scanner.lock().await.finish_detection(&token, result);
            let event = match committed {
                Ok(Some(outcome)) => DriverEvent::Tick(outcome),
                Ok(None) => continue,
                Err(err) => DriverEvent::CaptureFailed(err.to_string()),
            };
            if events.send(event).is_err() {
                debug!("Event receiver dropped; driver exiting");
                break;
            }
        }
    }
}

/// Confirm the crop with normalization on the blocking pool.
///
/// `Ok(false)` when the stage changed before normalization finished.
pub async fn confirm_crop(scanner: &SharedScanner) -> Result<bool> {
    let pending = scanner.lock().await.begin_confirm()?;
    let (token, review) = tokio::task::spawn_blocking(move || pending.run())
        .await
        .map_err(|err| ScanError::NormalizationFailure(err.to_string()))?;
    scanner.lock().await.finish_confirm(&token, review)
}

/// Setup → Camera with the stream acquired off the lock. Busy-device
/// retries wait on the tokio timer.
///
/// `Ok(false)` when the stage changed while the camera was being opened.
pub async fn start_camera(scanner: &SharedScanner, device: Option<DeviceId>) -> Result<bool> {
    let pending = scanner.lock().await.begin_start_camera(device)?;
    let opened = pending.run().await;
    scanner.lock().await.finish_camera(opened)
}

/// Cropper → Camera, reopening the stream off the lock.
pub async fn cancel_crop(scanner: &SharedScanner) -> Result<bool> {
    let pending = scanner.lock().await.begin_cancel_crop()?;
    let opened = pending.run().await;
    scanner.lock().await.finish_camera(opened)
}

/// Cycle to the next camera off the lock. `None` when the switch was
/// overtaken by another transition.
pub async fn switch_camera(scanner: &SharedScanner) -> Result<Option<DeviceId>> {
    let pending = scanner.lock().await.begin_switch_camera()?;
    let device = pending.device().clone();
    let opened = pending.run().await;
    let switched = scanner.lock().await.finish_camera(opened)?;
    Ok(switched.then_some(device))
}
