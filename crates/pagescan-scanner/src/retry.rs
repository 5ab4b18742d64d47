// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded retry with a fixed delay, used for camera acquisition.
//
// Classifies errors into Transient (auto-retry), UserAction (wait for user),
// and Permanent (give up). Only transient errors are retried.

use std::future::Future;
use std::time::Duration;

use pagescan_core::config::CameraRetryConfig;
use pagescan_core::error::{CameraUnavailableReason, Result, ScanError};
use tracing::{debug, info, warn};

/// How an error should be handled by a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed if tried again.
    Transient,
    /// The user has to change something first.
    UserAction,
    /// Will not succeed on this host.
    Permanent,
}

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        CameraRetryConfig::default().into()
    }
}

impl From<CameraRetryConfig> for RetryConfig {
    fn from(config: CameraRetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry: the error is permanent or needs the user.
    GiveUp(ErrorClass),
    /// Maximum attempts used up.
    Exhausted,
}

/// Classify a `ScanError` for retry decisions.
pub fn classify_error(err: &ScanError) -> ErrorClass {
    match err {
        ScanError::CameraUnavailable(reason) => match reason {
            CameraUnavailableReason::DeviceBusy => ErrorClass::Transient,
            CameraUnavailableReason::PermissionDenied | CameraUnavailableReason::NoDevices => {
                ErrorClass::UserAction
            }
            CameraUnavailableReason::NotSupported | CameraUnavailableReason::InsecureContext => {
                ErrorClass::Permanent
            }
        },
        ScanError::CaptureFailed(_) | ScanError::DetectionFailure(_) => ErrorClass::Transient,
        ScanError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::UserAction
            }
            _ => ErrorClass::Transient,
        },
        _ => ErrorClass::Permanent,
    }
}

/// Decide whether to retry after the failure of attempt number `attempt`
/// (1-based).
pub fn should_retry(err: &ScanError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Transient if attempt < config.max_attempts => {
            debug!(attempt, delay_ms = config.delay.as_millis() as u64, "scheduling retry");
            RetryDecision::RetryAfter(config.delay)
        }
        ErrorClass::Transient => {
            warn!(attempt, max = config.max_attempts, "retry limit exhausted");
            RetryDecision::Exhausted
        }
        class => {
            info!(?class, "not retrying");
            RetryDecision::GiveUp(class)
        }
    }
}

/// Run `op` until it succeeds, a non-transient error occurs, or attempts run
/// out. Blocks the calling thread between attempts.
///
/// `op` receives the 1-based attempt number. The last error is returned on
/// failure.
pub fn retry_blocking<T>(config: &RetryConfig, mut op: impl FnMut(u32) -> Result<T>) -> Result<T> {
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => match should_retry(&err, attempt, config) {
                RetryDecision::RetryAfter(delay) => {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                RetryDecision::GiveUp(_) | RetryDecision::Exhausted => return Err(err),
            },
        }
    }
}

/// Async counterpart of [`retry_blocking`]. Backs off with
/// `tokio::time::sleep`, so the runtime keeps polling other tasks between
/// attempts.
pub async fn retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => match should_retry(&err, attempt, config) {
                RetryDecision::RetryAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp(_) | RetryDecision::Exhausted => return Err(err),
            },
        }
    }
}
