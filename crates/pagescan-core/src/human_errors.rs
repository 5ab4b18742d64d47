// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people scanning paperwork.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Camera failures always point at the image-upload fallback.

use crate::error::{CameraUnavailableReason, ScanError};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Momentary problem; retrying may work.
    Transient,
    /// User must do something (grant permission, pick a file, add a page).
    ActionRequired,
    /// Cannot be fixed by retrying on this device.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the system should auto-retry.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

const UPLOAD_HINT: &str = "You can still add a page by choosing a photo from your files.";

/// Convert a `ScanError` into a `HumanError`.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        ScanError::CameraUnavailable(reason) => humanize_camera(*reason),

        ScanError::TorchUnsupported => HumanError {
            message: "This camera doesn't have a light.".into(),
            suggestion: "Try moving closer to a window or lamp instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::CaptureFailed(_) => HumanError {
            message: "We couldn't take the picture.".into(),
            suggestion: format!("Hold the camera steady and try again. {UPLOAD_HINT}"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::DetectionFailure(_) => HumanError {
            message: "We couldn't find the page edges.".into(),
            suggestion: "Drag the corners to the edges of the page yourself.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::NormalizationFailure(_) => HumanError {
            message: "We couldn't straighten this page.".into(),
            suggestion: "Go back and adjust the corners so they sit on the page edges, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::AssemblyFailure(_) | ScanError::PdfError(_) => HumanError {
            message: "We couldn't make the PDF.".into(),
            suggestion: "Your pages are still here. Try finishing again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::NoPages => HumanError {
            message: "There are no pages yet.".into(),
            suggestion: "Scan or upload at least one page before finishing.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::InvalidQuad(_) => HumanError {
            message: "The crop outline isn't valid.".into(),
            suggestion: "Reset the crop and place all four corners on the page.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::InvalidTransition { .. } => HumanError {
            message: "That can't be done right now.".into(),
            suggestion: "Finish the current step first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::Config(detail) => HumanError {
            message: "A setting has an invalid value.".into(),
            suggestion: format!("Check your scanner settings. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app doesn't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or pick a different location.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        ScanError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::PlatformUnavailable => HumanError {
            message: "Cameras aren't available here.".into(),
            suggestion: UPLOAD_HINT.into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

fn humanize_camera(reason: CameraUnavailableReason) -> HumanError {
    match reason {
        CameraUnavailableReason::NotSupported => HumanError {
            message: "This device can't use a camera for scanning.".into(),
            suggestion: UPLOAD_HINT.into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        CameraUnavailableReason::InsecureContext => HumanError {
            message: "The camera is blocked on insecure connections.".into(),
            suggestion: format!("Open the scanner over HTTPS. {UPLOAD_HINT}"),
            retriable: false,
            severity: Severity::Permanent,
        },
        CameraUnavailableReason::PermissionDenied => HumanError {
            message: "Camera permission was refused.".into(),
            suggestion: format!("Allow camera access in your settings, then try again. {UPLOAD_HINT}"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        CameraUnavailableReason::NoDevices => HumanError {
            message: "No camera was found.".into(),
            suggestion: format!("Connect a camera and try again. {UPLOAD_HINT}"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        CameraUnavailableReason::DeviceBusy => HumanError {
            message: "The camera is busy.".into(),
            suggestion: format!("Close other apps that might be using the camera. {UPLOAD_HINT}"),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}
