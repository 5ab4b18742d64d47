// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagescan-scanner — the scan-to-page workflow.
//
// Camera control, the detection loop and its async driver, the crop editor,
// result review, page assembly, and the state machine that ties them
// together.

pub mod assembler;
pub mod camera;
pub mod capture;
pub mod cropper;
pub mod detection;
pub mod driver;
pub mod generation;
pub mod machine;
pub mod retry;
pub mod review;

pub use assembler::{ScanDocument, ScanSession, ScannedPage, finalize};
pub use camera::CameraController;
pub use capture::{CaptureChain, CaptureStrategy, GrabFrame, TakePhoto};
pub use cropper::{CropEditor, CropEvent};
pub use detection::{DetectionHistory, DetectionLoop, TickOutcome};
pub use driver::{DetectionDriver, DriverEvent, SharedScanner};
pub use generation::{Generation, GenerationToken};
pub use machine::Scanner;
pub use retry::RetryConfig;
pub use review::ResultReview;
