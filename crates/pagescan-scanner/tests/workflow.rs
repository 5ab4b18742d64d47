// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end scanning workflows driven through the replay camera.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use pagescan_bridge::{ReplayCapture, ReplayDevice};
use pagescan_core::{Corner, FilterMode, Quad, RotationStep, ScannerConfig, ScannerStage};
use pagescan_document::{EdgeDetector, FixedInsetDetector, HoughEdgeDetector, PdfReader};
use pagescan_scanner::{Scanner, TickOutcome};

fn config(auto_capture: bool) -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.camera_retry.delay_ms = 0;
    config.auto_capture = auto_capture;
    config
}

fn grey_frames() -> Vec<RgbaImage> {
    vec![RgbaImage::from_pixel(640, 480, Rgba([128, 128, 128, 255]))]
}

fn replay(frames: Vec<RgbaImage>) -> ReplayCapture {
    ReplayCapture::new().with_device(ReplayDevice::new("rear", Some("Rear camera"), frames))
}

fn scanner_with(
    capture: &ReplayCapture,
    detector: Arc<dyn EdgeDetector>,
    auto_capture: bool,
) -> Scanner {
    Scanner::new(config(auto_capture), Arc::new(capture.clone()), detector).unwrap()
}

/// A photo whose central 800×600 region is the page.
fn uploaded_photo() -> (RgbaImage, Quad) {
    let photo = RgbaImage::from_fn(1000, 800, |x, y| {
        Rgba([(x % 200) as u8 + 40, (y % 200) as u8 + 40, 120, 255])
    });
    (photo, Quad::from_rect(100.0, 100.0, 900.0, 700.0))
}

#[test]
fn stable_detection_auto_captures_exactly_once() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), true);
    scanner.start_camera(None).unwrap();

    assert!(matches!(scanner.tick().unwrap(), TickOutcome::Detected(_)));
    assert!(matches!(scanner.tick().unwrap(), TickOutcome::Detected(_)));
    assert!(matches!(scanner.tick().unwrap(), TickOutcome::AutoCapture(_)));
    assert_eq!(scanner.stage(), ScannerStage::Cropper);
    assert!(scanner.detection().history().is_empty());

    // Back on the same scene: the fourth identical detection does not fire.
    scanner.cancel_crop().unwrap();
    assert!(matches!(scanner.tick().unwrap(), TickOutcome::Detected(_)));
    assert_eq!(scanner.stage(), ScannerStage::Camera);
}

#[test]
fn cancelling_the_crop_reopens_the_camera_without_touching_the_session() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), false);

    scanner.start_camera(None).unwrap();
    scanner.capture().unwrap();
    scanner.confirm_crop().unwrap();
    scanner.accept_result().unwrap();
    assert_eq!(scanner.session().len(), 1);

    scanner.start_camera(None).unwrap();
    scanner.capture().unwrap();
    assert!(!scanner.camera().is_open());
    let before = capture.stats().acquisitions;

    scanner.cancel_crop().unwrap();
    assert_eq!(scanner.stage(), ScannerStage::Camera);
    assert!(scanner.camera().is_open());
    assert_eq!(capture.stats().acquisitions, before + 1);
    assert_eq!(scanner.session().len(), 1);
}

#[test]
fn rotated_page_is_stored_with_swapped_dimensions() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), false);
    let (photo, quad) = uploaded_photo();

    scanner.load_image(photo).unwrap();
    scanner.cropper_mut().unwrap().set_quad(quad);
    scanner.confirm_crop().unwrap();
    assert_eq!(scanner.review().unwrap().displayed().dimensions(), (800, 600));

    scanner.rotate(RotationStep::Clockwise).unwrap();
    scanner.accept_result().unwrap();
    assert_eq!(scanner.stage(), ScannerStage::Setup);
    assert_eq!(scanner.session().pages()[0].dimensions(), (600, 800));
    assert_eq!(scanner.session().pages()[0].rotation.degrees(), 90);
}

#[test]
fn four_counter_clockwise_turns_keep_original_dimensions() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), false);
    let (photo, quad) = uploaded_photo();

    scanner.load_image(photo).unwrap();
    scanner.cropper_mut().unwrap().set_quad(quad);
    scanner.confirm_crop().unwrap();
    for _ in 0..4 {
        scanner.rotate(RotationStep::CounterClockwise).unwrap();
    }
    scanner.accept_result().unwrap();
    assert_eq!(scanner.session().pages()[0].dimensions(), (800, 600));
}

#[test]
fn black_and_white_pages_are_binary() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), false);
    let (photo, quad) = uploaded_photo();

    scanner.load_image(photo).unwrap();
    scanner.cropper_mut().unwrap().set_quad(quad);
    scanner.confirm_crop().unwrap();
    scanner.select_filter(FilterMode::BlackAndWhite).unwrap();
    scanner.accept_result().unwrap();

    let page = &scanner.session().pages()[0];
    assert_eq!(page.filter_mode, FilterMode::BlackAndWhite);
    assert!(
        page.normalized
            .pixels()
            .all(|p| p.0[..3].iter().all(|&c| c == 0 || c == 255))
    );
}

#[test]
fn dragged_corner_reaches_the_page() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), false);
    let (photo, _) = uploaded_photo();

    scanner.load_image(photo).unwrap();
    let editor = scanner.cropper_mut().unwrap();
    editor.set_viewport(500.0, 400.0);
    // Default quad corner (900, 720) is at screen (450, 360).
    assert_eq!(
        editor.pointer_down(pagescan_core::Point::new(452.0, 358.0)),
        Some(Corner::BottomRight)
    );
    editor.pointer_move(pagescan_core::Point::new(475.0, 380.0));
    editor.pointer_up();
    let quad = editor.quad();
    assert_eq!(quad.corner(Corner::BottomRight), pagescan_core::Point::new(950.0, 760.0));

    scanner.confirm_crop().unwrap();
    scanner.accept_result().unwrap();
    assert_eq!(scanner.session().pages()[0].quad, quad);
}

#[test]
fn camera_stream_is_never_doubled_across_a_session() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), false);

    for _ in 0..3 {
        scanner.start_camera(None).unwrap();
        scanner.tick().unwrap();
        scanner.capture().unwrap();
        scanner.cancel_crop().unwrap();
        scanner.capture().unwrap();
        scanner.confirm_crop().unwrap();
        scanner.cancel_result().unwrap();
        scanner.confirm_crop().unwrap();
        scanner.accept_result().unwrap();
        assert!(!scanner.camera().is_open());
    }

    let stats = capture.stats();
    assert_eq!(stats.max_open_streams, 1);
    assert_eq!(stats.open_streams, 0);
    assert_eq!(scanner.session().len(), 3);
}

#[test]
fn multi_page_session_becomes_one_pdf() {
    let capture = replay(grey_frames());
    let mut scanner = scanner_with(&capture, Arc::new(FixedInsetDetector::default()), false);

    for _ in 0..3 {
        scanner.start_camera(None).unwrap();
        scanner.capture().unwrap();
        scanner.confirm_crop().unwrap();
        scanner.accept_result().unwrap();
    }
    scanner.remove_page(1).unwrap();

    let writer = scanner.pdf_writer();
    let (document, session) = scanner.finish(&writer).unwrap();
    assert_eq!(session.len(), 2);
    assert_eq!(document.page_count, 2);
    assert_eq!(PdfReader::from_bytes(&document.bytes).unwrap().page_count(), 2);
    assert!(scanner.session().is_empty());
}

#[test]
fn detected_page_seeds_the_crop() {
    let frame = RgbaImage::from_fn(400, 500, |x, y| {
        if (50..350).contains(&x) && (60..440).contains(&y) {
            Rgba([240, 240, 240, 255])
        } else {
            Rgba([30, 30, 30, 255])
        }
    });
    let capture = replay(vec![frame]);
    let mut scanner = scanner_with(&capture, Arc::new(HoughEdgeDetector::default()), false);
    scanner.start_camera(None).unwrap();
    assert!(matches!(scanner.tick().unwrap(), TickOutcome::Detected(_)));
    scanner.capture().unwrap();

    let quad = scanner.cropper().quad();
    let expected = [(50.0, 60.0), (350.0, 60.0), (350.0, 440.0), (50.0, 440.0)];
    for (point, (x, y)) in quad.points().iter().zip(expected) {
        assert!((point.x - x).abs() < 10.0, "x {} vs {}", point.x, x);
        assert!((point.y - y).abs() < 10.0, "y {} vs {}", point.y, y);
    }
}
