// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pagescan-document crate: full-resolution
// normalization, filter previews, and edge detection on a synthetic page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use pagescan_core::{FilterMode, Point, Quad};
use pagescan_document::{EdgeDetector, HoughEdgeDetector, NormalizationEngine};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 1280x720 frame: a light page on a dark table.
fn synthetic_frame() -> RgbaImage {
    RgbaImage::from_fn(1280, 720, |x, y| {
        if (240..1040).contains(&x) && (60..660).contains(&y) {
            Rgba([235, 232, 225, 255])
        } else {
            Rgba([40, 35, 30, 255])
        }
    })
}

fn skewed_quad() -> Quad {
    Quad::new([
        Point::new(250.0, 70.0),
        Point::new(1030.0, 55.0),
        Point::new(1045.0, 650.0),
        Point::new(235.0, 665.0),
    ])
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_normalize(c: &mut Criterion) {
    let frame = synthetic_frame();
    let quad = skewed_quad();
    let engine = NormalizationEngine::new(150);

    for mode in FilterMode::ALL {
        c.bench_function(&format!("normalize {} (1280x720)", mode.label()), |b| {
            b.iter(|| black_box(engine.normalize(black_box(&frame), &quad, mode)));
        });
    }

    c.bench_function("filter previews (1280x720)", |b| {
        b.iter(|| black_box(engine.previews(black_box(&frame), &quad)));
    });
}

fn bench_detect(c: &mut Criterion) {
    let frame = synthetic_frame();
    let detector = HoughEdgeDetector::default();

    c.bench_function("hough detect (1280x720)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&frame))));
    });
}

criterion_group!(benches, bench_normalize, bench_detect);
criterion_main!(benches);
