// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quad geometry — bounding rectangles, overlap ratio, stability check,
// coordinate scaling, default seeding, and hit-testing helpers.
//
// Everything here is pure and allocation-free.

use crate::types::{Corner, Point, Quad};

/// Default stability threshold for auto-capture.
pub const DEFAULT_STABILITY_THRESHOLD: f64 = 0.90;

/// Number of consecutive detections compared by [`is_steady`].
pub const STABILITY_WINDOW: usize = 3;

/// Fraction of width/height left outside the default quad on each side.
pub const DEFAULT_INSET_FRACTION: f64 = 0.10;

/// Axis-aligned rectangle in image-pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Smallest axis-aligned rectangle containing every point.
///
/// Returns `None` for an empty slice.
pub fn bounding_rect(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let mut rect = Rect {
        left: first.x,
        top: first.y,
        right: first.x,
        bottom: first.y,
    };
    for p in &points[1..] {
        rect.left = rect.left.min(p.x);
        rect.top = rect.top.min(p.y);
        rect.right = rect.right.max(p.x);
        rect.bottom = rect.bottom.max(p.y);
    }
    Some(rect)
}

/// Intersection-over-union of two rectangles.
///
/// Zero when they do not overlap (touching edges count as not overlapping) or
/// when either has zero area.
pub fn rect_overlap_ratio(a: &Rect, b: &Rect) -> f64 {
    let left = a.left.max(b.left);
    let right = a.right.min(b.right);
    let top = a.top.max(b.top);
    let bottom = a.bottom.min(b.bottom);

    if left >= right || bottom <= top {
        return 0.0;
    }

    let intersection = (right - left) * (bottom - top);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    (intersection / union).clamp(0.0, 1.0)
}

/// Cheap stability proxy: IOU of the two quads' bounding rectangles.
///
/// Not a true polygon IOU. Symmetric, always in `[0, 1]`, and exactly `1.0`
/// for quads with the same (non-degenerate) bounding rectangle.
pub fn overlap_ratio(a: &Quad, b: &Quad) -> f64 {
    match (bounding_rect(a.points()), bounding_rect(b.points())) {
        (Some(ra), Some(rb)) => rect_overlap_ratio(&ra, &rb),
        _ => 0.0,
    }
}

/// Whether the most recent [`STABILITY_WINDOW`] detections agree.
///
/// `false` with fewer than three entries. Otherwise `true` iff the pairwise
/// ratios (0,1), (1,2) and (0,2) of the last three entries all exceed
/// `threshold`.
pub fn is_steady(history: &[Quad], threshold: f64) -> bool {
    if history.len() < STABILITY_WINDOW {
        return false;
    }
    let window = &history[history.len() - STABILITY_WINDOW..];
    let r01 = overlap_ratio(&window[0], &window[1]);
    let r12 = overlap_ratio(&window[1], &window[2]);
    let r02 = overlap_ratio(&window[0], &window[2]);
    r01 > threshold && r12 > threshold && r02 > threshold
}

/// Multiply every coordinate by `ratio`.
///
/// `scale_quad(scale_quad(q, r), 1.0 / r)` reproduces `q` up to rounding.
pub fn scale_quad(quad: &Quad, ratio: f64) -> Quad {
    Quad::new(quad.points().map(|p| p.scaled(ratio)))
}

/// Default crop for an image with no detection: the central 80%×80%.
pub fn default_quad(width: u32, height: u32) -> Quad {
    inset_quad(width, height, DEFAULT_INSET_FRACTION)
}

/// Rectangle inset by `fraction` of the width and height on each side.
pub fn inset_quad(width: u32, height: u32, fraction: f64) -> Quad {
    let (w, h) = (width as f64, height as f64);
    Quad::from_rect(w * fraction, h * fraction, w * (1.0 - fraction), h * (1.0 - fraction))
}

/// Scale that fits an image into a viewport without upscaling:
/// `min(vw / iw, vh / ih, 1)`.
pub fn fit_scale(viewport_width: f64, viewport_height: f64, width: u32, height: u32) -> f64 {
    if width == 0 || height == 0 || viewport_width <= 0.0 || viewport_height <= 0.0 {
        return 1.0;
    }
    (viewport_width / width as f64)
        .min(viewport_height / height as f64)
        .min(1.0)
}

/// Corner closest to `point`, with its distance.
pub fn nearest_corner(quad: &Quad, point: &Point) -> (Corner, f64) {
    let mut best = (Corner::TopLeft, f64::MAX);
    for corner in Corner::ALL {
        let d = quad.corner(corner).distance_to(point);
        if d < best.1 {
            best = (corner, d);
        }
    }
    best
}

/// Even-odd point-in-polygon test against the quad's outline.
///
/// Works for concave and self-intersecting quads, which a user drag can
/// produce.
pub fn quad_contains(quad: &Quad, point: &Point) -> bool {
    let pts = quad.points();
    let mut inside = false;
    let mut j = pts.len() - 1;
    for i in 0..pts.len() {
        let (pi, pj) = (pts[i], pts[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Output rectangle implied by the quad's edges.
///
/// Width is the mean of the top (0→1) and bottom (3→2) edges, height the
/// mean of the left (0→3) and right (1→2) edges. Each side is at least one
/// pixel.
pub fn rectified_size(quad: &Quad) -> (u32, u32) {
    let tl = quad.corner(Corner::TopLeft);
    let tr = quad.corner(Corner::TopRight);
    let br = quad.corner(Corner::BottomRight);
    let bl = quad.corner(Corner::BottomLeft);

    let width = (tl.distance_to(&tr) + bl.distance_to(&br)) / 2.0;
    let height = (tl.distance_to(&bl) + tr.distance_to(&br)) / 2.0;

    (
        (width.round() as u32).max(1),
        (height.round() as u32).max(1),
    )
}

/// Shoelace area of the quad (absolute value).
pub fn quad_area(quad: &Quad) -> f64 {
    let pts = quad.points();
    let mut twice = 0.0;
    for i in 0..pts.len() {
        let j = (i + 1) % pts.len();
        twice += pts[i].x * pts[j].y - pts[j].x * pts[i].y;
    }
    twice.abs() / 2.0
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_quad(l: f64, t: f64, r: f64, b: f64) -> Quad {
        Quad::from_rect(l, t, r, b)
    }

    #[test]
    fn overlap_of_quad_with_itself_is_one() {
        let q = Quad::new([
            Point::new(12.0, 30.0),
            Point::new(410.0, 18.0),
            Point::new(398.0, 520.0),
            Point::new(25.0, 511.0),
        ]);
        assert_eq!(overlap_ratio(&q, &q), 1.0);
    }

    #[test]
    fn disjoint_rectangles_have_zero_overlap() {
        let a = rect_quad(0.0, 0.0, 10.0, 10.0);
        let b = rect_quad(20.0, 20.0, 30.0, 30.0);
        assert_eq!(overlap_ratio(&a, &b), 0.0);

        // Sharing an edge is still no overlap.
        let c = rect_quad(10.0, 0.0, 20.0, 10.0);
        assert_eq!(overlap_ratio(&a, &c), 0.0);
    }

    #[test]
    fn overlap_is_symmetric_and_bounded() {
        let a = rect_quad(0.0, 0.0, 100.0, 100.0);
        let b = rect_quad(50.0, 0.0, 150.0, 100.0);
        let ab = overlap_ratio(&a, &b);
        let ba = overlap_ratio(&b, &a);
        assert_eq!(ab, ba);
        // 5000 / (10000 + 10000 - 5000)
        assert!((ab - 1.0 / 3.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn zero_area_quad_has_zero_overlap() {
        let flat = rect_quad(0.0, 5.0, 100.0, 5.0);
        let a = rect_quad(0.0, 0.0, 100.0, 100.0);
        assert_eq!(overlap_ratio(&flat, &a), 0.0);
        assert_eq!(overlap_ratio(&flat, &flat), 0.0);
    }

    #[test]
    fn bounding_rect_handles_negative_coordinates() {
        let r = bounding_rect(&[Point::new(-5.0, -2.0), Point::new(3.0, 4.0)]).unwrap();
        assert_eq!(r.left, -5.0);
        assert_eq!(r.top, -2.0);
        assert_eq!(r.right, 3.0);
        assert_eq!(r.bottom, 4.0);
        assert!(bounding_rect(&[]).is_none());
    }

    #[test]
    fn steady_requires_three_entries() {
        let q = rect_quad(0.0, 0.0, 100.0, 100.0);
        assert!(!is_steady(&[], DEFAULT_STABILITY_THRESHOLD));
        assert!(!is_steady(&[q, q], DEFAULT_STABILITY_THRESHOLD));
        assert!(is_steady(&[q, q, q], DEFAULT_STABILITY_THRESHOLD));
    }

    #[test]
    fn steady_fails_when_any_pair_drifts() {
        let a = rect_quad(0.0, 0.0, 100.0, 100.0);
        let b = rect_quad(1.0, 1.0, 101.0, 101.0);
        let far = rect_quad(30.0, 0.0, 130.0, 100.0);
        assert!(is_steady(&[a, b, a], DEFAULT_STABILITY_THRESHOLD));
        assert!(!is_steady(&[a, b, far], DEFAULT_STABILITY_THRESHOLD));
        // Threshold is strict: identical quads never exceed 1.0.
        assert!(!is_steady(&[a, a, a], 1.0));
    }

    #[test]
    fn scale_round_trip_is_lossless_within_tolerance() {
        let q = Quad::new([
            Point::new(13.7, 21.1),
            Point::new(977.3, 15.9),
            Point::new(1003.2, 1411.8),
            Point::new(4.4, 1399.0),
        ]);
        for ratio in [0.5625, 0.1, 3.0, 1.0 / 7.0] {
            let back = scale_quad(&scale_quad(&q, ratio), 1.0 / ratio);
            for (a, b) in q.points().iter().zip(back.points()) {
                assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn default_quad_covers_central_eighty_percent() {
        let q = default_quad(1000, 1000);
        assert_eq!(
            q.points(),
            &[
                Point::new(100.0, 100.0),
                Point::new(900.0, 100.0),
                Point::new(900.0, 900.0),
                Point::new(100.0, 900.0),
            ]
        );
        let q = default_quad(800, 600);
        assert_eq!(q.corner(Corner::BottomRight), Point::new(720.0, 540.0));
    }

    #[test]
    fn fit_scale_never_upscales() {
        assert_eq!(fit_scale(2000.0, 2000.0, 800, 600), 1.0);
        assert_eq!(fit_scale(400.0, 600.0, 800, 600), 0.5);
        assert_eq!(fit_scale(800.0, 150.0, 800, 600), 0.25);
    }

    #[test]
    fn nearest_corner_picks_closest() {
        let q = rect_quad(0.0, 0.0, 100.0, 100.0);
        let (corner, d) = nearest_corner(&q, &Point::new(97.0, 4.0));
        assert_eq!(corner, Corner::TopRight);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn contains_handles_skewed_quads() {
        let q = Quad::new([
            Point::new(10.0, 0.0),
            Point::new(90.0, 10.0),
            Point::new(100.0, 90.0),
            Point::new(0.0, 100.0),
        ]);
        assert!(quad_contains(&q, &Point::new(50.0, 50.0)));
        assert!(!quad_contains(&q, &Point::new(2.0, 2.0)));
        assert!(!quad_contains(&q, &Point::new(150.0, 50.0)));
    }

    #[test]
    fn rectified_size_averages_opposite_edges() {
        let q = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(110.0, 200.0),
            Point::new(-10.0, 200.0),
        ]);
        let (w, h) = rectified_size(&q);
        assert_eq!(w, 110);
        // Both side edges are sqrt(10^2 + 200^2) ≈ 200.25.
        assert_eq!(h, 200);
    }

    #[test]
    fn shoelace_area_of_rectangle() {
        let q = rect_quad(0.0, 0.0, 10.0, 5.0);
        assert!((quad_area(&q) - 50.0).abs() < 1e-12);
    }
}
